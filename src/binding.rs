use alloc::vec::Vec;

use crate::{
    component::ComponentPath,
    declaration::{BindingDeclaration, BindingKind, DeclarationSite},
    errors::ResolveErrorKind,
    key::Key,
    request::DependencyRequest,
    scope::{is_stronger_scope, Scope},
    utils::thread_safety::RcThreadSafety,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BindingType {
    Provision,
    MembersInjection,
    Production,
}

/// Identity of a resolved binding: the same key resolves to different bindings in different components
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BindingId {
    pub binding_type: BindingType,
    pub key: Key,
    pub owner: ComponentPath,
}

/// A declaration, or a synthesized rule, resolved to the component that owns it.
#[derive(Debug)]
pub struct Binding {
    id: BindingId,
    kind: BindingKind,
    dependencies: Vec<DependencyRequest>,
    scope: Option<Scope>,
    declaration: Option<RcThreadSafety<BindingDeclaration>>,
    site: Option<DeclarationSite>,
    problems: Vec<ResolveErrorKind>,
}

impl Binding {
    #[must_use]
    pub(crate) fn new(key: Key, kind: BindingKind, owner: ComponentPath) -> Self {
        Self {
            id: BindingId {
                binding_type: kind.binding_type(),
                key,
                owner,
            },
            kind,
            dependencies: Vec::new(),
            scope: None,
            declaration: None,
            site: None,
            problems: Vec::new(),
        }
    }

    #[must_use]
    pub(crate) fn declared(declaration: RcThreadSafety<BindingDeclaration>, owner: ComponentPath) -> Self {
        let mut binding = Self::new(declaration.key.clone(), declaration.kind.clone(), owner);
        binding.dependencies.clone_from(&declaration.dependencies);
        binding.scope = declaration.scope().cloned();
        binding.site = Some(declaration.site.clone());
        binding.declaration = Some(declaration);
        binding
    }

    #[inline]
    #[must_use]
    pub(crate) fn with_dependencies(mut self, dependencies: Vec<DependencyRequest>) -> Self {
        self.dependencies = dependencies;
        self
    }

    #[inline]
    #[must_use]
    pub(crate) fn with_scope(mut self, scope: Option<Scope>) -> Self {
        self.scope = scope;
        self
    }

    #[inline]
    #[must_use]
    pub(crate) fn with_site(mut self, site: DeclarationSite) -> Self {
        self.site = Some(site);
        self
    }

    #[inline]
    pub(crate) fn push_problem(&mut self, problem: ResolveErrorKind) {
        self.problems.push(problem);
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> &BindingId {
        &self.id
    }

    #[inline]
    #[must_use]
    pub fn key(&self) -> &Key {
        &self.id.key
    }

    #[inline]
    #[must_use]
    pub fn owner(&self) -> &ComponentPath {
        &self.id.owner
    }

    #[inline]
    #[must_use]
    pub fn binding_type(&self) -> BindingType {
        self.id.binding_type
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> &BindingKind {
        &self.kind
    }

    #[inline]
    #[must_use]
    pub fn dependencies(&self) -> &[DependencyRequest] {
        &self.dependencies
    }

    #[inline]
    #[must_use]
    pub fn scope(&self) -> Option<&Scope> {
        self.scope.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn declaration(&self) -> Option<&RcThreadSafety<BindingDeclaration>> {
        self.declaration.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn site(&self) -> Option<&DeclarationSite> {
        self.site.as_ref()
    }

    /// Errors met while resolving this binding that did not prevent it from being resolved
    #[inline]
    #[must_use]
    pub fn problems(&self) -> &[ResolveErrorKind] {
        &self.problems
    }

    #[inline]
    #[must_use]
    pub fn requires_module_instance(&self) -> bool {
        self.declaration
            .as_ref()
            .is_some_and(|declaration| declaration.requires_module_instance)
    }

    /// Whether instances must be stored by the owning component.
    ///
    /// A delegation only needs its own storage when its scope is stronger than the scope of `delegate_source`.
    #[must_use]
    pub fn needs_caching(&self, delegate_source: Option<&Binding>) -> bool {
        let Some(scope) = &self.scope else {
            return false;
        };
        match self.kind {
            BindingKind::Delegate { .. } => is_stronger_scope(Some(scope), delegate_source.and_then(Binding::scope)),
            _ => true,
        }
    }
}
