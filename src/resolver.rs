use alloc::{collections::BTreeSet, vec::Vec};
use tracing::{debug, error, info_span};

use crate::{
    binding::{Binding, BindingType},
    cache::ResolutionCache,
    component::{ComponentIndex, ComponentPath, ComponentTree},
    declaration::{BindingDeclaration, BindingKind, DeclarationSite},
    errors::ResolveErrorKind,
    key::{Key, TypeRef},
    multibinding::MultibindingAggregator,
    oracle::AccessibilityOracle,
    request::{DependencyRequest, RequestKind},
    scope::Scope,
    store::{DeclarationStore, InstalledModules},
    utils::thread_safety::RcThreadSafety,
};

/// Rule found for a key at one component
enum Explicit {
    Declaration(RcThreadSafety<BindingDeclaration>),
    BoundInstance(DeclarationSite),
    ComponentSelf,
}

impl Explicit {
    fn dependencies(&self) -> &[DependencyRequest] {
        match self {
            Self::Declaration(declaration) => &declaration.dependencies,
            Self::BoundInstance(_) | Self::ComponentSelf => &[],
        }
    }

    fn scope(&self) -> Option<&Scope> {
        match self {
            Self::Declaration(declaration) => declaration.scope(),
            Self::BoundInstance(_) | Self::ComponentSelf => None,
        }
    }
}

/// Resolves keys to bindings for component paths.
///
/// Lookups walk from the requesting component up to the root and never look down.
/// A binding is owned by the highest component that sees every rule it transitively depends on,
/// so requests from descendants share the ancestor's binding.
pub struct BindingResolver<'a> {
    store: &'a DeclarationStore,
    tree: &'a ComponentTree,
    modules: &'a InstalledModules,
    cache: &'a ResolutionCache,
    accessibility: &'a dyn AccessibilityOracle,
}

impl<'a> BindingResolver<'a> {
    #[must_use]
    pub fn new(
        store: &'a DeclarationStore,
        tree: &'a ComponentTree,
        modules: &'a InstalledModules,
        cache: &'a ResolutionCache,
        accessibility: &'a dyn AccessibilityOracle,
    ) -> Self {
        Self {
            store,
            tree,
            modules,
            cache,
            accessibility,
        }
    }

    /// Resolves a provision or production binding for `key` as seen from `path`
    ///
    /// # Errors
    /// - Returns [`ResolveErrorKind::Missing`] if no rule for `key` is visible from `path`
    /// - Returns [`ResolveErrorKind::Reentrant`] if `key` is already being resolved for `path`
    pub fn resolve(&self, key: &Key, path: &ComponentPath) -> Result<RcThreadSafety<Binding>, ResolveErrorKind> {
        self.resolve_with(BindingType::Provision, key, path)
    }

    /// Resolves the members-injection binding of the type of `key`
    ///
    /// # Errors
    /// Returns [`ResolveErrorKind::Reentrant`] if `key` is already being resolved for `path`
    pub fn resolve_members_injection(&self, key: &Key, path: &ComponentPath) -> Result<RcThreadSafety<Binding>, ResolveErrorKind> {
        self.resolve_with(BindingType::MembersInjection, key, path)
    }

    /// Resolves the binding a request is served by
    ///
    /// # Errors
    /// See [`BindingResolver::resolve`]
    pub fn resolve_request(
        &self,
        request: &DependencyRequest,
        path: &ComponentPath,
    ) -> Result<RcThreadSafety<Binding>, ResolveErrorKind> {
        match request.kind {
            RequestKind::MembersInjector => self.resolve_members_injection(&request.key, path),
            _ => self.resolve(&request.key, path),
        }
    }

    fn resolve_with(
        &self,
        lookup: BindingType,
        key: &Key,
        path: &ComponentPath,
    ) -> Result<RcThreadSafety<Binding>, ResolveErrorKind> {
        let span = info_span!("resolve", key = %key, component = %path, lookup = ?lookup);
        let _guard = span.enter();

        let memo_key = (lookup, key.clone(), path.clone());
        if let Some(binding) = self.cache.binding(&memo_key) {
            debug!("Found in cache");
            return Ok(binding);
        }

        if !self.cache.enter(&memo_key) {
            let err = ResolveErrorKind::Reentrant {
                key: key.clone(),
                component: path.clone(),
            };
            error!("{}", err);
            return Err(err);
        }
        let result = match lookup {
            BindingType::MembersInjection => self.resolve_members_injection_uncached(key, path),
            BindingType::Provision | BindingType::Production => self.resolve_uncached(key, path),
        };
        self.cache.exit(&memo_key);

        let binding = result?;
        self.cache.insert_binding(memo_key, binding.clone());
        Ok(binding)
    }

    fn resolve_uncached(&self, key: &Key, path: &ComponentPath) -> Result<RcThreadSafety<Binding>, ResolveErrorKind> {
        for depth in (1..=path.len()).rev() {
            let Some(component) = path.component_at(depth) else {
                continue;
            };
            if let Some(explicit) = self.explicit(component, key) {
                return self.place_explicit(key, explicit, depth, path);
            }
        }

        if key.is_multibinding_collection() {
            if let Some(binding) = MultibindingAggregator::new(self).aggregate(key, path)? {
                return Ok(binding);
            }
        }

        if key.qualifier.is_none() && key.contribution.is_none() {
            if let Some(injectable) = self.store.injectable(&key.ty).filter(|injectable| injectable.has_constructor) {
                let dependencies: Vec<_> = injectable.dependencies().cloned().collect();
                let scope = injectable.scope().cloned();
                return self.place(BindingType::Provision, key, 1, path, scope.as_ref(), &dependencies, |owner| {
                    debug!("Injection binding synthesized");
                    Binding::new(key.clone(), BindingKind::Injection, owner)
                        .with_dependencies(dependencies.clone())
                        .with_scope(scope.clone())
                });
            }
        }

        let err = ResolveErrorKind::Missing {
            key: key.clone(),
            component: path.clone(),
        };
        error!("{}", err);
        Err(err)
    }

    fn resolve_members_injection_uncached(
        &self,
        key: &Key,
        path: &ComponentPath,
    ) -> Result<RcThreadSafety<Binding>, ResolveErrorKind> {
        let dependencies = self
            .store
            .injectable(&key.ty)
            .map(|injectable| injectable.member_dependencies.clone())
            .unwrap_or_default();
        self.place(BindingType::MembersInjection, key, 1, path, None, &dependencies, |owner| {
            debug!("Members injection binding synthesized");
            Binding::new(key.clone(), BindingKind::MembersInjection, owner).with_dependencies(dependencies.clone())
        })
    }

    fn place_explicit(
        &self,
        key: &Key,
        explicit: Explicit,
        declared_depth: usize,
        path: &ComponentPath,
    ) -> Result<RcThreadSafety<Binding>, ResolveErrorKind> {
        let scope = explicit.scope().cloned();
        let dependencies = explicit.dependencies().to_vec();
        self.place(BindingType::Provision, key, declared_depth, path, scope.as_ref(), &dependencies, |owner| match &explicit {
            Explicit::Declaration(declaration) => Binding::declared(declaration.clone(), owner),
            Explicit::BoundInstance(site) => Binding::new(key.clone(), BindingKind::BoundInstance, owner).with_site(site.clone()),
            Explicit::ComponentSelf => Binding::new(key.clone(), BindingKind::ComponentSelf, owner),
        })
    }

    /// Builds the binding at its owner. If the owner is an ancestor of `path`,
    /// the binding is resolved for the ancestor and shared with `path`.
    #[allow(clippy::too_many_arguments)]
    fn place(
        &self,
        lookup: BindingType,
        key: &Key,
        declared_depth: usize,
        path: &ComponentPath,
        scope: Option<&Scope>,
        dependencies: &[DependencyRequest],
        build: impl FnOnce(ComponentPath) -> Binding,
    ) -> Result<RcThreadSafety<Binding>, ResolveErrorKind> {
        let local_depth = self.local_depth(dependencies.iter().map(|request| request.key.clone()), declared_depth, path);
        let (owner_depth, problem) = self.owner_depth(key, scope, local_depth, path);
        if owner_depth < path.len() {
            debug!(owner_depth, "Owned by ancestor");
            return self.resolve_with(lookup, key, &path.prefix(owner_depth));
        }

        let mut binding = build(path.clone());
        if let Some(problem) = problem {
            error!("{}", problem);
            binding.push_problem(problem);
        }
        Ok(RcThreadSafety::new(binding))
    }

    /// Owner depth of a binding whose rules are visible from `local_depth` on.
    /// Scoped bindings move down to the nearest component declaring their scope,
    /// reusable ones stay where their rules are visible.
    fn owner_depth(
        &self,
        key: &Key,
        scope: Option<&Scope>,
        local_depth: usize,
        path: &ComponentPath,
    ) -> (usize, Option<ResolveErrorKind>) {
        let Some(scope) = scope.filter(|scope| !scope.is_reusable()) else {
            return (local_depth, None);
        };
        match self.holder_depth(scope, path) {
            None => (
                local_depth,
                Some(ResolveErrorKind::ScopeMismatch {
                    key: key.clone(),
                    scope: scope.clone(),
                    component: path.prefix(local_depth),
                }),
            ),
            Some(holder_depth) if holder_depth < local_depth => (
                local_depth,
                Some(ResolveErrorKind::IncompatibleScope {
                    key: key.clone(),
                    scope: scope.clone(),
                    holder: path.prefix(holder_depth),
                    component: path.prefix(local_depth),
                }),
            ),
            Some(holder_depth) => (holder_depth, None),
        }
    }

    /// Depth of the nearest component of `path` declaring `scope`
    #[must_use]
    pub(crate) fn holder_depth(&self, scope: &Scope, path: &ComponentPath) -> Option<usize> {
        (1..=path.len()).rev().find(|depth| {
            path.component_at(*depth)
                .is_some_and(|component| self.tree.descriptor(component).declares_scope(scope))
        })
    }

    /// Deepest component of `path`, not above `floor`, that declares a rule
    /// one of `keys` transitively depends on.
    /// Walks declarations only, so cyclic declarations terminate.
    pub(crate) fn local_depth(&self, keys: impl IntoIterator<Item = Key>, floor: usize, path: &ComponentPath) -> usize {
        let mut depth = floor;
        let mut visited = BTreeSet::new();
        let mut stack: Vec<Key> = keys.into_iter().collect();
        while let Some(key) = stack.pop() {
            if depth >= path.len() {
                break;
            }
            if visited.contains(&key) {
                continue;
            }

            if let Some(local) = ((depth + 1)..=path.len()).rev().find(|depth| {
                path.component_at(*depth)
                    .is_some_and(|component| self.declares_locally(component, &key))
            }) {
                depth = local;
            }
            if let Some(scope) = self
                .store
                .injectable(&key.ty)
                .filter(|_| key.qualifier.is_none())
                .and_then(|injectable| injectable.scope())
                .filter(|scope| !scope.is_reusable())
            {
                if let Some(holder) = self.holder_depth(scope, path) {
                    depth = depth.max(holder);
                }
            }

            stack.extend(self.rule_dependency_keys(&key, path));
            visited.insert(key);
        }
        depth
    }

    /// Keys the rule visible for `key` from `path` depends on
    fn rule_dependency_keys(&self, key: &Key, path: &ComponentPath) -> Vec<Key> {
        for depth in (1..=path.len()).rev() {
            let Some(component) = path.component_at(depth) else {
                continue;
            };
            if let Some(explicit) = self.explicit(component, key) {
                return explicit.dependencies().iter().map(|request| request.key.clone()).collect();
            }
        }
        if key.is_multibinding_collection() {
            return path
                .components()
                .flat_map(|component| self.store.contributions(self.modules.of(component), key))
                .map(|contribution| contribution.key.clone())
                .collect();
        }
        if key.qualifier.is_none() && key.contribution.is_none() {
            if let Some(injectable) = self.store.injectable(&key.ty) {
                return injectable.dependencies().map(|request| request.key.clone()).collect();
            }
        }
        Vec::new()
    }

    fn declares_locally(&self, component: ComponentIndex, key: &Key) -> bool {
        if self.explicit(component, key).is_some() {
            return true;
        }
        key.contribution.is_none() && self.store.declares(self.modules.of(component), key)
    }

    /// Unique rule for `key` declared at `component` itself
    fn explicit(&self, component: ComponentIndex, key: &Key) -> Option<Explicit> {
        let descriptor = self.tree.descriptor(component);
        if key.qualifier.is_none() && key.contribution.is_none() && key.ty == descriptor.ty {
            return Some(Explicit::ComponentSelf);
        }
        for creator in &descriptor.creators {
            if let Some(instance) = creator.bound_instances.iter().find(|instance| &instance.key == key) {
                return Some(Explicit::BoundInstance(DeclarationSite::new(
                    creator.ty.clone(),
                    instance.element.clone(),
                )));
            }
        }

        let modules = self.modules.of(component);
        if key.contribution.is_some() {
            return self
                .store
                .contributions(modules, &key.without_contribution())
                .into_iter()
                .find(|declaration| &declaration.key == key)
                .map(Explicit::Declaration);
        }
        self.store
            .unique_declarations(modules, key)
            .into_iter()
            .next()
            .map(Explicit::Declaration)
    }

    #[inline]
    #[must_use]
    pub(crate) fn store(&self) -> &'a DeclarationStore {
        self.store
    }

    #[inline]
    #[must_use]
    pub(crate) fn tree(&self) -> &'a ComponentTree {
        self.tree
    }

    #[inline]
    #[must_use]
    pub(crate) fn modules_of(&self, component: ComponentIndex) -> &'a [TypeRef] {
        self.modules.of(component)
    }

    #[inline]
    #[must_use]
    pub(crate) fn accessibility(&self) -> &'a dyn AccessibilityOracle {
        self.accessibility
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    #[allow(unused_imports)]
    use std::{format, string::*};

    use super::BindingResolver;
    use crate::{
        binding::BindingType,
        cache::ResolutionCache,
        component::{ComponentDescriptor, ComponentMethod, ComponentTree},
        declaration::InjectableType,
        errors::ResolveErrorKind,
        key::{Key, TypeRef},
        oracle::PublicAccessibilityOracle,
        store::DeclarationStore,
        utils::thread_safety::RcThreadSafety,
    };

    use tracing_test::traced_test;

    fn ty(name: &str) -> TypeRef {
        TypeRef::declared("test", name)
    }

    fn parent_and_child() -> ComponentTree {
        let mut tree = ComponentTree::new();
        let parent = tree.add_root(
            ComponentDescriptor::component(ty("Parent")).with_method(ComponentMethod::subcomponent_factory(ty("Parent"), "child", ty("Child"))),
        );
        tree.add_child(parent, ComponentDescriptor::subcomponent(ty("Child")));
        tree
    }

    #[test]
    #[traced_test]
    fn test_resolution_is_memoized() {
        let store = DeclarationStore::new().with_injectable(InjectableType::new(ty("Foo")));
        let tree = parent_and_child();
        let modules = store.installed_modules(&tree);
        let cache = ResolutionCache::new();
        let resolver = BindingResolver::new(&store, &tree, &modules, &cache, &PublicAccessibilityOracle);
        let parent = tree.path(tree.roots()[0]);
        let child = tree.path(tree.node(tree.roots()[0]).children[0]);
        let foo = Key::of(ty("Foo"));

        let first = resolver.resolve(&foo, &parent).unwrap();
        let second = resolver.resolve(&foo, &parent).unwrap();
        let from_child = resolver.resolve(&foo, &child).unwrap();

        assert!(RcThreadSafety::ptr_eq(&first, &second));
        assert!(RcThreadSafety::ptr_eq(&first, &from_child));
        assert_eq!(from_child.owner(), &parent);
        assert!(logs_contain("Found in cache"));
    }

    #[test]
    #[traced_test]
    fn test_reentrant_resolution() {
        let store = DeclarationStore::new().with_injectable(InjectableType::new(ty("Foo")));
        let tree = parent_and_child();
        let modules = store.installed_modules(&tree);
        let cache = ResolutionCache::new();
        let resolver = BindingResolver::new(&store, &tree, &modules, &cache, &PublicAccessibilityOracle);
        let parent = tree.path(tree.roots()[0]);
        let foo = Key::of(ty("Foo"));

        assert!(cache.enter(&(BindingType::Provision, foo.clone(), parent.clone())));

        assert_eq!(
            resolver.resolve(&foo, &parent).map(|_| ()),
            Err(ResolveErrorKind::Reentrant {
                key: foo.clone(),
                component: parent.clone(),
            })
        );

        cache.exit(&(BindingType::Provision, foo.clone(), parent.clone()));
        assert!(resolver.resolve(&foo, &parent).is_ok());
    }
}
