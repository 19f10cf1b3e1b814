use alloc::{string::String, vec::Vec};
use core::fmt::{self, Display, Formatter};

use crate::{
    binding::BindingType,
    contribution::ContributionType,
    key::{ContributionId, Key, Qualifier, TypeRef},
    multibinding::Multibound,
    request::{DependencyRequest, RequestSite},
    scope::Scope,
};

/// Element that declares a binding, e.g. `CycleModule.object()`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeclarationSite {
    pub enclosing: TypeRef,
    pub element: String,
}

impl DeclarationSite {
    #[inline]
    #[must_use]
    pub fn new(enclosing: TypeRef, element: impl Into<String>) -> Self {
        Self {
            enclosing,
            element: element.into(),
        }
    }
}

impl Display for DeclarationSite {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}()", self.enclosing, self.element)
    }
}

/// Rendered map key literal of a map contribution, e.g. `"foo"` or `1`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MapKey(pub String);

impl Display for MapKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingKind {
    /// Synthesized from an injectable constructor
    Injection,
    Provision,
    /// Binds the key to another key, without an instance of its own
    Delegate { delegate: Key },
    /// Declares a possibly empty multibound collection
    Multibinds,
    MembersInjection,
    SubcomponentCreator { subcomponent: TypeRef },
    /// Instance passed to a component creator
    BoundInstance,
    Production,
    /// The component instance itself
    ComponentSelf,
    /// Aggregated collection, synthesized from contributions
    Multibound(Multibound),
}

impl BindingKind {
    #[inline]
    #[must_use]
    pub const fn allows_scoping(&self) -> bool {
        matches!(self, Self::Injection | Self::Provision | Self::Delegate { .. } | Self::Production)
    }

    /// `false` for kinds that can only be produced through a factory object
    #[inline]
    #[must_use]
    pub const fn has_direct_instance_expression(&self) -> bool {
        !matches!(self, Self::Production | Self::MembersInjection)
    }

    #[inline]
    #[must_use]
    pub const fn binding_type(&self) -> BindingType {
        match self {
            Self::Production => BindingType::Production,
            Self::MembersInjection => BindingType::MembersInjection,
            _ => BindingType::Provision,
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Injection => "injection",
            Self::Provision => "provision",
            Self::Delegate { .. } => "delegate",
            Self::Multibinds => "multibinds",
            Self::MembersInjection => "members injection",
            Self::SubcomponentCreator { .. } => "subcomponent creator",
            Self::BoundInstance => "bound instance",
            Self::Production => "production",
            Self::ComponentSelf => "component",
            Self::Multibound(_) => "multibound",
        }
    }
}

/// A binding rule as declared by a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingDeclaration {
    pub key: Key,
    pub kind: BindingKind,
    pub dependencies: Vec<DependencyRequest>,
    pub scopes: Vec<Scope>,
    pub qualifiers: Vec<Qualifier>,
    pub contribution_type: ContributionType,
    pub map_key: Option<MapKey>,
    pub module: Option<TypeRef>,
    pub requires_module_instance: bool,
    pub site: DeclarationSite,
    pub(crate) order: usize,
}

impl BindingDeclaration {
    #[must_use]
    pub fn new(key: Key, kind: BindingKind, site: DeclarationSite) -> Self {
        let qualifiers = key.qualifier.iter().cloned().collect();
        Self {
            key,
            kind,
            dependencies: Vec::new(),
            scopes: Vec::new(),
            qualifiers,
            contribution_type: ContributionType::Unique,
            map_key: None,
            module: None,
            requires_module_instance: false,
            site,
            order: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn provision(key: Key, site: DeclarationSite) -> Self {
        Self::new(key, BindingKind::Provision, site)
    }

    #[inline]
    #[must_use]
    pub fn production(key: Key, site: DeclarationSite) -> Self {
        Self::new(key, BindingKind::Production, site)
    }

    /// `source` is the single parameter of the delegation
    #[must_use]
    pub fn delegate(key: Key, site: DeclarationSite, source: DependencyRequest) -> Self {
        let mut declaration = Self::new(
            key,
            BindingKind::Delegate {
                delegate: source.key.clone(),
            },
            site,
        );
        declaration.dependencies.push(source);
        declaration
    }

    #[inline]
    #[must_use]
    pub fn multibinds(key: Key, site: DeclarationSite) -> Self {
        Self::new(key, BindingKind::Multibinds, site)
    }

    #[inline]
    #[must_use]
    pub fn subcomponent_creator(key: Key, site: DeclarationSite, subcomponent: TypeRef) -> Self {
        Self::new(key, BindingKind::SubcomponentCreator { subcomponent }, site)
    }

    #[inline]
    #[must_use]
    pub fn with_dependency(mut self, request: DependencyRequest) -> Self {
        self.dependencies.push(request);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scopes.push(scope);
        self
    }

    /// Adds a raw qualifier annotation. The key takes the first one.
    #[must_use]
    pub fn with_qualifier(mut self, qualifier: Qualifier) -> Self {
        if self.key.qualifier.is_none() {
            self.key.qualifier = Some(qualifier.clone());
        }
        self.qualifiers.push(qualifier);
        self
    }

    #[inline]
    #[must_use]
    pub fn requiring_module_instance(mut self) -> Self {
        self.requires_module_instance = true;
        self
    }

    /// Turns the declaration into one element of `Set<T>`
    #[must_use]
    pub fn into_set(mut self) -> Self {
        self.key.ty = TypeRef::set_of(self.key.ty);
        self.contribute(ContributionType::Set)
    }

    /// Turns a declaration of `Set<T>` into a contribution of all of its elements
    #[inline]
    #[must_use]
    pub fn into_set_values(self) -> Self {
        self.contribute(ContributionType::SetValues)
    }

    /// Turns the declaration into the `map_key` entry of `Map<K, T>`
    #[must_use]
    pub fn into_map(mut self, key_type: TypeRef, map_key: MapKey) -> Self {
        self.key.ty = TypeRef::map_of(key_type, self.key.ty);
        self.map_key = Some(map_key);
        self.contribute(ContributionType::Map)
    }

    fn contribute(mut self, contribution_type: ContributionType) -> Self {
        self.contribution_type = contribution_type;
        self.key = self.key.with_contribution(ContributionId {
            module: self.site.enclosing.clone(),
            element: self.site.element.clone(),
        });
        self
    }

    #[inline]
    #[must_use]
    pub fn scope(&self) -> Option<&Scope> {
        self.scopes.first()
    }

    /// Whether this is a unique binding for its key, as opposed to a contribution or a `Multibinds` declaration
    #[inline]
    #[must_use]
    pub fn is_unique(&self) -> bool {
        !self.contribution_type.is_multibinding() && !matches!(self.kind, BindingKind::Multibinds)
    }

    #[inline]
    #[must_use]
    pub const fn order(&self) -> usize {
        self.order
    }
}

/// A type with an injectable constructor and/or injectable members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectableType {
    pub ty: TypeRef,
    pub has_constructor: bool,
    pub constructor_dependencies: Vec<DependencyRequest>,
    pub member_dependencies: Vec<DependencyRequest>,
    pub scopes: Vec<Scope>,
    pub qualifiers: Vec<Qualifier>,
    /// The constructor is an `@AssistedInject` constructor
    pub assisted_inject: bool,
    /// Constructor parameters passed by the caller instead of the graph
    pub assisted_parameters: Vec<AssistedParameter>,
}

impl InjectableType {
    #[inline]
    #[must_use]
    pub fn new(ty: TypeRef) -> Self {
        Self {
            ty,
            has_constructor: true,
            constructor_dependencies: Vec::new(),
            member_dependencies: Vec::new(),
            scopes: Vec::new(),
            qualifiers: Vec::new(),
            assisted_inject: false,
            assisted_parameters: Vec::new(),
        }
    }

    /// Type with injectable members only, which can be members-injected but not constructed
    #[inline]
    #[must_use]
    pub fn members_only(ty: TypeRef) -> Self {
        Self {
            has_constructor: false,
            ..Self::new(ty)
        }
    }

    #[inline]
    #[must_use]
    pub fn with_constructor_dependency(mut self, request: DependencyRequest) -> Self {
        self.constructor_dependencies.push(request);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_member_dependency(mut self, request: DependencyRequest) -> Self {
        self.member_dependencies.push(request);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scopes.push(scope);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_qualifier(mut self, qualifier: Qualifier) -> Self {
        self.qualifiers.push(qualifier);
        self
    }

    #[inline]
    #[must_use]
    pub fn assisted(mut self) -> Self {
        self.assisted_inject = true;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_assisted_parameter(mut self, parameter: AssistedParameter) -> Self {
        self.assisted_parameters.push(parameter);
        self
    }

    #[inline]
    #[must_use]
    pub fn scope(&self) -> Option<&Scope> {
        self.scopes.first()
    }

    /// Constructor dependencies followed by member dependencies
    pub fn dependencies(&self) -> impl Iterator<Item = &DependencyRequest> {
        self.constructor_dependencies.iter().chain(self.member_dependencies.iter())
    }
}

/// `@Assisted` constructor parameter, identified by its type and identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistedParameter {
    pub ty: TypeRef,
    pub identifier: String,
    pub qualifiers: Vec<Qualifier>,
    pub site: RequestSite,
}

impl AssistedParameter {
    #[inline]
    #[must_use]
    pub fn new(ty: TypeRef, site: RequestSite) -> Self {
        Self {
            ty,
            identifier: String::new(),
            qualifiers: Vec::new(),
            site,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }

    #[inline]
    #[must_use]
    pub fn with_qualifier(mut self, qualifier: Qualifier) -> Self {
        self.qualifiers.push(qualifier);
        self
    }
}

impl Display for AssistedParameter {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.identifier.is_empty() {
            write!(f, "@Assisted {}", self.ty)
        } else {
            write!(f, "@Assisted(\"{}\") {}", self.identifier, self.ty)
        }
    }
}

/// A module: a named collection of binding declarations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDescriptor {
    pub ty: TypeRef,
    pub includes: Vec<TypeRef>,
    pub declarations: Vec<BindingDeclaration>,
}

impl ModuleDescriptor {
    #[inline]
    #[must_use]
    pub fn new(ty: TypeRef) -> Self {
        Self {
            ty,
            includes: Vec::new(),
            declarations: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn including(mut self, module: TypeRef) -> Self {
        self.includes.push(module);
        self
    }

    /// Adds a declaration owned by this module
    #[must_use]
    pub fn with_declaration(mut self, mut declaration: BindingDeclaration) -> Self {
        declaration.module = Some(self.ty.clone());
        self.declarations.push(declaration);
        self
    }

    #[inline]
    #[must_use]
    pub fn package(&self) -> &str {
        self.ty.package().unwrap_or_default()
    }
}
