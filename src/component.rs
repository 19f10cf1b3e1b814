use alloc::{
    string::{String, ToString as _},
    vec::Vec,
};
use core::fmt::{self, Display, Formatter};

use crate::{
    key::{Key, TypeRef},
    request::{DependencyRequest, RequestKind, RequestSite},
    scope::Scope,
    utils::thread_safety::RcThreadSafety,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ComponentKind {
    Component,
    Subcomponent,
    ProductionComponent,
    ProductionSubcomponent,
}

impl ComponentKind {
    #[inline]
    #[must_use]
    pub const fn is_root(self) -> bool {
        matches!(self, Self::Component | Self::ProductionComponent)
    }

    #[inline]
    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::ProductionComponent | Self::ProductionSubcomponent)
    }

    #[must_use]
    pub const fn annotation(self) -> &'static str {
        match self {
            Self::Component => "@Component",
            Self::Subcomponent => "@Subcomponent",
            Self::ProductionComponent => "@ProductionComponent",
            Self::ProductionSubcomponent => "@ProductionSubcomponent",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ComponentMethodKind {
    /// Entry point returning the requested value
    Provision(DependencyRequest),
    /// Entry point injecting the members of its parameter
    MembersInjection(DependencyRequest),
    /// Returns a subcomponent, taking its modules as parameters
    SubcomponentFactory { subcomponent: TypeRef },
    /// Returns the creator of a subcomponent
    SubcomponentCreator { subcomponent: TypeRef },
}

/// An abstract method of a component
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComponentMethod {
    pub name: String,
    pub declaring_type: TypeRef,
    pub parameters: Vec<TypeRef>,
    pub kind: ComponentMethodKind,
    pub has_type_variables: bool,
    /// Declaring types of the methods this method overrides
    pub overrides: Vec<TypeRef>,
}

impl ComponentMethod {
    fn new(declaring_type: TypeRef, name: impl Into<String>, kind: ComponentMethodKind) -> Self {
        Self {
            name: name.into(),
            declaring_type,
            parameters: Vec::new(),
            kind,
            has_type_variables: false,
            overrides: Vec::new(),
        }
    }

    /// `T getT()`
    #[must_use]
    pub fn provision(declaring_type: TypeRef, name: impl Into<String>, key: Key) -> Self {
        let name = name.into();
        let site = RequestSite::component_method(declaring_type.clone(), name.clone());
        Self::new(
            declaring_type,
            name,
            ComponentMethodKind::Provision(DependencyRequest::instance(key, site)),
        )
    }

    /// `void inject(T instance)`
    #[must_use]
    pub fn members_injection(declaring_type: TypeRef, name: impl Into<String>, target: TypeRef) -> Self {
        let name = name.into();
        let site = RequestSite::component_method(declaring_type.clone(), name.clone());
        let request = DependencyRequest::new(Key::of(target.clone()), RequestKind::MembersInjector, site);
        let mut method = Self::new(declaring_type, name, ComponentMethodKind::MembersInjection(request));
        method.parameters.push(target);
        method
    }

    #[inline]
    #[must_use]
    pub fn subcomponent_factory(declaring_type: TypeRef, name: impl Into<String>, subcomponent: TypeRef) -> Self {
        Self::new(declaring_type, name, ComponentMethodKind::SubcomponentFactory { subcomponent })
    }

    #[inline]
    #[must_use]
    pub fn subcomponent_creator(declaring_type: TypeRef, name: impl Into<String>, subcomponent: TypeRef) -> Self {
        Self::new(declaring_type, name, ComponentMethodKind::SubcomponentCreator { subcomponent })
    }

    /// Changes the request kind of a provision method, e.g. `Provider<T> getT()`
    #[must_use]
    pub fn with_request_kind(mut self, kind: RequestKind) -> Self {
        if let ComponentMethodKind::Provision(request) = &mut self.kind {
            request.kind = kind;
        }
        self
    }

    #[inline]
    #[must_use]
    pub fn with_parameter(mut self, parameter: TypeRef) -> Self {
        self.parameters.push(parameter);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_type_variables(mut self) -> Self {
        self.has_type_variables = true;
        self
    }

    #[inline]
    #[must_use]
    pub fn overriding(mut self, declaring_type: TypeRef) -> Self {
        self.overrides.push(declaring_type);
        self
    }

    /// Request of an entry point method
    #[must_use]
    pub fn entry_point(&self) -> Option<&DependencyRequest> {
        match &self.kind {
            ComponentMethodKind::Provision(request) | ComponentMethodKind::MembersInjection(request) => Some(request),
            ComponentMethodKind::SubcomponentFactory { .. } | ComponentMethodKind::SubcomponentCreator { .. } => None,
        }
    }

    /// Subcomponent returned by a factory or creator method
    #[must_use]
    pub fn subcomponent(&self) -> Option<&TypeRef> {
        match &self.kind {
            ComponentMethodKind::SubcomponentFactory { subcomponent } | ComponentMethodKind::SubcomponentCreator { subcomponent } => {
                Some(subcomponent)
            }
            ComponentMethodKind::Provision(_) | ComponentMethodKind::MembersInjection(_) => None,
        }
    }
}

impl Display for ComponentMethod {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}(", self.declaring_type, self.name)?;
        for (index, parameter) in self.parameters.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{parameter}")?;
        }
        f.write_str(")")
    }
}

/// Instance passed to a component creator, e.g. `@BindsInstance Builder name(String name)`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoundInstance {
    pub key: Key,
    pub element: String,
}

/// Builder or factory of a component
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreatorDescriptor {
    pub ty: TypeRef,
    pub bound_instances: Vec<BoundInstance>,
}

impl CreatorDescriptor {
    #[inline]
    #[must_use]
    pub fn new(ty: TypeRef) -> Self {
        Self {
            ty,
            bound_instances: Vec::new(),
        }
    }

    #[must_use]
    pub fn binding_instance(mut self, key: Key, element: impl Into<String>) -> Self {
        self.bound_instances.push(BoundInstance {
            key,
            element: element.into(),
        });
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComponentDescriptor {
    pub ty: TypeRef,
    pub kind: ComponentKind,
    pub is_abstract: bool,
    pub modules: Vec<TypeRef>,
    pub scopes: Vec<Scope>,
    pub methods: Vec<ComponentMethod>,
    pub creators: Vec<CreatorDescriptor>,
}

impl ComponentDescriptor {
    #[must_use]
    pub fn new(ty: TypeRef, kind: ComponentKind) -> Self {
        Self {
            ty,
            kind,
            is_abstract: true,
            modules: Vec::new(),
            scopes: Vec::new(),
            methods: Vec::new(),
            creators: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn component(ty: TypeRef) -> Self {
        Self::new(ty, ComponentKind::Component)
    }

    #[inline]
    #[must_use]
    pub fn subcomponent(ty: TypeRef) -> Self {
        Self::new(ty, ComponentKind::Subcomponent)
    }

    #[inline]
    #[must_use]
    pub fn with_module(mut self, module: TypeRef) -> Self {
        self.modules.push(module);
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
    pub fn with_method(mut self, method: ComponentMethod) -> Self {
        self.methods.push(method);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_creator(mut self, creator: CreatorDescriptor) -> Self {
        self.creators.push(creator);
        self
    }

    #[inline]
    #[must_use]
    pub fn concrete(mut self) -> Self {
        self.is_abstract = false;
        self
    }

    #[inline]
    #[must_use]
    pub fn package(&self) -> &str {
        self.ty.package().unwrap_or_default()
    }

    #[inline]
    #[must_use]
    pub fn declares_scope(&self, scope: &Scope) -> bool {
        self.scopes.contains(scope)
    }

    pub fn entry_points(&self) -> impl Iterator<Item = (&ComponentMethod, &DependencyRequest)> {
        self.methods
            .iter()
            .filter_map(|method| method.entry_point().map(|request| (method, request)))
    }

    pub fn bound_instances(&self) -> impl Iterator<Item = &BoundInstance> {
        self.creators.iter().flat_map(|creator| creator.bound_instances.iter())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentIndex(usize);

impl ComponentIndex {
    #[inline]
    #[must_use]
    pub const fn get(self) -> usize {
        self.0
    }
}

#[derive(Clone, Debug)]
pub struct ComponentNode {
    pub descriptor: ComponentDescriptor,
    /// Lookup only, the tree is owned top-down by [`ComponentTree`]
    pub parent: Option<ComponentIndex>,
    pub children: Vec<ComponentIndex>,
}

/// Rooted component hierarchy, fixed before resolution.
/// The same descriptor may appear under several roots, each occurrence is a distinct node.
#[derive(Clone, Debug, Default)]
pub struct ComponentTree {
    nodes: Vec<ComponentNode>,
    roots: Vec<ComponentIndex>,
}

impl ComponentTree {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_root(&mut self, descriptor: ComponentDescriptor) -> ComponentIndex {
        let index = self.push(descriptor, None);
        self.roots.push(index);
        index
    }

    /// # Panics
    /// Panics if `parent` is not a node of this tree
    pub fn add_child(&mut self, parent: ComponentIndex, descriptor: ComponentDescriptor) -> ComponentIndex {
        let index = self.push(descriptor, Some(parent));
        self.nodes[parent.0].children.push(index);
        index
    }

    fn push(&mut self, descriptor: ComponentDescriptor, parent: Option<ComponentIndex>) -> ComponentIndex {
        let index = ComponentIndex(self.nodes.len());
        self.nodes.push(ComponentNode {
            descriptor,
            parent,
            children: Vec::new(),
        });
        index
    }

    /// # Panics
    /// Panics if `index` is not a node of this tree
    #[inline]
    #[must_use]
    pub fn node(&self, index: ComponentIndex) -> &ComponentNode {
        &self.nodes[index.0]
    }

    #[inline]
    #[must_use]
    pub fn descriptor(&self, index: ComponentIndex) -> &ComponentDescriptor {
        &self.node(index).descriptor
    }

    #[inline]
    #[must_use]
    pub fn roots(&self) -> &[ComponentIndex] {
        &self.roots
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn indices(&self) -> impl Iterator<Item = ComponentIndex> {
        (0..self.nodes.len()).map(ComponentIndex)
    }

    /// Root of the tree containing `index`
    #[must_use]
    pub fn root_of(&self, mut index: ComponentIndex) -> ComponentIndex {
        while let Some(parent) = self.node(index).parent {
            index = parent;
        }
        index
    }

    /// `index` and its descendants in pre-order
    #[must_use]
    pub fn preorder(&self, index: ComponentIndex) -> Vec<ComponentIndex> {
        let mut order = Vec::new();
        let mut stack = Vec::from([index]);
        while let Some(current) = stack.pop() {
            order.push(current);
            stack.extend(self.node(current).children.iter().rev().copied());
        }
        order
    }

    #[must_use]
    pub fn path(&self, index: ComponentIndex) -> ComponentPath {
        let mut segments = Vec::new();
        let mut current = Some(index);
        while let Some(index) = current {
            let node = self.node(index);
            segments.push(PathSegment {
                index,
                name: node.descriptor.ty.to_string(),
            });
            current = node.parent;
        }
        segments.reverse();
        ComponentPath(segments.into())
    }

    /// Child of `parent` created from the descriptor of `ty`
    #[must_use]
    pub fn child_of_type(&self, parent: ComponentIndex, ty: &TypeRef) -> Option<ComponentIndex> {
        self.node(parent)
            .children
            .iter()
            .copied()
            .find(|child| &self.descriptor(*child).ty == ty)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct PathSegment {
    index: ComponentIndex,
    name: String,
}

/// Root-to-node sequence of components. Cheap to clone and compare.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentPath(RcThreadSafety<[PathSegment]>);

impl ComponentPath {
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Paths are never empty, a root path has length 1
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn leaf(&self) -> ComponentIndex {
        self.0.last().map_or(ComponentIndex(0), |segment| segment.index)
    }

    #[must_use]
    pub fn root(&self) -> ComponentIndex {
        self.0.first().map_or(ComponentIndex(0), |segment| segment.index)
    }

    #[inline]
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.len() == 1
    }

    /// Component at `depth`, where the root has depth 1
    #[must_use]
    pub fn component_at(&self, depth: usize) -> Option<ComponentIndex> {
        depth.checked_sub(1).and_then(|index| self.0.get(index)).map(|segment| segment.index)
    }

    /// Ancestor (or self) with the given length
    #[must_use]
    pub fn prefix(&self, len: usize) -> Self {
        if len >= self.len() {
            return self.clone();
        }
        Self(self.0[..len].into())
    }

    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        (self.len() > 1).then(|| self.prefix(self.len() - 1))
    }

    /// `true` if `self` is `other` or one of its ancestors
    #[must_use]
    pub fn is_ancestor_of(&self, other: &Self) -> bool {
        self.len() <= other.len() && self.0[..] == other.0[..self.len()]
    }

    /// Components from the root to the leaf
    pub fn components(&self) -> impl DoubleEndedIterator<Item = ComponentIndex> + '_ {
        self.0.iter().map(|segment| segment.index)
    }

    /// `Child → Grandchild` segment from the component at `depth` down to the leaf
    #[must_use]
    pub fn display_from(&self, depth: usize) -> String {
        let start = depth.saturating_sub(1).min(self.len());
        let names: Vec<&str> = self.0[start..].iter().map(|segment| segment.name.as_str()).collect();
        names.join(" → ")
    }
}

impl Display for ComponentPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (index, segment) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str(" → ")?;
            }
            f.write_str(&segment.name)?;
        }
        Ok(())
    }
}
