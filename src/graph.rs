use alloc::{collections::BTreeMap, string::String, vec::Vec};
use tracing::{debug, error, info_span};

use crate::{
    binding::{Binding, BindingId},
    component::{ComponentIndex, ComponentPath},
    declaration::BindingKind,
    errors::ResolveErrorKind,
    key::Key,
    request::DependencyRequest,
    resolver::BindingResolver,
    utils::thread_safety::RcThreadSafety,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeIndex(usize);

impl NodeIndex {
    #[inline]
    #[must_use]
    pub const fn get(self) -> usize {
        self.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeIndex(usize);

impl EdgeIndex {
    #[inline]
    #[must_use]
    pub const fn get(self) -> usize {
        self.0
    }
}

/// Where graph traversal starts
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GraphRoots {
    /// Entry points of every component of the tree
    EntryPoints,
    /// Entry points and every declaration of every component
    AllDeclarations,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MissingBinding {
    pub key: Key,
    /// Component the key was requested from
    pub component: ComponentPath,
}

#[derive(Clone, Debug)]
pub enum Node {
    Component(ComponentPath),
    Binding(RcThreadSafety<Binding>),
    Missing(MissingBinding),
}

impl Node {
    /// Component of the node: the component itself, the owner of a binding
    /// or the requesting component of a missing binding
    #[must_use]
    pub fn component_path(&self) -> &ComponentPath {
        match self {
            Self::Component(path) => path,
            Self::Binding(binding) => binding.owner(),
            Self::Missing(missing) => &missing.component,
        }
    }

    #[must_use]
    pub fn as_binding(&self) -> Option<&RcThreadSafety<Binding>> {
        match self {
            Self::Binding(binding) => Some(binding),
            Self::Component(_) | Self::Missing(_) => None,
        }
    }
}

#[derive(Clone, Debug)]
pub enum EdgeKind {
    /// `entry_point` is set for edges from a component to the target of one of its entry points
    Dependency { request: DependencyRequest, entry_point: bool },
    /// From a component to a subcomponent, `method` is the factory or creator method if there is one
    ChildFactory { method: Option<String> },
}

#[derive(Clone, Debug)]
pub struct Edge {
    pub source: NodeIndex,
    pub target: NodeIndex,
    pub kind: EdgeKind,
}

impl Edge {
    #[must_use]
    pub fn request(&self) -> Option<&DependencyRequest> {
        match &self.kind {
            EdgeKind::Dependency { request, .. } => Some(request),
            EdgeKind::ChildFactory { .. } => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_entry_point(&self) -> bool {
        matches!(self.kind, EdgeKind::Dependency { entry_point: true, .. })
    }

    /// Dependency edge whose request needs the value immediately
    #[must_use]
    pub fn is_synchronous(&self) -> bool {
        self.request().is_some_and(|request| request.kind.is_synchronous())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum NodeKey {
    Component(ComponentPath),
    Binding(BindingId),
    Missing(Key, ComponentPath),
}

/// Resolved bindings of one root component and its subcomponents.
#[derive(Debug)]
pub struct BindingGraph {
    root: ComponentIndex,
    roots: GraphRoots,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    outgoing: Vec<Vec<EdgeIndex>>,
    predecessors: Vec<Option<EdgeIndex>>,
    depths: Vec<usize>,
    index: BTreeMap<NodeKey, NodeIndex>,
    resolution_errors: Vec<ResolveErrorKind>,
}

impl BindingGraph {
    fn new(root: ComponentIndex, roots: GraphRoots) -> Self {
        Self {
            root,
            roots,
            nodes: Vec::new(),
            edges: Vec::new(),
            outgoing: Vec::new(),
            predecessors: Vec::new(),
            depths: Vec::new(),
            index: BTreeMap::new(),
            resolution_errors: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn root(&self) -> ComponentIndex {
        self.root
    }

    #[inline]
    #[must_use]
    pub fn roots(&self) -> GraphRoots {
        self.roots
    }

    #[inline]
    #[must_use]
    pub fn is_full_binding_graph(&self) -> bool {
        self.roots == GraphRoots::AllDeclarations
    }

    #[inline]
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// # Panics
    /// Panics if `index` is not a node of this graph
    #[inline]
    #[must_use]
    pub fn node(&self, index: NodeIndex) -> &Node {
        &self.nodes[index.0]
    }

    pub fn node_indices(&self) -> impl Iterator<Item = NodeIndex> {
        (0..self.nodes.len()).map(NodeIndex)
    }

    #[inline]
    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// # Panics
    /// Panics if `index` is not an edge of this graph
    #[inline]
    #[must_use]
    pub fn edge(&self, index: EdgeIndex) -> &Edge {
        &self.edges[index.0]
    }

    pub fn edge_indices(&self) -> impl Iterator<Item = EdgeIndex> {
        (0..self.edges.len()).map(EdgeIndex)
    }

    /// Outgoing edges of `node`, in request order
    #[must_use]
    pub fn outgoing(&self, node: NodeIndex) -> &[EdgeIndex] {
        self.outgoing.get(node.0).map_or(&[], Vec::as_slice)
    }

    pub fn bindings(&self) -> impl Iterator<Item = (NodeIndex, &RcThreadSafety<Binding>)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(index, node)| node.as_binding().map(|binding| (NodeIndex(index), binding)))
    }

    pub fn missing_bindings(&self) -> impl Iterator<Item = (NodeIndex, &MissingBinding)> {
        self.nodes.iter().enumerate().filter_map(|(index, node)| match node {
            Node::Missing(missing) => Some((NodeIndex(index), missing)),
            Node::Component(_) | Node::Binding(_) => None,
        })
    }

    pub fn entry_point_edges(&self) -> impl Iterator<Item = (EdgeIndex, &Edge)> {
        self.edges
            .iter()
            .enumerate()
            .filter(|(_, edge)| edge.is_entry_point())
            .map(|(index, edge)| (EdgeIndex(index), edge))
    }

    #[must_use]
    pub fn component_node(&self, path: &ComponentPath) -> Option<NodeIndex> {
        self.index.get(&NodeKey::Component(path.clone())).copied()
    }

    #[must_use]
    pub fn binding_node(&self, id: &BindingId) -> Option<NodeIndex> {
        self.index.get(&NodeKey::Binding(id.clone())).copied()
    }

    /// Binding for `key` owned by `owner`
    #[must_use]
    pub fn binding(&self, key: &Key, owner: &ComponentPath) -> Option<&RcThreadSafety<Binding>> {
        self.bindings()
            .find(|(_, binding)| binding.key() == key && binding.owner() == owner)
            .map(|(_, binding)| binding)
    }

    /// Target bindings of the dependency edges of `node`, in request order
    pub fn dependencies_of(&self, node: NodeIndex) -> impl Iterator<Item = (&Edge, &Node)> {
        self.outgoing(node).iter().map(|edge| {
            let edge = self.edge(*edge);
            (edge, self.node(edge.target))
        })
    }

    /// The first path that reached `node`, from an entry point edge to the edge entering `node`.
    /// Empty for component nodes and for declarations that are traversal roots.
    #[must_use]
    pub fn first_path(&self, node: NodeIndex) -> Vec<EdgeIndex> {
        let mut path = Vec::new();
        let mut current = node;
        while let Some(Some(edge)) = self.predecessors.get(current.0) {
            path.push(*edge);
            current = self.edge(*edge).source;
        }
        path.reverse();
        path
    }

    /// Length of [`BindingGraph::first_path`]
    #[must_use]
    pub fn discovery_depth(&self, node: NodeIndex) -> usize {
        self.depths.get(node.0).copied().unwrap_or_default()
    }

    /// Errors met while resolving the bindings of this graph, each once
    #[inline]
    #[must_use]
    pub fn resolution_errors(&self) -> &[ResolveErrorKind] {
        &self.resolution_errors
    }

    fn add_node(&mut self, key: NodeKey, node: Node) -> (NodeIndex, bool) {
        if let Some(index) = self.index.get(&key) {
            return (*index, false);
        }
        let index = NodeIndex(self.nodes.len());
        self.nodes.push(node);
        self.outgoing.push(Vec::new());
        self.predecessors.push(None);
        self.depths.push(0);
        self.index.insert(key, index);
        (index, true)
    }

    fn add_edge(&mut self, source: NodeIndex, target: NodeIndex, kind: EdgeKind) -> EdgeIndex {
        let index = EdgeIndex(self.edges.len());
        self.edges.push(Edge { source, target, kind });
        self.outgoing[source.0].push(index);
        index
    }

    fn discovered_through(&mut self, node: NodeIndex, edge: EdgeIndex) {
        let source = self.edge(edge).source;
        self.predecessors[node.0] = Some(edge);
        self.depths[node.0] = self.depths[source.0] + 1;
    }

    fn record_error(&mut self, err: &ResolveErrorKind) {
        if !self.resolution_errors.iter().any(|recorded| recorded.is_same_cause(err)) {
            self.resolution_errors.push(err.clone());
        }
    }
}

/// Builds binding graphs by traversing from entry points, and optionally from every declaration.
pub struct GraphBuilder<'r, 'a> {
    resolver: &'r BindingResolver<'a>,
}

impl<'r, 'a> GraphBuilder<'r, 'a> {
    #[inline]
    #[must_use]
    pub const fn new(resolver: &'r BindingResolver<'a>) -> Self {
        Self { resolver }
    }

    /// # Errors
    /// Returns [`ResolveErrorKind::Reentrant`] if a binding re-enters its own resolution.
    /// Other resolution errors are recorded in the graph.
    pub fn build(&self, root: ComponentIndex, roots: GraphRoots) -> Result<BindingGraph, ResolveErrorKind> {
        let tree = self.resolver.tree();
        let span = info_span!("build_graph", component = %tree.descriptor(root).ty, roots = ?roots);
        let _guard = span.enter();

        let mut graph = BindingGraph::new(root, roots);
        let components = tree.preorder(root);
        for component in &components {
            let path = tree.path(*component);
            let (node, _) = graph.add_node(NodeKey::Component(path.clone()), Node::Component(path.clone()));
            let Some(parent) = path.parent() else {
                continue;
            };
            let Some(parent_node) = graph.component_node(&parent) else {
                continue;
            };
            let child_type = &tree.descriptor(*component).ty;
            let method = tree
                .descriptor(parent.leaf())
                .methods
                .iter()
                .find(|method| method.subcomponent() == Some(child_type))
                .map(|method| method.name.clone());
            graph.add_edge(parent_node, node, EdgeKind::ChildFactory { method });
        }

        let mut stack = Vec::new();
        for component in &components {
            let path = tree.path(*component);
            let Some(component_node) = graph.component_node(&path) else {
                continue;
            };
            let descriptor = tree.descriptor(*component);

            for (_, request) in descriptor.entry_points() {
                let (target, new) = self.target(&mut graph, request, &path).inspect_err(|err| error!("{}", err))?;
                let edge = graph.add_edge(
                    component_node,
                    target,
                    EdgeKind::Dependency {
                        request: request.clone(),
                        entry_point: true,
                    },
                );
                if new {
                    graph.discovered_through(target, edge);
                    stack.push(target);
                    self.drain(&mut graph, &mut stack)?;
                }
            }

            if roots == GraphRoots::AllDeclarations {
                for key in self.declared_keys(*component) {
                    match self.resolver.resolve(&key, &path) {
                        Ok(binding) => {
                            let (node, new) = Self::binding_node(&mut graph, binding);
                            if new {
                                stack.push(node);
                                self.drain(&mut graph, &mut stack)?;
                            }
                        }
                        Err(ResolveErrorKind::Missing { .. }) => {}
                        Err(err) => {
                            error!("{}", err);
                            return Err(err);
                        }
                    }
                }
            }
        }

        debug!(nodes = graph.nodes.len(), edges = graph.edges.len(), "Graph built");
        Ok(graph)
    }

    /// Keys declared by a component itself, used as traversal roots of a full graph
    fn declared_keys(&self, component: ComponentIndex) -> Vec<Key> {
        let store = self.resolver.store();
        let descriptor = self.resolver.tree().descriptor(component);
        let mut keys: Vec<Key> = store
            .declarations(self.resolver.modules_of(component))
            .iter()
            .map(|declaration| match declaration.kind {
                BindingKind::Multibinds => declaration.key.without_contribution(),
                _ => declaration.key.clone(),
            })
            .collect();
        keys.extend(descriptor.bound_instances().map(|instance| instance.key.clone()));
        keys
    }

    fn drain(&self, graph: &mut BindingGraph, stack: &mut Vec<NodeIndex>) -> Result<(), ResolveErrorKind> {
        while let Some(node) = stack.pop() {
            let Some(binding) = graph.node(node).as_binding().cloned() else {
                continue;
            };
            let mut discovered = Vec::new();
            for request in binding.dependencies() {
                let (target, new) = self.target(graph, request, binding.owner())?;
                let edge = graph.add_edge(
                    node,
                    target,
                    EdgeKind::Dependency {
                        request: request.clone(),
                        entry_point: false,
                    },
                );
                if new {
                    graph.discovered_through(target, edge);
                    discovered.push(target);
                }
            }
            stack.extend(discovered.into_iter().rev());
        }
        Ok(())
    }

    fn target(
        &self,
        graph: &mut BindingGraph,
        request: &DependencyRequest,
        path: &ComponentPath,
    ) -> Result<(NodeIndex, bool), ResolveErrorKind> {
        match self.resolver.resolve_request(request, path) {
            Ok(binding) => Ok(Self::binding_node(graph, binding)),
            Err(ResolveErrorKind::Missing { key, component }) => Ok(graph.add_node(
                NodeKey::Missing(key.clone(), component.clone()),
                Node::Missing(MissingBinding { key, component }),
            )),
            Err(err) => Err(err),
        }
    }

    fn binding_node(graph: &mut BindingGraph, binding: RcThreadSafety<Binding>) -> (NodeIndex, bool) {
        let key = NodeKey::Binding(binding.id().clone());
        if let Some(index) = graph.index.get(&key) {
            return (*index, false);
        }
        for problem in binding.problems() {
            graph.record_error(problem);
        }
        graph.add_node(key, Node::Binding(binding))
    }
}
