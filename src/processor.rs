use alloc::{boxed::Box, collections::BTreeMap, string::String, vec::Vec};
use tracing::{debug, error, info_span};

use crate::{
    cache::ResolutionCache,
    component::{ComponentIndex, ComponentTree},
    config::Config,
    cycle::RenderMode,
    diagnostic::Diagnostic,
    errors::{ResolveErrorKind, ValidationErrorKind},
    graph::{BindingGraph, GraphBuilder, GraphRoots},
    oracle::{AccessibilityOracle, ExactTypeOracle, PublicAccessibilityOracle, TypeOracle},
    plugin::{BindingGraphPlugin, BindingGraphPlugins},
    resolver::BindingResolver,
    scope::{CachingPolicy, DefaultCachingPolicy},
    store::{DeclarationSource, DeclarationStore, InstalledModules},
    strategy::{StrategyPlan, StrategySelector},
    utils::thread_safety::RcThreadSafety,
    validation::{validate_declarations, validate_graph},
};

/// Receives the finalized graph and plan of a root component.
pub trait Emitter {
    /// # Errors
    /// Returns an error if the output cannot be produced
    fn emit(&mut self, graph: &BindingGraph, plan: &StrategyPlan, tree: &ComponentTree) -> anyhow::Result<Vec<u8>>;
}

impl<F> Emitter for F
where
    F: FnMut(&BindingGraph, &StrategyPlan, &ComponentTree) -> anyhow::Result<Vec<u8>>,
{
    #[inline]
    fn emit(&mut self, graph: &BindingGraph, plan: &StrategyPlan, tree: &ComponentTree) -> anyhow::Result<Vec<u8>> {
        self(graph, plan, tree)
    }
}

/// Result of processing one root component
#[derive(Debug)]
pub struct ComponentOutcome {
    pub root: ComponentIndex,
    /// `None` if building the graph failed
    pub graph: Option<RcThreadSafety<BindingGraph>>,
    /// Built when full binding graph validation is enabled
    pub full_graph: Option<RcThreadSafety<BindingGraph>>,
    /// `None` if any error was reported
    pub plan: Option<StrategyPlan>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ComponentOutcome {
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

/// Runs declarations through resolution, validation and strategy selection.
///
/// # Examples
/// ```
/// use bindplan::{BindingGraphProcessor, ComponentDescriptor, ComponentMethod, ComponentTree, DeclarationStore, InjectableType, Key, TypeRef};
///
/// let foo = TypeRef::declared("app", "Foo");
/// let component = TypeRef::declared("app", "AppComponent");
/// let store = DeclarationStore::new().with_injectable(InjectableType::new(foo.clone()));
/// let mut tree = ComponentTree::new();
/// tree.add_root(ComponentDescriptor::component(component.clone()).with_method(ComponentMethod::provision(component, "foo", Key::of(foo))));
///
/// let processor = BindingGraphProcessor::new(store, tree);
/// let outcomes = processor.process();
///
/// assert!(!outcomes[0].has_errors());
/// assert_eq!(outcomes[0].plan.as_ref().map(|plan| plan.len()), Some(1));
/// ```
pub struct BindingGraphProcessor {
    store: DeclarationStore,
    tree: ComponentTree,
    modules: InstalledModules,
    cache: ResolutionCache,
    config: Config,
    type_oracle: Box<dyn TypeOracle>,
    accessibility: Box<dyn AccessibilityOracle>,
    caching_policy: Box<dyn CachingPolicy>,
    plugins: BindingGraphPlugins,
}

impl BindingGraphProcessor {
    #[must_use]
    pub fn new(store: DeclarationStore, tree: ComponentTree) -> Self {
        let modules = store.installed_modules(&tree);
        Self {
            store,
            tree,
            modules,
            cache: ResolutionCache::new(),
            config: Config::default(),
            type_oracle: Box::new(ExactTypeOracle),
            accessibility: Box::new(PublicAccessibilityOracle),
            caching_policy: Box::new(DefaultCachingPolicy),
            plugins: BindingGraphPlugins::new(),
        }
    }

    #[must_use]
    pub fn from_source(source: &dyn DeclarationSource) -> Self {
        Self::new(DeclarationStore::from_source(source), source.component_tree())
    }

    #[inline]
    #[must_use]
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_type_oracle(mut self, oracle: impl TypeOracle + 'static) -> Self {
        self.type_oracle = Box::new(oracle);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_accessibility_oracle(mut self, oracle: impl AccessibilityOracle + 'static) -> Self {
        self.accessibility = Box::new(oracle);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_caching_policy(mut self, policy: impl CachingPolicy + 'static) -> Self {
        self.caching_policy = Box::new(policy);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_plugin(mut self, plugin: impl BindingGraphPlugin + 'static) -> Self {
        self.plugins.push(Box::new(plugin));
        self
    }

    /// Passes the plugins added so far the options they support
    #[must_use]
    pub fn with_plugin_options(mut self, options: &BTreeMap<String, String>) -> Self {
        self.plugins.init_options(options);
        self
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    #[must_use]
    pub fn tree(&self) -> &ComponentTree {
        &self.tree
    }

    #[inline]
    #[must_use]
    pub fn store(&self) -> &DeclarationStore {
        &self.store
    }

    #[inline]
    #[must_use]
    pub fn resolver(&self) -> BindingResolver<'_> {
        BindingResolver::new(&self.store, &self.tree, &self.modules, &self.cache, self.accessibility.as_ref())
    }

    /// Builds the graph of the tree rooted at `root`, or returns the one built before
    ///
    /// # Errors
    /// Returns [`ResolveErrorKind::Reentrant`] if a binding re-enters its own resolution
    pub fn build_graph(&self, root: ComponentIndex, roots: GraphRoots) -> Result<RcThreadSafety<BindingGraph>, ResolveErrorKind> {
        if let Some(graph) = self.cache.graph(root, roots) {
            debug!("Found in cache");
            return Ok(graph);
        }

        let resolver = self.resolver();
        let graph = RcThreadSafety::new(GraphBuilder::new(&resolver).build(root, roots)?);
        self.cache.insert_graph(root, roots, graph.clone());
        Ok(graph)
    }

    /// Processes every root component of the tree, in order
    #[must_use]
    pub fn process(&self) -> Vec<ComponentOutcome> {
        self.tree.roots().iter().map(|root| self.process_component(*root)).collect()
    }

    #[must_use]
    pub fn process_component(&self, root: ComponentIndex) -> ComponentOutcome {
        let span = info_span!("process_component", component = %self.tree.descriptor(root).ty);
        let _guard = span.enter();

        let root_path = self.tree.path(root);
        let mode = if self.config.full_binding_graph_validation {
            RenderMode::FullValidation
        } else {
            RenderMode::EntryPoint
        };
        let mut errors = validate_declarations(&self.store, &self.tree, &self.modules, self.type_oracle.as_ref(), root);
        let mut diagnostics = Vec::new();

        let graph = match self.build_graph(root, GraphRoots::EntryPoints) {
            Ok(graph) => {
                errors.extend(validate_graph(&graph, &self.tree, &self.store, mode));
                Some(graph)
            }
            Err(err) => {
                errors.push(ValidationErrorKind::Resolve(err));
                None
            }
        };

        let full_graph = if self.config.full_binding_graph_validation {
            match self.build_graph(root, GraphRoots::AllDeclarations) {
                Ok(full_graph) => {
                    for err in validate_graph(&full_graph, &self.tree, &self.store, RenderMode::FullValidation) {
                        if !errors.iter().any(|recorded| recorded.is_same_cause(&err)) {
                            errors.push(err);
                        }
                    }
                    Some(full_graph)
                }
                Err(err) => {
                    errors.push(ValidationErrorKind::Resolve(err));
                    None
                }
            }
        } else {
            None
        };
        diagnostics.extend(errors.into_iter().map(Diagnostic::from));

        if let Some(graph) = &graph {
            diagnostics.extend(self.plugins.visit(graph, &root_path));
        }

        let plan = match &graph {
            Some(graph) if !diagnostics.iter().any(Diagnostic::is_error) => Some(StrategySelector::select_all(
                graph,
                &self.tree,
                &self.config,
                self.caching_policy.as_ref(),
            )),
            _ => None,
        };
        debug!(diagnostics = diagnostics.len(), planned = plan.is_some(), "Component processed");

        ComponentOutcome {
            root,
            graph,
            full_graph,
            plan,
            diagnostics,
        }
    }

    /// Hands a successfully processed component to `emitter`
    ///
    /// # Errors
    /// Returns an error if the component has errors or the emitter fails
    pub fn emit(&self, outcome: &ComponentOutcome, emitter: &mut dyn Emitter) -> anyhow::Result<Vec<u8>> {
        let (Some(graph), Some(plan)) = (&outcome.graph, &outcome.plan) else {
            let err = anyhow::anyhow!(
                "{} has {} error(s), nothing to emit",
                self.tree.descriptor(outcome.root).ty,
                outcome.diagnostics.iter().filter(|diagnostic| diagnostic.is_error()).count()
            );
            error!("{}", err);
            return Err(err);
        };
        emitter.emit(graph, plan, &self.tree)
    }

    /// Drops every memoized binding and graph
    pub fn invalidate(&self) {
        self.cache.clear();
        debug!("Memo invalidated");
    }

    #[inline]
    #[must_use]
    pub fn resolved_len(&self) -> usize {
        self.cache.resolved_len()
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    #[allow(unused_imports)]
    use std::{format, string::*};

    use super::BindingGraphProcessor;
    use crate::{
        component::{ComponentDescriptor, ComponentMethod, ComponentTree},
        declaration::InjectableType,
        graph::{BindingGraph, GraphRoots},
        key::{Key, TypeRef},
        request::{DependencyRequest, RequestSite},
        store::DeclarationStore,
        strategy::StrategyPlan,
        utils::thread_safety::RcThreadSafety,
    };

    use alloc::vec::Vec;
    use tracing_test::traced_test;

    fn ty(name: &str) -> TypeRef {
        TypeRef::declared("test", name)
    }

    fn processor(missing: bool) -> BindingGraphProcessor {
        let mut foo = InjectableType::new(ty("Foo"));
        if missing {
            foo = foo.with_constructor_dependency(DependencyRequest::instance(Key::of(ty("Bar")), RequestSite::constructor(ty("Foo"), "bar")));
        }
        let store = DeclarationStore::new().with_injectable(foo);
        let mut tree = ComponentTree::new();
        tree.add_root(
            ComponentDescriptor::component(ty("TestComponent")).with_method(ComponentMethod::provision(ty("TestComponent"), "foo", Key::of(ty("Foo")))),
        );
        BindingGraphProcessor::new(store, tree)
    }

    #[test]
    #[traced_test]
    fn test_graph_memo_and_invalidate() {
        let processor = processor(false);
        let root = processor.tree().roots()[0];

        let first = processor.build_graph(root, GraphRoots::EntryPoints).unwrap();
        let second = processor.build_graph(root, GraphRoots::EntryPoints).unwrap();
        assert!(RcThreadSafety::ptr_eq(&first, &second));
        assert_eq!(processor.resolved_len(), 1);

        processor.invalidate();
        assert_eq!(processor.resolved_len(), 0);
        let third = processor.build_graph(root, GraphRoots::EntryPoints).unwrap();
        assert!(!RcThreadSafety::ptr_eq(&first, &third));
    }

    #[test]
    #[traced_test]
    fn test_emit() {
        let processor = processor(false);
        let outcome = processor.process_component(processor.tree().roots()[0]);
        let mut emitter = |graph: &BindingGraph, plan: &StrategyPlan, _: &ComponentTree| -> anyhow::Result<Vec<u8>> {
            Ok(alloc::format!("{} {}", graph.bindings().count(), plan.len()).into_bytes())
        };

        assert_eq!(processor.emit(&outcome, &mut emitter).unwrap(), b"1 1");
    }

    #[test]
    #[traced_test]
    fn test_errors_gate_strategy_selection() {
        let processor = processor(true);
        let outcome = processor.process_component(processor.tree().roots()[0]);
        let mut emitter = |_: &BindingGraph, _: &StrategyPlan, _: &ComponentTree| -> anyhow::Result<Vec<u8>> { Ok(Vec::new()) };

        assert!(outcome.has_errors());
        assert!(outcome.graph.is_some());
        assert!(outcome.plan.is_none());
        assert_eq!(
            processor.emit(&outcome, &mut emitter).unwrap_err().to_string(),
            "TestComponent has 1 error(s), nothing to emit"
        );
    }
}
