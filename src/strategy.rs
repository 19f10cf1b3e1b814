use alloc::{collections::BTreeMap, string::String, vec::Vec};
use tracing::{debug, info_span};

use crate::{
    binding::{Binding, BindingId},
    component::{ComponentPath, ComponentTree},
    config::Config,
    declaration::BindingKind,
    graph::BindingGraph,
    request::RequestKind,
    scope::CachingPolicy,
    utils::thread_safety::RcThreadSafety,
};

/// Locking of a cached field
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CachingDiscipline {
    /// Created at most once, under a lock
    DoubleCheck,
    /// May be created more than once under contention, without locking
    SingleCheck,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InlineForm {
    /// Construction expression written at the use site
    Direct,
    /// Construction wrapped in a private method of the component
    PrivateMethod,
    /// Call of the component's own entry point for the key
    ComponentMethod { name: String },
    /// The expression of the delegation source, without an indirection object
    Delegate { to: BindingId },
}

/// How the value stored in a cached field is first created
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Creation {
    Factory,
    SwitchingCase { dispatcher: usize, case: usize },
}

/// How a request of a binding is materialized.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Strategy {
    Inline(InlineForm),
    FieldCached {
        holder: ComponentPath,
        discipline: CachingDiscipline,
        creation: Creation,
    },
    SharedFactory,
    SwitchingDispatch { dispatcher: usize, case: usize },
    /// The binding is owned by an ancestor, which materializes it
    DelegateToAncestor { owner: ComponentPath },
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StrategyKey {
    pub binding: BindingId,
    pub kind: RequestKind,
    pub component: ComponentPath,
}

/// Dispatch-by-id object of one component, serving `cases[case]`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SwitchingDispatcher {
    pub component: ComponentPath,
    pub index: usize,
    pub cases: Vec<BindingId>,
}

/// Strategies picked for every request of a graph.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StrategyPlan {
    entries: BTreeMap<StrategyKey, Strategy>,
    dispatchers: Vec<SwitchingDispatcher>,
}

impl StrategyPlan {
    #[must_use]
    pub fn get(&self, binding: &BindingId, kind: RequestKind, component: &ComponentPath) -> Option<&Strategy> {
        self.entries.get(&StrategyKey {
            binding: binding.clone(),
            kind,
            component: component.clone(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StrategyKey, &Strategy)> {
        self.entries.iter()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn dispatchers(&self) -> &[SwitchingDispatcher] {
        &self.dispatchers
    }
}

/// Picks the cheapest correct strategy per (binding, request kind, component).
pub struct StrategySelector<'g> {
    graph: &'g BindingGraph,
    tree: &'g ComponentTree,
    config: &'g Config,
    policy: &'g dyn CachingPolicy,
    plan: StrategyPlan,
    cases: BTreeMap<(ComponentPath, BindingId), (usize, usize)>,
    next_case: BTreeMap<ComponentPath, usize>,
}

impl<'g> StrategySelector<'g> {
    #[must_use]
    pub fn new(graph: &'g BindingGraph, tree: &'g ComponentTree, config: &'g Config, policy: &'g dyn CachingPolicy) -> Self {
        Self {
            graph,
            tree,
            config,
            policy,
            plan: StrategyPlan::default(),
            cases: BTreeMap::new(),
            next_case: BTreeMap::new(),
        }
    }

    /// Selects a strategy for every dependency edge of `graph`
    #[must_use]
    pub fn select_all(graph: &'g BindingGraph, tree: &'g ComponentTree, config: &'g Config, policy: &'g dyn CachingPolicy) -> StrategyPlan {
        let span = info_span!("select_strategies", component = %tree.descriptor(graph.root()).ty);
        let _guard = span.enter();

        let mut selector = Self::new(graph, tree, config, policy);
        for edge in graph.edges() {
            let Some(request) = edge.request() else {
                continue;
            };
            let Some(binding) = graph.node(edge.target).as_binding() else {
                continue;
            };
            let path = graph.node(edge.source).component_path().clone();
            selector.select_strategy(binding, request.kind, &path);
        }
        debug!(
            strategies = selector.plan.len(),
            dispatchers = selector.plan.dispatchers.len(),
            "Strategies selected"
        );
        selector.finish()
    }

    /// Strategy of `binding` requested as `kind` from the component at `path`, memoized
    pub fn select_strategy(&mut self, binding: &Binding, kind: RequestKind, path: &ComponentPath) -> Strategy {
        let key = StrategyKey {
            binding: binding.id().clone(),
            kind,
            component: path.clone(),
        };
        if let Some(strategy) = self.plan.entries.get(&key) {
            debug!("Found in cache");
            return strategy.clone();
        }

        let strategy = self.compute(binding, kind, path);
        debug!(binding = %binding.key(), ?kind, ?strategy, "Strategy selected");
        self.plan.entries.insert(key, strategy.clone());
        strategy
    }

    #[inline]
    #[must_use]
    pub fn finish(self) -> StrategyPlan {
        self.plan
    }

    fn compute(&mut self, binding: &Binding, kind: RequestKind, path: &ComponentPath) -> Strategy {
        let owner = binding.owner();
        if owner != path {
            self.select_strategy(binding, kind, owner);
            return Strategy::DelegateToAncestor { owner: owner.clone() };
        }

        let source = self.delegate_source(binding);
        if let BindingKind::Delegate { .. } = binding.kind() {
            if !binding.needs_caching(source.as_deref()) {
                if let Some(source) = &source {
                    return Strategy::Inline(InlineForm::Delegate { to: source.id().clone() });
                }
            }
        }

        let direct = binding.kind().has_direct_instance_expression();
        if binding.needs_caching(source.as_deref()) {
            let discipline = match binding.scope() {
                Some(scope) if self.policy.is_concurrency_sensitive(scope) => CachingDiscipline::DoubleCheck,
                _ => CachingDiscipline::SingleCheck,
            };
            let creation = if self.config.fast_init && direct {
                let (dispatcher, case) = self.switching_case(binding, path);
                Creation::SwitchingCase { dispatcher, case }
            } else {
                Creation::Factory
            };
            return Strategy::FieldCached {
                holder: owner.clone(),
                discipline,
                creation,
            };
        }

        if !direct {
            return Strategy::SharedFactory;
        }
        if kind.is_synchronous() {
            let entry_point = self
                .tree
                .descriptor(path.leaf())
                .entry_points()
                .find(|(_, request)| request.kind == RequestKind::Instance && &request.key == binding.key())
                .map(|(method, _)| method.name.clone());
            let form = match entry_point {
                Some(name) => InlineForm::ComponentMethod { name },
                None if binding.dependencies().is_empty() => InlineForm::Direct,
                None => InlineForm::PrivateMethod,
            };
            return Strategy::Inline(form);
        }
        if self.config.fast_init {
            let (dispatcher, case) = self.switching_case(binding, path);
            return Strategy::SwitchingDispatch { dispatcher, case };
        }
        Strategy::SharedFactory
    }

    /// Binding a delegation is bound to, if it is in the graph
    fn delegate_source(&self, binding: &Binding) -> Option<RcThreadSafety<Binding>> {
        let BindingKind::Delegate { .. } = binding.kind() else {
            return None;
        };
        let node = self.graph.binding_node(binding.id())?;
        self.graph
            .dependencies_of(node)
            .find_map(|(_, target)| target.as_binding().cloned())
    }

    /// Case of `binding` in the dispatchers of `path`, one id per binding
    fn switching_case(&mut self, binding: &Binding, path: &ComponentPath) -> (usize, usize) {
        let key = (path.clone(), binding.id().clone());
        if let Some(case) = self.cases.get(&key) {
            return *case;
        }

        let max_cases = self.config.switching_dispatch_max_cases.max(1);
        let next = self.next_case.entry(path.clone()).or_default();
        let id = *next;
        *next += 1;
        let (index, case) = (id / max_cases, id % max_cases);

        let dispatchers = &mut self.plan.dispatchers;
        let position = match dispatchers
            .iter()
            .position(|dispatcher| &dispatcher.component == path && dispatcher.index == index)
        {
            Some(position) => position,
            None => {
                dispatchers.push(SwitchingDispatcher {
                    component: path.clone(),
                    index,
                    cases: Vec::new(),
                });
                dispatchers.len() - 1
            }
        };
        dispatchers[position].cases.push(binding.id().clone());

        self.cases.insert(key, (index, case));
        (index, case)
    }
}
