use alloc::collections::{BTreeMap, BTreeSet};
use parking_lot::Mutex;

use crate::{
    binding::{Binding, BindingType},
    component::{ComponentIndex, ComponentPath},
    graph::{BindingGraph, GraphRoots},
    key::Key,
    utils::thread_safety::RcThreadSafety,
};

pub(crate) type ResolutionKey = (BindingType, Key, ComponentPath);

#[derive(Default)]
struct Memo {
    bindings: BTreeMap<ResolutionKey, RcThreadSafety<Binding>>,
    in_progress: BTreeSet<ResolutionKey>,
    graphs: BTreeMap<(ComponentIndex, GraphRoots), RcThreadSafety<BindingGraph>>,
}

/// Memo of resolved bindings and built graphs.
///
/// Every memo lives behind one lock, so [`ResolutionCache::clear`] drops them together.
/// The lock is never held while resolving.
#[derive(Default)]
pub struct ResolutionCache {
    memo: Mutex<Memo>,
}

impl ResolutionCache {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub(crate) fn binding(&self, key: &ResolutionKey) -> Option<RcThreadSafety<Binding>> {
        self.memo.lock().bindings.get(key).cloned()
    }

    pub(crate) fn insert_binding(&self, key: ResolutionKey, binding: RcThreadSafety<Binding>) {
        self.memo.lock().bindings.insert(key, binding);
    }

    /// Marks `key` as being resolved, `false` if it already is
    #[must_use]
    pub(crate) fn enter(&self, key: &ResolutionKey) -> bool {
        self.memo.lock().in_progress.insert(key.clone())
    }

    pub(crate) fn exit(&self, key: &ResolutionKey) {
        self.memo.lock().in_progress.remove(key);
    }

    #[must_use]
    pub(crate) fn graph(&self, root: ComponentIndex, roots: GraphRoots) -> Option<RcThreadSafety<BindingGraph>> {
        self.memo.lock().graphs.get(&(root, roots)).cloned()
    }

    pub(crate) fn insert_graph(&self, root: ComponentIndex, roots: GraphRoots, graph: RcThreadSafety<BindingGraph>) {
        self.memo.lock().graphs.insert((root, roots), graph);
    }

    #[inline]
    #[must_use]
    pub fn resolved_len(&self) -> usize {
        self.memo.lock().bindings.len()
    }

    pub fn clear(&self) {
        let mut memo = self.memo.lock();
        memo.bindings.clear();
        memo.in_progress.clear();
        memo.graphs.clear();
    }
}
