use alloc::{boxed::Box, collections::BTreeMap, format, string::String, vec::Vec};
use tracing::{debug, error, info_span};

use crate::{
    component::ComponentPath,
    diagnostic::{Diagnostic, DiagnosticReporter, Severity},
    graph::BindingGraph,
    utils::thread_safety::{SendSafety, SyncSafety},
};

/// External check run over every validated binding graph.
///
/// Plugins only read the graph and report diagnostics.
pub trait BindingGraphPlugin: SendSafety + SyncSafety {
    fn plugin_name(&self) -> &str;

    /// Option names read by the plugin
    fn supported_options(&self) -> Vec<String> {
        Vec::new()
    }

    /// Called once before any graph is visited, with the options listed in [`BindingGraphPlugin::supported_options`]
    fn init_options(&mut self, options: &BTreeMap<String, String>) {
        let _ = options;
    }

    /// # Errors
    /// An error fails the build with a diagnostic naming the plugin
    fn visit_graph(&self, graph: &BindingGraph, reporter: &mut DiagnosticReporter) -> anyhow::Result<()>;
}

#[derive(Default)]
pub struct BindingGraphPlugins {
    plugins: Vec<Box<dyn BindingGraphPlugin>>,
}

impl BindingGraphPlugins {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn push(&mut self, plugin: Box<dyn BindingGraphPlugin>) {
        self.plugins.push(plugin);
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Passes every plugin the options it supports
    pub fn init_options(&mut self, options: &BTreeMap<String, String>) {
        for plugin in &mut self.plugins {
            let supported: BTreeMap<String, String> = plugin
                .supported_options()
                .into_iter()
                .filter_map(|name| options.get(&name).map(|value| (name, value.clone())))
                .collect();
            plugin.init_options(&supported);
        }
    }

    /// Runs every plugin over `graph`, in registration order
    #[must_use]
    pub fn visit(&self, graph: &BindingGraph, root: &ComponentPath) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        for plugin in &self.plugins {
            let name = plugin.plugin_name();
            let span = info_span!("plugin", name);
            let _guard = span.enter();

            let mut reporter = DiagnosticReporter::for_plugin(name);
            if let Err(err) = plugin.visit_graph(graph, &mut reporter) {
                error!("{:#}", err);
                reporter.report_component(Severity::Error, root, format!("{name} failed: {err:#}"));
            }
            let reported = reporter.into_diagnostics();
            debug!(diagnostics = reported.len(), "Plugin visited");
            diagnostics.extend(reported);
        }
        diagnostics
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    #[allow(unused_imports)]
    use std::{format, string::*};

    use super::{BindingGraphPlugin, BindingGraphPlugins};
    use crate::{
        cache::ResolutionCache,
        component::{ComponentDescriptor, ComponentTree},
        diagnostic::{DiagnosticReporter, Severity},
        graph::{BindingGraph, GraphBuilder, GraphRoots},
        key::TypeRef,
        oracle::PublicAccessibilityOracle,
        resolver::BindingResolver,
        store::DeclarationStore,
    };

    use alloc::{
        boxed::Box,
        collections::BTreeMap,
        string::{String, ToString as _},
        vec::Vec,
    };
    use tracing_test::traced_test;

    struct CountingPlugin {
        prefix: String,
    }

    impl BindingGraphPlugin for CountingPlugin {
        fn plugin_name(&self) -> &str {
            "counting"
        }

        fn supported_options(&self) -> Vec<String> {
            Vec::from(["counting.prefix".to_string()])
        }

        fn init_options(&mut self, options: &BTreeMap<String, String>) {
            if let Some(prefix) = options.get("counting.prefix") {
                self.prefix.clone_from(prefix);
            }
        }

        fn visit_graph(&self, graph: &BindingGraph, reporter: &mut DiagnosticReporter) -> anyhow::Result<()> {
            let root = graph.nodes()[0].component_path().clone();
            reporter.report_component(Severity::Warning, &root, alloc::format!("{}{}", self.prefix, graph.nodes().len()));
            Ok(())
        }
    }

    struct FailingPlugin;

    impl BindingGraphPlugin for FailingPlugin {
        fn plugin_name(&self) -> &str {
            "failing"
        }

        fn visit_graph(&self, _graph: &BindingGraph, _reporter: &mut DiagnosticReporter) -> anyhow::Result<()> {
            anyhow::bail!("boom")
        }
    }

    #[test]
    #[traced_test]
    fn test_plugins() {
        let store = DeclarationStore::new();
        let mut tree = ComponentTree::new();
        let root = tree.add_root(ComponentDescriptor::component(TypeRef::declared("test", "TestComponent")));
        let modules = store.installed_modules(&tree);
        let cache = ResolutionCache::new();
        let resolver = BindingResolver::new(&store, &tree, &modules, &cache, &PublicAccessibilityOracle);
        let graph = GraphBuilder::new(&resolver).build(root, GraphRoots::EntryPoints).unwrap();

        let mut plugins = BindingGraphPlugins::new();
        plugins.push(Box::new(CountingPlugin { prefix: String::new() }));
        plugins.push(Box::new(FailingPlugin));
        plugins.init_options(&BTreeMap::from([
            ("counting.prefix".to_string(), "nodes: ".to_string()),
            ("other".to_string(), "ignored".to_string()),
        ]));

        let diagnostics = plugins.visit(&graph, &tree.path(root));

        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics[0].severity, Severity::Warning);
        assert_eq!(diagnostics[0].message, "nodes: 1");
        assert_eq!(diagnostics[0].plugin.as_deref(), Some("counting"));
        assert!(diagnostics[1].is_error());
        assert_eq!(diagnostics[1].to_string(), "error: [failing] failing failed: boom");
    }
}
