use alloc::{
    collections::{BTreeMap, BTreeSet},
    format,
    string::{String, ToString as _},
    vec::Vec,
};
use core::fmt::{self, Display, Formatter, Write as _};

use crate::{
    binding::{Binding, BindingId},
    component::ComponentPath,
    errors::ValidationErrorKind,
    graph::{BindingGraph, EdgeIndex},
    request::DependencyRequest,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Note => "note",
        })
    }
}

/// Element a diagnostic is reported on
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Anchor {
    Binding(BindingId),
    Request(DependencyRequest),
    Component(ComponentPath),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub anchor: Anchor,
    /// Name of the plugin that reported the diagnostic
    pub plugin: Option<String>,
}

impl Diagnostic {
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl From<ValidationErrorKind> for Diagnostic {
    fn from(err: ValidationErrorKind) -> Self {
        Self {
            severity: err.severity(),
            anchor: err.anchor(),
            message: err.to_string(),
            plugin: None,
        }
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.severity)?;
        if let Some(plugin) = &self.plugin {
            write!(f, "[{plugin}] ")?;
        }
        f.write_str(&self.message)
    }
}

/// Collects diagnostics reported by a plugin.
#[derive(Debug, Default)]
pub struct DiagnosticReporter {
    plugin: Option<String>,
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticReporter {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub(crate) fn for_plugin(plugin: &str) -> Self {
        Self {
            plugin: Some(plugin.to_string()),
            diagnostics: Vec::new(),
        }
    }

    pub fn report(&mut self, severity: Severity, anchor: Anchor, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            severity,
            message: message.into(),
            anchor,
            plugin: self.plugin.clone(),
        });
    }

    #[inline]
    pub fn report_component(&mut self, severity: Severity, component: &ComponentPath, message: impl Into<String>) {
        self.report(severity, Anchor::Component(component.clone()), message);
    }

    #[inline]
    pub fn report_binding(&mut self, severity: Severity, binding: &Binding, message: impl Into<String>) {
        self.report(severity, Anchor::Binding(binding.id().clone()), message);
    }

    #[inline]
    pub fn report_dependency(&mut self, severity: Severity, request: &DependencyRequest, message: impl Into<String>) {
        self.report(severity, Anchor::Request(request.clone()), message);
    }

    #[inline]
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    #[inline]
    #[must_use]
    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

/// Maps shortened top-level names to their qualified names.
///
/// Names whose short form belongs to several qualified names are ambiguous:
/// they are printed fully qualified and left out of the legend.
#[derive(Debug, Default)]
pub(crate) struct NameLegend {
    names: BTreeMap<String, BTreeSet<String>>,
}

impl NameLegend {
    pub(crate) fn add_request(&mut self, request: &DependencyRequest) {
        request.collect_top_level_names(&mut self.names);
    }

    #[must_use]
    pub(crate) fn ambiguous(&self) -> BTreeSet<String> {
        self.names
            .iter()
            .filter(|(_, qualified)| qualified.len() > 1)
            .map(|(simple, _)| simple.clone())
            .collect()
    }

    /// Legend block, preceded by a blank line
    #[must_use]
    pub(crate) fn render(&self) -> String {
        let mut out = String::from("\n\n======================\nFull classname legend:\n======================");
        for (simple, qualified) in &self.names {
            let mut qualified = qualified.iter();
            if let (Some(qualified), None) = (qualified.next(), qualified.next()) {
                if qualified != simple {
                    let _ = write!(out, "\n{simple}: {qualified}");
                }
            }
        }
        out.push_str("\n========================\nEnd of classname legend:\n========================");
        out
    }
}

/// Appends `X is injected at / site` frames for `edges`, which are given in the order they are printed.
pub(crate) fn write_trace(
    out: &mut String,
    graph: &BindingGraph,
    edges: impl IntoIterator<Item = EdgeIndex>,
    ambiguous: &BTreeSet<String>,
) {
    for edge in edges {
        let edge = graph.edge(edge);
        let Some(request) = edge.request() else {
            continue;
        };
        let verb = if edge.is_entry_point() { "requested" } else { "injected" };
        let _ = write!(
            out,
            "\n    {} is {verb} at\n        {}",
            request.format_requested(ambiguous),
            request.site.display_with(ambiguous)
        );

        let source = graph.node(edge.source).component_path();
        let target = graph.node(edge.target).component_path();
        if edge.is_entry_point() {
            if !source.is_root() {
                let _ = write!(out, " [{source}]");
            }
        } else if source != target {
            out.push_str(&format!(" [{}]", source.display_from(target.len())));
        }
    }
}
