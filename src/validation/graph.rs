use alloc::{
    collections::BTreeSet,
    format,
    string::{String, ToString},
    vec::Vec,
};
use tracing::{debug, error, info_span};

use super::declarations::{members_injection_problem, request_problem};
use crate::{
    binding::BindingType,
    component::ComponentTree,
    cycle::{find_cycles, RenderMode},
    declaration::BindingKind,
    diagnostic::{write_trace, Anchor, NameLegend},
    errors::ValidationErrorKind,
    graph::{BindingGraph, MissingBinding, Node, NodeIndex},
    request::RequestKind,
    scope::is_stronger_scope,
    store::DeclarationStore,
};

/// Checks a built graph: cycles, missing bindings, resolution errors, delegation scopes,
/// production bindings and injectable types reached by the graph.
#[must_use]
pub fn validate_graph(graph: &BindingGraph, tree: &ComponentTree, store: &DeclarationStore, mode: RenderMode) -> Vec<ValidationErrorKind> {
    let span = info_span!("validate_graph", component = %tree.descriptor(graph.root()).ty, mode = ?mode);
    let _guard = span.enter();

    let root = tree.path(graph.root());
    let mut errors: Vec<ValidationErrorKind> = find_cycles(graph)
        .into_iter()
        .map(|cycle| ValidationErrorKind::Cycle {
            report: cycle.render(graph, mode),
            component: root.clone(),
        })
        .collect();

    // One error per missing key, traced along the shortest path reaching it
    let mut shortest: Vec<(NodeIndex, &MissingBinding)> = Vec::new();
    for (node, missing) in graph.missing_bindings() {
        match shortest.iter_mut().find(|(_, reported)| reported.key == missing.key) {
            Some(reported) if graph.discovery_depth(node) < graph.discovery_depth(reported.0) => *reported = (node, missing),
            Some(_) => debug!(key = %missing.key, component = %missing.component, "Missing binding already reported"),
            None => shortest.push((node, missing)),
        }
    }

    for (node, missing) in shortest {
        let path = graph.first_path(node);
        let mut legend = NameLegend::default();
        for edge in &path {
            if let Some(request) = graph.edge(*edge).request() {
                legend.add_request(request);
            }
        }
        let mut trace = String::new();
        write_trace(&mut trace, graph, path.into_iter().rev(), &legend.ambiguous());
        errors.push(ValidationErrorKind::MissingBinding {
            key: missing.key.clone(),
            trace,
            component: missing.component.clone(),
        });
    }

    errors.extend(graph.resolution_errors().iter().cloned().map(ValidationErrorKind::Resolve));

    for (node, binding) in graph.bindings() {
        let anchor = || Anchor::Binding(binding.id().clone());

        if let (BindingKind::Delegate { .. }, Some(scope)) = (binding.kind(), binding.scope()) {
            let source = graph.dependencies_of(node).find_map(|(_, target)| target.as_binding());
            if let Some(source_scope) = source.and_then(|source| source.scope()) {
                if is_stronger_scope(Some(scope), Some(source_scope)) {
                    let site = binding.site().map(|site| site.to_string()).unwrap_or_default();
                    errors.push(ValidationErrorKind::ScopeMismatch {
                        message: format!(
                            "{} is scoped with {scope} at {site}, which is stronger than the scope {source_scope} of the bound {}",
                            binding.key(),
                            source.map(|source| source.key().to_string()).unwrap_or_default()
                        ),
                        anchor: anchor(),
                    });
                }
            }
        }

        if binding.binding_type() == BindingType::Production && !tree.descriptor(binding.owner().leaf()).kind.is_production() {
            errors.push(ValidationErrorKind::Structural {
                message: format!(
                    "{} is a production binding, but {} is not a production component",
                    binding.key(),
                    binding.owner()
                ),
                anchor: anchor(),
            });
        }

        if matches!(binding.kind(), BindingKind::Injection | BindingKind::MembersInjection) {
            if let Some(injectable) = store.injectable(&binding.key().ty) {
                if injectable.scopes.len() > 1 {
                    let scopes: Vec<String> = injectable.scopes.iter().map(|scope| scope.to_string()).collect();
                    errors.push(ValidationErrorKind::Structural {
                        message: format!("{} cannot use more than one @Scope: {}", injectable.ty, scopes.join(", ")),
                        anchor: anchor(),
                    });
                }
                if injectable.qualifiers.len() > 1 {
                    errors.push(ValidationErrorKind::Structural {
                        message: format!("{} may not use more than one @Qualifier", injectable.ty),
                        anchor: anchor(),
                    });
                }
            }
        }
    }

    // Requests of declarations are checked with the declarations, the others here
    let mut reported = BTreeSet::new();
    for edge in graph.edges() {
        let Some(request) = edge.request() else {
            continue;
        };
        let problem = match graph.node(edge.source) {
            Node::Component(_) if request.kind == RequestKind::MembersInjector => members_injection_problem(&request.key),
            Node::Binding(binding) if binding.declaration().is_none() => request_problem(request),
            _ => None,
        };
        if let Some(message) = problem {
            if reported.insert(message.clone()) {
                errors.push(ValidationErrorKind::Structural {
                    message,
                    anchor: Anchor::Request(request.clone()),
                });
            }
        }
    }

    for err in &errors {
        error!("{}", err);
    }
    debug!(errors = errors.len(), "Graph validated");
    errors
}
