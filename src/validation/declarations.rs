use alloc::{
    collections::BTreeSet,
    format,
    string::{String, ToString},
    vec::Vec,
};
use tracing::{debug, error, info_span};

use super::component::validate_components;
use crate::{
    component::{ComponentIndex, ComponentPath, ComponentTree},
    contribution::ContributionType,
    declaration::{AssistedParameter, BindingDeclaration, BindingKind, DeclarationSite, InjectableType},
    diagnostic::Anchor,
    errors::{DeclarationSites, ValidationErrorKind},
    key::{Key, TypeRef},
    oracle::TypeOracle,
    request::{DependencyRequest, RequestKind},
    store::{DeclarationStore, InstalledModules},
};

/// Checks the declarations and components of the tree rooted at `root`.
///
/// Every check runs, errors are collected rather than returned on the first one.
#[must_use]
pub fn validate_declarations(
    store: &DeclarationStore,
    tree: &ComponentTree,
    modules: &InstalledModules,
    type_oracle: &dyn TypeOracle,
    root: ComponentIndex,
) -> Vec<ValidationErrorKind> {
    let span = info_span!("validate_declarations", component = %tree.descriptor(root).ty);
    let _guard = span.enter();

    let mut errors = Vec::new();
    let mut checked = BTreeSet::new();
    for component in tree.preorder(root) {
        let path = tree.path(component);
        for module in modules.of(component) {
            if !checked.insert(module.clone()) {
                continue;
            }
            if !store.contains_module(module) {
                errors.push(structural(&path, format!("{module} is not a module")));
                continue;
            }
            for declaration in store.module_declarations(module) {
                check_declaration(declaration, type_oracle, &path, &mut errors);
            }
        }
        check_duplicates(store, tree, modules, &path, &mut errors);
    }
    let root_path = tree.path(root);
    for injectable in store.injectables() {
        check_assisted_parameters(injectable, &root_path, &mut errors);
    }
    errors.extend(validate_components(tree, modules, root));

    for err in &errors {
        error!("{}", err);
    }
    debug!(errors = errors.len(), "Declarations validated");
    errors
}

pub(super) fn structural(path: &ComponentPath, message: String) -> ValidationErrorKind {
    ValidationErrorKind::Structural {
        message,
        anchor: Anchor::Component(path.clone()),
    }
}

/// Types that may be requested and bound: no wildcards, no `void`
pub(super) fn is_valid_key_type(ty: &TypeRef) -> bool {
    ty.is_valid_binding_type() && !ty.has_wildcard_arguments()
}

/// Members can be injected into declared, unqualified types only
pub(super) fn members_injection_problem(key: &Key) -> Option<String> {
    if matches!(key.ty, TypeRef::Array(_)) || key.qualifier.is_some() || key.ty.has_wildcard_arguments() {
        return Some(format!("Cannot inject members into {key}"));
    }
    None
}

fn check_declaration(
    declaration: &BindingDeclaration,
    type_oracle: &dyn TypeOracle,
    path: &ComponentPath,
    errors: &mut Vec<ValidationErrorKind>,
) {
    let site = &declaration.site;
    let mut report = |message: String| errors.push(structural(path, message));

    if matches!(
        declaration.kind,
        BindingKind::Injection | BindingKind::ComponentSelf | BindingKind::BoundInstance | BindingKind::Multibound(_)
    ) {
        report(format!("{site}: {} bindings cannot be declared by a module", declaration.kind.name()));
    }

    if declaration.scopes.len() > 1 {
        let scopes: Vec<String> = declaration.scopes.iter().map(ToString::to_string).collect();
        report(format!("{site} cannot use more than one @Scope: {}", scopes.join(", ")));
    }
    if !declaration.scopes.is_empty() && !declaration.kind.allows_scoping() {
        report(format!("{site}: {} bindings cannot be scoped", declaration.kind.name()));
    }
    if declaration.qualifiers.len() > 1 {
        report(format!("{site} may not use more than one @Qualifier"));
    }

    if !is_valid_key_type(&declaration.key.ty) {
        report(format!("{site}: {} is not a valid binding type", declaration.key.ty));
    }
    for request in &declaration.dependencies {
        if let Some(message) = request_problem(request) {
            report(message);
        }
    }

    match &declaration.kind {
        BindingKind::Multibinds if !declaration.key.ty.is_multibinding_collection() => {
            report(format!("{site}: @Multibinds declarations must return a Set or a Map"));
        }
        BindingKind::Delegate { .. } => {
            if let [source] = declaration.dependencies.as_slice() {
                let bound = bound_type(declaration);
                if !type_oracle.is_assignable(&source.key.ty, bound) {
                    report(format!("{site}: the parameter type {} must be assignable to {bound}", source.key.ty));
                }
            } else {
                report(format!("{site}: delegations must have exactly one parameter"));
            }
        }
        _ => {}
    }

    if declaration.contribution_type.is_multibinding()
        && !matches!(
            declaration.kind,
            BindingKind::Provision | BindingKind::Production | BindingKind::Delegate { .. }
        )
    {
        report(format!(
            "{site}: multibinding contributions may only be provision, production or delegate declarations"
        ));
    }
    if declaration.contribution_type == ContributionType::SetValues && !matches!(declaration.key.ty, TypeRef::Set(_)) {
        report(format!("{site}: set values contributions must return a Set"));
    }

    match (declaration.contribution_type, &declaration.map_key) {
        (ContributionType::Map, None) => report(format!("{site}: map contributions must have a map key")),
        (ContributionType::Unique | ContributionType::Set | ContributionType::SetValues, Some(_)) => {
            report(format!("{site}: map keys are only allowed on map contributions"));
        }
        _ => {}
    }
}

fn check_assisted_parameters(injectable: &InjectableType, path: &ComponentPath, errors: &mut Vec<ValidationErrorKind>) {
    let mut seen: Vec<&AssistedParameter> = Vec::new();
    for parameter in &injectable.assisted_parameters {
        let site = &parameter.site;
        if !injectable.assisted_inject {
            errors.push(structural(
                path,
                format!("{site}: @Assisted parameters can only be used within an @AssistedInject constructor"),
            ));
        }
        if !parameter.qualifiers.is_empty() {
            errors.push(structural(path, format!("{site}: qualifiers cannot be used with @Assisted parameters")));
        }
        if seen
            .iter()
            .any(|other| other.ty == parameter.ty && other.identifier == parameter.identifier)
        {
            errors.push(structural(
                path,
                format!(
                    "{}: @AssistedInject constructor has duplicate @Assisted type: {parameter}. \
                     Set an identifier on the parameter to tell them apart",
                    injectable.ty
                ),
            ));
        } else {
            seen.push(parameter);
        }
    }
}

/// Problem with the type of a request, if any
pub(super) fn request_problem(request: &DependencyRequest) -> Option<String> {
    if !is_valid_key_type(&request.key.ty) {
        return Some(format!("{}: {} is not a valid request type", request.site, request.key.ty));
    }
    if request.kind == RequestKind::MembersInjector {
        return members_injection_problem(&request.key);
    }
    None
}

/// Type an instance of the delegation source is bound as
fn bound_type(declaration: &BindingDeclaration) -> &TypeRef {
    match declaration.contribution_type {
        ContributionType::Set | ContributionType::Map => {
            declaration.key.ty.collection_element().unwrap_or(&declaration.key.ty)
        }
        ContributionType::Unique | ContributionType::SetValues => &declaration.key.ty,
    }
}

/// Reports keys declared by the leaf of `path` that have more than one unique rule visible from it
fn check_duplicates(
    store: &DeclarationStore,
    tree: &ComponentTree,
    modules: &InstalledModules,
    path: &ComponentPath,
    errors: &mut Vec<ValidationErrorKind>,
) {
    let leaf = path.leaf();
    let mut local: BTreeSet<Key> = store
        .declarations(modules.of(leaf))
        .iter()
        .filter(|declaration| declaration.is_unique())
        .map(|declaration| declaration.key.clone())
        .collect();
    local.extend(tree.descriptor(leaf).bound_instances().map(|instance| instance.key.clone()));

    for key in local {
        let mut seen = BTreeSet::new();
        let mut sites: Vec<DeclarationSite> = Vec::new();
        for component in path.components() {
            for declaration in store.unique_declarations(modules.of(component), &key) {
                if seen.insert(declaration.order()) {
                    sites.push(declaration.site.clone());
                }
            }
            for creator in &tree.descriptor(component).creators {
                sites.extend(
                    creator
                        .bound_instances
                        .iter()
                        .filter(|instance| instance.key == key)
                        .map(|instance| DeclarationSite::new(creator.ty.clone(), instance.element.clone())),
                );
            }
        }
        if sites.len() > 1 {
            errors.push(ValidationErrorKind::DuplicateBinding {
                key,
                sites: DeclarationSites(sites),
                component: path.clone(),
            });
        }
    }
}
