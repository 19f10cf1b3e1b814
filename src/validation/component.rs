use alloc::{
    collections::{BTreeMap, BTreeSet},
    format,
    string::{String, ToString},
    vec::Vec,
};

use super::declarations::{is_valid_key_type, structural};
use crate::{
    component::{ComponentIndex, ComponentMethod, ComponentMethodKind, ComponentPath, ComponentTree},
    errors::ValidationErrorKind,
    key::TypeRef,
    store::InstalledModules,
};

/// Shape checks of every component of the tree rooted at `root`
pub(super) fn validate_components(tree: &ComponentTree, modules: &InstalledModules, root: ComponentIndex) -> Vec<ValidationErrorKind> {
    let mut errors = Vec::new();
    let mut parents: BTreeMap<&TypeRef, BTreeSet<&TypeRef>> = BTreeMap::new();

    for component in tree.preorder(root) {
        let path = tree.path(component);
        let node = tree.node(component);
        let descriptor = &node.descriptor;
        let mut report = |message: String| errors.push(structural(&path, message));

        if !descriptor.is_abstract {
            report(format!(
                "{} may only be applied to an interface or abstract class: {}",
                descriptor.kind.annotation(),
                descriptor.ty
            ));
        }
        match node.parent {
            None if !descriptor.kind.is_root() => report(format!("{} {} cannot be a root component", descriptor.kind.annotation(), descriptor.ty)),
            Some(parent) => {
                if descriptor.kind.is_root() {
                    report(format!("{} {} cannot be installed as a subcomponent", descriptor.kind.annotation(), descriptor.ty));
                }
                parents.entry(&descriptor.ty).or_default().insert(&tree.descriptor(parent).ty);
            }
            None => {}
        }
        if descriptor.creators.len() > 1 {
            let creators: Vec<String> = descriptor.creators.iter().map(|creator| creator.ty.to_string()).collect();
            report(format!("{} has more than one creator: {}", descriptor.ty, creators.join(", ")));
        }
        if descriptor.scopes.iter().any(|scope| scope.is_reusable()) {
            report("@Reusable cannot be applied to components or subcomponents".to_string());
        }

        let mut referenced: BTreeMap<&TypeRef, Vec<&ComponentMethod>> = BTreeMap::new();
        for method in &descriptor.methods {
            if method.has_type_variables {
                report(format!("{method}: component methods cannot have type variables"));
            }
            match &method.kind {
                ComponentMethodKind::Provision(request) => {
                    if !method.parameters.is_empty() {
                        report(format!("{method}: provision methods cannot have parameters"));
                    }
                    if !is_valid_key_type(&request.key.ty) {
                        report(format!("{method}: {} is not a valid request type", request.key.ty));
                    }
                }
                ComponentMethodKind::MembersInjection(_) => {
                    if method.parameters.len() != 1 {
                        report(format!("{method}: members-injection methods must have exactly one parameter"));
                    }
                }
                ComponentMethodKind::SubcomponentFactory { subcomponent } => {
                    referenced.entry(subcomponent).or_default().push(method);
                    match tree.child_of_type(component, subcomponent) {
                        Some(child) => {
                            let installed = modules.of(child);
                            let mut passed = BTreeSet::new();
                            for parameter in &method.parameters {
                                if !installed.contains(parameter) {
                                    report(format!("{method}: {parameter} is not a module installed in {subcomponent}"));
                                }
                                if !passed.insert(parameter) {
                                    report(format!("{method}: {parameter} is passed more than once"));
                                }
                            }
                        }
                        None => report(format!("{method}: {subcomponent} is not a subcomponent of {}", descriptor.ty)),
                    }
                }
                ComponentMethodKind::SubcomponentCreator { subcomponent } => {
                    referenced.entry(subcomponent).or_default().push(method);
                    if !method.parameters.is_empty() {
                        report(format!("{method}: subcomponent creator methods cannot have parameters"));
                    }
                    if tree.child_of_type(component, subcomponent).is_none() {
                        report(format!("{method}: {subcomponent} is not a subcomponent of {}", descriptor.ty));
                    }
                }
            }
        }
        for (subcomponent, methods) in referenced {
            if methods.len() > 1 {
                let methods: Vec<String> = methods.iter().map(ToString::to_string).collect();
                report(format!("{subcomponent} is returned by more than one method: {}", methods.join(", ")));
            }
        }

        errors.extend(conflicting_entry_points(&descriptor.methods, &path));
    }

    let root_path = tree.path(root);
    for (ty, parents) in parents {
        if parents.len() > 1 {
            let parents: Vec<String> = parents.iter().map(ToString::to_string).collect();
            errors.push(structural(&root_path, format!("{ty} is installed under more than one parent: {}", parents.join(", "))));
        }
    }
    errors
}

/// Entry points with the same name and parameters conflict when they request different things,
/// unless one of them overrides all the others
fn conflicting_entry_points(methods: &[ComponentMethod], path: &ComponentPath) -> Vec<ValidationErrorKind> {
    let mut by_signature: BTreeMap<(&str, &[TypeRef]), Vec<&ComponentMethod>> = BTreeMap::new();
    for method in methods.iter().filter(|method| method.entry_point().is_some()) {
        by_signature
            .entry((method.name.as_str(), method.parameters.as_slice()))
            .or_default()
            .push(method);
    }

    let mut errors = Vec::new();
    for group in by_signature.into_values() {
        let requests: BTreeSet<_> = group
            .iter()
            .filter_map(|method| method.entry_point())
            .map(|request| (&request.key, request.kind))
            .collect();
        if requests.len() < 2 {
            continue;
        }
        let shadowed = group.iter().any(|method| {
            group
                .iter()
                .filter(|other| other.declaring_type != method.declaring_type)
                .all(|other| method.overrides.contains(&other.declaring_type))
        });
        if shadowed {
            continue;
        }

        let mut message = String::from("conflicting entry point declarations:");
        for method in group {
            if let Some(request) = method.entry_point() {
                message.push_str(&format!("\n    {} {method}", request.kind.format_key(&request.key.to_string())));
            }
        }
        errors.push(structural(path, message));
    }
    errors
}
