use alloc::string::String;

use crate::{
    component::ComponentPath,
    declaration::{DeclarationSite, MapKey},
    key::Key,
    scope::Scope,
};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveErrorKind {
    #[error("{key} cannot be provided without an injectable constructor or a provision declaration ({component})")]
    Missing { key: Key, component: ComponentPath },
    #[error("{key} is already being resolved for {component}")]
    Reentrant { key: Key, component: ComponentPath },
    #[error("{key} is scoped with {scope}, but no component of {component} declares that scope")]
    ScopeMismatch { key: Key, scope: Scope, component: ComponentPath },
    #[error(
        "\
        {key} is scoped with {scope} and cached by {holder}, \
        but depends on bindings declared in {component}\
        "
    )]
    IncompatibleScope {
        key: Key,
        scope: Scope,
        holder: ComponentPath,
        component: ComponentPath,
    },
    #[error("{key} has more than one contribution for the map key {map_key}:\n    {first}\n    {second}")]
    MultibindingKeyCollision {
        key: Key,
        map_key: MapKey,
        first: DeclarationSite,
        second: DeclarationSite,
        component: ComponentPath,
    },
    #[error("{key} contribution {site} is accessible neither from {component} nor from package {package}")]
    Accessibility {
        key: Key,
        site: DeclarationSite,
        package: String,
        component: ComponentPath,
    },
}

impl ResolveErrorKind {
    #[must_use]
    pub fn key(&self) -> &Key {
        match self {
            Self::Missing { key, .. }
            | Self::Reentrant { key, .. }
            | Self::ScopeMismatch { key, .. }
            | Self::IncompatibleScope { key, .. }
            | Self::MultibindingKeyCollision { key, .. }
            | Self::Accessibility { key, .. } => key,
        }
    }

    /// `true` if both errors have one root cause.
    /// A map key collision is reported once, whichever component re-aggregated the map.
    #[must_use]
    pub fn is_same_cause(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Self::MultibindingKeyCollision {
                    key,
                    map_key,
                    first,
                    second,
                    ..
                },
                Self::MultibindingKeyCollision {
                    key: other_key,
                    map_key: other_map_key,
                    first: other_first,
                    second: other_second,
                    ..
                },
            ) => key == other_key && map_key == other_map_key && first == other_first && second == other_second,
            _ => self == other,
        }
    }

    /// Component the failed resolution was made for
    #[must_use]
    pub fn component(&self) -> &ComponentPath {
        match self {
            Self::Missing { component, .. }
            | Self::Reentrant { component, .. }
            | Self::ScopeMismatch { component, .. }
            | Self::IncompatibleScope { component, .. }
            | Self::MultibindingKeyCollision { component, .. }
            | Self::Accessibility { component, .. } => component,
        }
    }
}
