use alloc::{string::String, vec::Vec};
use core::fmt::{self, Display, Formatter};

use super::resolve::ResolveErrorKind;
use crate::{
    component::ComponentPath,
    declaration::DeclarationSite,
    diagnostic::{Anchor, Severity},
    key::Key,
};

/// Sites of a duplicated binding, one per line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclarationSites(pub Vec<DeclarationSite>);

impl Display for DeclarationSites {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for site in &self.0 {
            write!(f, "\n    {site}")?;
        }
        Ok(())
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    #[error("{key} is bound multiple times:{sites}")]
    DuplicateBinding {
        key: Key,
        sites: DeclarationSites,
        component: ComponentPath,
    },
    #[error("{report}")]
    Cycle { report: String, component: ComponentPath },
    #[error("{message}")]
    ScopeMismatch { message: String, anchor: Anchor },
    #[error("{message}")]
    Structural { message: String, anchor: Anchor },
    #[error("{key} cannot be provided without an injectable constructor or a provision declaration.{trace}")]
    MissingBinding {
        key: Key,
        trace: String,
        component: ComponentPath,
    },
    /// Multibinding collisions, inaccessible contributions, scope errors and reentrancy met while resolving
    #[error(transparent)]
    Resolve(#[from] ResolveErrorKind),
}

impl ValidationErrorKind {
    /// Every validation error fails the build
    #[inline]
    #[must_use]
    pub const fn severity(&self) -> Severity {
        Severity::Error
    }

    /// `true` if both errors have one root cause: a missing key is one cause
    /// whichever entry point or component reaches it
    #[must_use]
    pub fn is_same_cause(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::MissingBinding { key, .. }, Self::MissingBinding { key: other_key, .. }) => key == other_key,
            (Self::Resolve(err), Self::Resolve(other)) => err.is_same_cause(other),
            _ => self == other,
        }
    }

    #[must_use]
    pub fn anchor(&self) -> Anchor {
        match self {
            Self::DuplicateBinding { component, .. } | Self::Cycle { component, .. } | Self::MissingBinding { component, .. } => {
                Anchor::Component(component.clone())
            }
            Self::ScopeMismatch { anchor, .. } | Self::Structural { anchor, .. } => anchor.clone(),
            Self::Resolve(err) => Anchor::Component(err.component().clone()),
        }
    }
}
