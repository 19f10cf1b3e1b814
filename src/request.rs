use alloc::{
    collections::{BTreeMap, BTreeSet},
    format,
    string::String,
};
use core::fmt::{self, Display, Formatter};

use crate::key::{Key, TypeRef, NO_AMBIGUOUS_NAMES};

/// How a dependency is requested.
///
/// `Instance`, `MembersInjector` and `Produced` need the value immediately,
/// the other kinds hand out an indirection that is resolved later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RequestKind {
    Instance,
    Provider,
    Lazy,
    ProviderOfLazy,
    Producer,
    Produced,
    MembersInjector,
}

impl RequestKind {
    #[inline]
    #[must_use]
    pub const fn is_synchronous(self) -> bool {
        matches!(self, Self::Instance | Self::MembersInjector | Self::Produced)
    }

    #[inline]
    #[must_use]
    pub const fn is_deferred(self) -> bool {
        !self.is_synchronous()
    }

    /// Formats a rendered key the way the request type reads at the site,
    /// e.g. `Provider<Outer.C>` for a provider request of `Outer.C`.
    #[must_use]
    pub fn format_key(self, key: &str) -> String {
        match self {
            Self::Instance | Self::MembersInjector => String::from(key),
            Self::Provider => format!("Provider<{key}>"),
            Self::Lazy => format!("Lazy<{key}>"),
            Self::ProviderOfLazy => format!("Provider<Lazy<{key}>>"),
            Self::Producer => format!("Producer<{key}>"),
            Self::Produced => format!("Produced<{key}>"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SiteElement {
    /// Constructor parameter when `method` is `None`
    Parameter { method: Option<String>, name: String },
    Field { name: String },
    ComponentMethod { name: String },
    /// Element of a multibound collection, pointing at the contributing declaration
    Contribution { element: String },
}

/// Source element of a request, used only for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestSite {
    pub enclosing: TypeRef,
    pub element: SiteElement,
}

impl RequestSite {
    #[inline]
    #[must_use]
    pub fn constructor(enclosing: TypeRef, parameter: impl Into<String>) -> Self {
        Self {
            enclosing,
            element: SiteElement::Parameter {
                method: None,
                name: parameter.into(),
            },
        }
    }

    #[inline]
    #[must_use]
    pub fn method(enclosing: TypeRef, method: impl Into<String>, parameter: impl Into<String>) -> Self {
        Self {
            enclosing,
            element: SiteElement::Parameter {
                method: Some(method.into()),
                name: parameter.into(),
            },
        }
    }

    #[inline]
    #[must_use]
    pub fn field(enclosing: TypeRef, name: impl Into<String>) -> Self {
        Self {
            enclosing,
            element: SiteElement::Field { name: name.into() },
        }
    }

    #[inline]
    #[must_use]
    pub fn component_method(enclosing: TypeRef, name: impl Into<String>) -> Self {
        Self {
            enclosing,
            element: SiteElement::ComponentMethod { name: name.into() },
        }
    }

    #[inline]
    #[must_use]
    pub fn contribution(enclosing: TypeRef, element: impl Into<String>) -> Self {
        Self {
            enclosing,
            element: SiteElement::Contribution { element: element.into() },
        }
    }

    #[inline]
    #[must_use]
    pub(crate) fn display_with<'a>(&'a self, ambiguous: &'a BTreeSet<String>) -> SiteDisplay<'a> {
        SiteDisplay { site: self, ambiguous }
    }
}

pub(crate) struct SiteDisplay<'a> {
    site: &'a RequestSite,
    ambiguous: &'a BTreeSet<String>,
}

impl Display for SiteDisplay<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let enclosing = self.site.enclosing.display_with(self.ambiguous);
        match &self.site.element {
            SiteElement::Parameter { method: None, name } => write!(f, "{enclosing}({name})"),
            SiteElement::Parameter { method: Some(method), name } => write!(f, "{enclosing}.{method}({name})"),
            SiteElement::Field { name } => write!(f, "{enclosing}.{name}"),
            SiteElement::ComponentMethod { name } | SiteElement::Contribution { element: name } => {
                write!(f, "{enclosing}.{name}()")
            }
        }
    }
}

impl Display for RequestSite {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_with(&NO_AMBIGUOUS_NAMES))
    }
}

/// A single dependency of a binding or an entry point
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DependencyRequest {
    pub key: Key,
    pub kind: RequestKind,
    pub site: RequestSite,
}

impl DependencyRequest {
    #[inline]
    #[must_use]
    pub const fn new(key: Key, kind: RequestKind, site: RequestSite) -> Self {
        Self { key, kind, site }
    }

    #[inline]
    #[must_use]
    pub const fn instance(key: Key, site: RequestSite) -> Self {
        Self::new(key, RequestKind::Instance, site)
    }

    #[inline]
    #[must_use]
    pub const fn provider(key: Key, site: RequestSite) -> Self {
        Self::new(key, RequestKind::Provider, site)
    }

    /// `Provider<Outer.C>` style rendering of the requested key
    #[must_use]
    pub(crate) fn format_requested(&self, ambiguous: &BTreeSet<String>) -> String {
        self.kind.format_key(&format!("{}", self.key.display_with(ambiguous)))
    }

    pub(crate) fn collect_top_level_names(&self, names: &mut BTreeMap<String, BTreeSet<String>>) {
        self.key.collect_top_level_names(names);
        self.site.enclosing.collect_top_level_names(names);
    }
}

impl Display for DependencyRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.format_requested(&NO_AMBIGUOUS_NAMES), self.site)
    }
}
