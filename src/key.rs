use alloc::{
    boxed::Box,
    collections::{BTreeMap, BTreeSet},
    string::{String, ToString as _},
    vec::Vec,
};
use core::fmt::{self, Display, Formatter};

/// Top-level simple names that must be printed fully qualified.
pub(crate) const NO_AMBIGUOUS_NAMES: BTreeSet<String> = BTreeSet::new();

/// Semantic type of a key, as reported by the declaration extractor.
///
/// Declared names are package-relative and dotted for nested types (`Outer.C`),
/// so the short form is the name itself and the qualified form is `package.name`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TypeRef {
    Primitive(String),
    Declared {
        package: String,
        name: String,
        arguments: Vec<TypeRef>,
    },
    Array(Box<TypeRef>),
    TypeVariable(String),
    Wildcard,
    Void,
    Set(Box<TypeRef>),
    Map(Box<TypeRef>, Box<TypeRef>),
}

impl TypeRef {
    #[inline]
    #[must_use]
    pub fn declared(package: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Declared {
            package: package.into(),
            name: name.into(),
            arguments: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn primitive(name: impl Into<String>) -> Self {
        Self::Primitive(name.into())
    }

    #[inline]
    #[must_use]
    pub fn array_of(component: TypeRef) -> Self {
        Self::Array(Box::new(component))
    }

    #[inline]
    #[must_use]
    pub fn set_of(element: TypeRef) -> Self {
        Self::Set(Box::new(element))
    }

    #[inline]
    #[must_use]
    pub fn map_of(key: TypeRef, value: TypeRef) -> Self {
        Self::Map(Box::new(key), Box::new(value))
    }

    /// Adds a type argument. Only meaningful for declared types, other types are returned unchanged.
    #[must_use]
    pub fn with_argument(mut self, argument: TypeRef) -> Self {
        if let Self::Declared { arguments, .. } = &mut self {
            arguments.push(argument);
        }
        self
    }

    #[must_use]
    pub fn package(&self) -> Option<&str> {
        match self {
            Self::Declared { package, .. } => Some(package),
            Self::Array(component) => component.package(),
            _ => None,
        }
    }

    /// `Outer` for `test.Outer.C`
    #[must_use]
    pub fn top_level_name(&self) -> Option<&str> {
        match self {
            Self::Declared { name, .. } => Some(name.split_once('.').map_or(name.as_str(), |(top, _)| top)),
            _ => None,
        }
    }

    #[must_use]
    pub fn qualified_name(&self) -> String {
        let mut out = String::new();
        let _ = self.write_with(&mut out, &AllQualified);
        out
    }

    #[inline]
    #[must_use]
    pub fn short_name(&self) -> String {
        self.to_string()
    }

    #[inline]
    #[must_use]
    pub fn is_multibinding_collection(&self) -> bool {
        matches!(self, Self::Set(_) | Self::Map(..))
    }

    /// Element type of a set, value type of a map.
    #[must_use]
    pub fn collection_element(&self) -> Option<&TypeRef> {
        match self {
            Self::Set(element) => Some(element),
            Self::Map(_, value) => Some(value),
            _ => None,
        }
    }

    /// Whether the type may be requested or bound.
    /// Primitives, arrays, declared types, collections and type variables are allowed,
    /// while wildcards, `void` and arrays of wildcards are not.
    #[must_use]
    pub fn is_valid_binding_type(&self) -> bool {
        match self {
            Self::Primitive(_) | Self::Declared { .. } | Self::TypeVariable(_) | Self::Set(_) | Self::Map(..) => true,
            Self::Array(component) => !matches!(**component, Self::Wildcard | Self::Void),
            Self::Wildcard | Self::Void => false,
        }
    }

    #[must_use]
    pub fn has_wildcard_arguments(&self) -> bool {
        match self {
            Self::Declared { arguments, .. } => arguments
                .iter()
                .any(|argument| matches!(argument, Self::Wildcard) || argument.has_wildcard_arguments()),
            Self::Array(component) => component.has_wildcard_arguments(),
            Self::Set(element) => matches!(**element, Self::Wildcard) || element.has_wildcard_arguments(),
            Self::Map(key, value) => {
                matches!(**key, Self::Wildcard)
                    || matches!(**value, Self::Wildcard)
                    || key.has_wildcard_arguments()
                    || value.has_wildcard_arguments()
            }
            _ => false,
        }
    }

    /// Collects `simple top-level name -> qualified top-level names` for the name legend.
    pub(crate) fn collect_top_level_names(&self, names: &mut BTreeMap<String, BTreeSet<String>>) {
        match self {
            Self::Declared {
                package, name, arguments, ..
            } => {
                let top = name.split_once('.').map_or(name.as_str(), |(top, _)| top);
                let qualified = if package.is_empty() {
                    top.to_string()
                } else {
                    alloc::format!("{package}.{top}")
                };
                names.entry(top.to_string()).or_default().insert(qualified);
                for argument in arguments {
                    argument.collect_top_level_names(names);
                }
            }
            Self::Array(component) | Self::Set(component) => component.collect_top_level_names(names),
            Self::Map(key, value) => {
                key.collect_top_level_names(names);
                value.collect_top_level_names(names);
            }
            Self::Primitive(_) | Self::TypeVariable(_) | Self::Wildcard | Self::Void => {}
        }
    }

    /// Renders the type with short names, except for the top-level names in `ambiguous`.
    #[inline]
    #[must_use]
    pub(crate) fn display_with<'a>(&'a self, ambiguous: &'a BTreeSet<String>) -> TypeDisplay<'a> {
        TypeDisplay { ty: self, ambiguous }
    }

    fn write_with(&self, f: &mut impl fmt::Write, qualify: &impl Qualify) -> fmt::Result {
        match self {
            Self::Primitive(name) | Self::TypeVariable(name) => f.write_str(name),
            Self::Declared {
                package, name, arguments, ..
            } => {
                let top = name.split_once('.').map_or(name.as_str(), |(top, _)| top);
                if !package.is_empty() && qualify.qualify(top) {
                    write!(f, "{package}.")?;
                }
                f.write_str(name)?;
                if !arguments.is_empty() {
                    f.write_str("<")?;
                    for (index, argument) in arguments.iter().enumerate() {
                        if index > 0 {
                            f.write_str(", ")?;
                        }
                        argument.write_with(f, qualify)?;
                    }
                    f.write_str(">")?;
                }
                Ok(())
            }
            Self::Array(component) => {
                component.write_with(f, qualify)?;
                f.write_str("[]")
            }
            Self::Wildcard => f.write_str("?"),
            Self::Void => f.write_str("void"),
            Self::Set(element) => {
                f.write_str("Set<")?;
                element.write_with(f, qualify)?;
                f.write_str(">")
            }
            Self::Map(key, value) => {
                f.write_str("Map<")?;
                key.write_with(f, qualify)?;
                f.write_str(", ")?;
                value.write_with(f, qualify)?;
                f.write_str(">")
            }
        }
    }
}

trait Qualify {
    fn qualify(&self, top_level_name: &str) -> bool;
}

struct AllQualified;

impl Qualify for AllQualified {
    fn qualify(&self, _top_level_name: &str) -> bool {
        true
    }
}

impl Qualify for BTreeSet<String> {
    fn qualify(&self, top_level_name: &str) -> bool {
        self.contains(top_level_name)
    }
}

pub(crate) struct TypeDisplay<'a> {
    ty: &'a TypeRef,
    ambiguous: &'a BTreeSet<String>,
}

impl Display for TypeDisplay<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.ty.write_with(f, self.ambiguous)
    }
}

impl Display for TypeRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.write_with(f, &NO_AMBIGUOUS_NAMES)
    }
}

/// A qualifier annotation, e.g. `@Named("foo")`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Qualifier {
    pub annotation: TypeRef,
    pub value: Option<String>,
}

impl Qualifier {
    #[inline]
    #[must_use]
    pub fn new(annotation: TypeRef) -> Self {
        Self { annotation, value: None }
    }

    #[inline]
    #[must_use]
    pub fn with_value(annotation: TypeRef, value: impl Into<String>) -> Self {
        Self {
            annotation,
            value: Some(value.into()),
        }
    }
}

impl Display for Qualifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.annotation)?;
        if let Some(value) = &self.value {
            write!(f, "(\"{value}\")")?;
        }
        Ok(())
    }
}

/// Marks a key as one contribution to a multibound collection.
/// Identified by the declaring module and element, so two contributions never share a key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContributionId {
    pub module: TypeRef,
    pub element: String,
}

/// Identity of a dependency.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key {
    pub ty: TypeRef,
    pub qualifier: Option<Qualifier>,
    pub contribution: Option<ContributionId>,
}

impl Key {
    #[inline]
    #[must_use]
    pub fn of(ty: TypeRef) -> Self {
        Self {
            ty,
            qualifier: None,
            contribution: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn qualified(ty: TypeRef, qualifier: Qualifier) -> Self {
        Self {
            ty,
            qualifier: Some(qualifier),
            contribution: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_contribution(mut self, contribution: ContributionId) -> Self {
        self.contribution = Some(contribution);
        self
    }

    /// The collection key a contribution key contributes to
    #[inline]
    #[must_use]
    pub fn without_contribution(&self) -> Self {
        Self {
            ty: self.ty.clone(),
            qualifier: self.qualifier.clone(),
            contribution: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_multibinding_collection(&self) -> bool {
        self.contribution.is_none() && self.ty.is_multibinding_collection()
    }

    #[inline]
    #[must_use]
    pub(crate) fn display_with<'a>(&'a self, ambiguous: &'a BTreeSet<String>) -> KeyDisplay<'a> {
        KeyDisplay { key: self, ambiguous }
    }

    pub(crate) fn collect_top_level_names(&self, names: &mut BTreeMap<String, BTreeSet<String>>) {
        self.ty.collect_top_level_names(names);
        if let Some(qualifier) = &self.qualifier {
            qualifier.annotation.collect_top_level_names(names);
        }
    }
}

pub(crate) struct KeyDisplay<'a> {
    key: &'a Key,
    ambiguous: &'a BTreeSet<String>,
}

impl Display for KeyDisplay<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Some(qualifier) = &self.key.qualifier {
            write!(f, "@{}", qualifier.annotation.display_with(self.ambiguous))?;
            if let Some(value) = &qualifier.value {
                write!(f, "(\"{value}\")")?;
            }
            f.write_str(" ")?;
        }
        write!(f, "{}", self.key.ty.display_with(self.ambiguous))
    }
}

impl Display for Key {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_with(&NO_AMBIGUOUS_NAMES))
    }
}
