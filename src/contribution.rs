use core::fmt::{self, Display, Formatter};

/// How a declaration contributes to its key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ContributionType {
    /// The declaration is the only binding for its key
    #[default]
    Unique,
    /// One element of a set
    Set,
    /// A whole collection of elements of a set
    SetValues,
    /// One entry of a map
    Map,
}

impl ContributionType {
    #[inline]
    #[must_use]
    pub const fn is_multibinding(self) -> bool {
        !matches!(self, Self::Unique)
    }
}

impl Display for ContributionType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unique => "unique",
            Self::Set => "set element",
            Self::SetValues => "set elements",
            Self::Map => "map entry",
        })
    }
}
