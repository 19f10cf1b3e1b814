use alloc::string::String;
use core::fmt::{self, Display, Formatter};

use crate::utils::thread_safety::{SendSafety, SyncSafety};

pub const REUSABLE_SCOPE_NAME: &str = "Reusable";

/// Named scope annotation, e.g. `@Singleton`.
///
/// Reusable scopes allow an instance to be created more than once under contention,
/// so they are cached without locking.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Scope {
    name: String,
    reusable: bool,
}

impl Scope {
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reusable: false,
        }
    }

    #[inline]
    #[must_use]
    pub fn reusable() -> Self {
        Self {
            name: String::from(REUSABLE_SCOPE_NAME),
            reusable: true,
        }
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub const fn is_reusable(&self) -> bool {
        self.reusable
    }
}

impl Display for Scope {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.name)
    }
}

/// Whether a delegation scoped with `binding` caches more strongly than its `source`.
/// Unscoped is weaker than reusable, reusable is weaker than any named scope.
#[must_use]
pub fn is_stronger_scope(binding: Option<&Scope>, source: Option<&Scope>) -> bool {
    match (binding, source) {
        (None, _) => false,
        (Some(_), None) => true,
        (Some(binding), Some(source)) => !binding.is_reusable() && source.is_reusable(),
    }
}

/// Decides the caching discipline of scoped bindings.
pub trait CachingPolicy: SendSafety + SyncSafety {
    /// `true` if instances of this scope must never be created twice,
    /// which requires double-checked locking.
    #[must_use]
    fn is_concurrency_sensitive(&self, scope: &Scope) -> bool;
}

/// Reusable scopes are single-checked, every other scope is double-checked.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultCachingPolicy;

impl CachingPolicy for DefaultCachingPolicy {
    #[inline]
    fn is_concurrency_sensitive(&self, scope: &Scope) -> bool {
        !scope.is_reusable()
    }
}

impl<F> CachingPolicy for F
where
    F: Fn(&Scope) -> bool + SendSafety + SyncSafety,
{
    #[inline]
    fn is_concurrency_sensitive(&self, scope: &Scope) -> bool {
        self(scope)
    }
}
