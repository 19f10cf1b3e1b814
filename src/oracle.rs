use crate::{
    key::TypeRef,
    utils::thread_safety::{SendSafety, SyncSafety},
};

/// Answers type compatibility questions for the structural checks.
pub trait TypeOracle: SendSafety + SyncSafety {
    /// `true` if a value of `candidate` can be used where `requested` is expected
    #[must_use]
    fn is_assignable(&self, candidate: &TypeRef, requested: &TypeRef) -> bool;
}

/// Answers whether generated code in a package may name a type.
pub trait AccessibilityOracle: SendSafety + SyncSafety {
    #[must_use]
    fn is_accessible(&self, ty: &TypeRef, package: &str) -> bool;
}

/// Types are assignable only to themselves and to type variables.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExactTypeOracle;

impl TypeOracle for ExactTypeOracle {
    #[inline]
    fn is_assignable(&self, candidate: &TypeRef, requested: &TypeRef) -> bool {
        candidate == requested || matches!(requested, TypeRef::TypeVariable(_))
    }
}

/// Every type is accessible from everywhere.
#[derive(Clone, Copy, Debug, Default)]
pub struct PublicAccessibilityOracle;

impl AccessibilityOracle for PublicAccessibilityOracle {
    #[inline]
    fn is_accessible(&self, _ty: &TypeRef, _package: &str) -> bool {
        true
    }
}

impl<F> TypeOracle for F
where
    F: Fn(&TypeRef, &TypeRef) -> bool + SendSafety + SyncSafety,
{
    #[inline]
    fn is_assignable(&self, candidate: &TypeRef, requested: &TypeRef) -> bool {
        self(candidate, requested)
    }
}

impl<F> AccessibilityOracle for F
where
    F: Fn(&TypeRef, &str) -> bool + SendSafety + SyncSafety,
{
    #[inline]
    fn is_accessible(&self, ty: &TypeRef, package: &str) -> bool {
        self(ty, package)
    }
}
