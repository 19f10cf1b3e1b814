mod resolve;
mod validation;

pub use resolve::ResolveErrorKind;
pub use validation::{DeclarationSites, ValidationErrorKind};
