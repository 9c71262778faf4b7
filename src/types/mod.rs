//! Shared domain types: the prediction request and the stage documents.

mod documents;
mod well;

pub use documents::*;
pub use well::WellInput;
