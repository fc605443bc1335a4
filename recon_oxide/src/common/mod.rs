//! Common utilities, traits, and errors

mod error;
pub mod hash;
mod traits;
mod types;
pub mod validation;

pub use error::{ReconError, Result};
pub use traits::Reconcilable;
pub use types::{DecodeOutcome, DifferenceSets};
