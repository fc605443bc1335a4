//! Error types for reconciliation sketch operations

use std::fmt;

/// Errors that can occur during sketch construction and combination
///
/// Probabilistic outcomes (a peel that stalls) are *not* errors; they are
/// reported through [`DecodeOutcome`](crate::common::DecodeOutcome) so that
/// partial results stay available to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconError {
    /// Invalid parameter provided to a sketch constructor or operation
    InvalidParameter {
        /// Parameter name
        param: String,
        /// Invalid value provided
        value: String,
        /// Constraint that was violated
        constraint: String,
    },

    /// Attempted to combine sketches that cannot be aligned
    ///
    /// Raised by subtraction and sketch addition when the hash-function
    /// counts differ, the filter axes differ, or the block sizes share no
    /// usable common fold.
    IncompatibleSketches {
        /// Reason for incompatibility
        reason: String,
    },

    /// Fold factor does not evenly divide the block size, or is zero
    InvalidFoldFactor {
        /// The rejected factor
        factor: u64,
        /// Block size of the sketch being folded
        block_size: u64,
    },

    /// Error during serialization
    SerializationError(String),

    /// Error during deserialization
    DeserializationError(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconError::InvalidParameter {
                param,
                value,
                constraint,
            } => {
                write!(
                    f,
                    "Invalid parameter '{}': value '{}' {}",
                    param, value, constraint
                )
            }
            ReconError::IncompatibleSketches { reason } => {
                write!(f, "Incompatible sketches: {}", reason)
            }
            ReconError::InvalidFoldFactor { factor, block_size } => {
                write!(
                    f,
                    "Invalid fold factor {} for block size {}",
                    factor, block_size
                )
            }
            ReconError::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            ReconError::DeserializationError(msg) => write!(f, "Deserialization error: {}", msg),
        }
    }
}

impl std::error::Error for ReconError {}

/// Result type alias for sketch operations
pub type Result<T> = std::result::Result<T, ReconError>;
