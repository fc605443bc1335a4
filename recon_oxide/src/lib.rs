//! recon_oxide: approximate set reconciliation over key/value data
//!
//! Two parties each hold a set of `(identifier, value)` records. This
//! library lets them identify the symmetric difference (records unique to
//! each side, plus records whose identifier matches but whose value
//! differs) by exchanging small fixed-size sketches instead of the sets
//! themselves.
//!
//! # The pieces
//!
//! - [`reconciliation::Ibf`]: an invertible Bloom filter, the counting
//!   sketch whose subtraction and peeling decoder extract the difference
//! - [`reconciliation::KeyValueIbf`]: a paired key/value filter that also
//!   detects *modified* records
//! - [`estimation::HybridEstimator`]: strata plus b-bit minwise sketches
//!   that estimate the difference size so the filter can be sized right
//! - [`reconciliation::ibf_parameters`]: the sizing policy tying the two
//!   together, with doubling on failed decodes
//!
//! # End to end
//!
//! ```
//! use recon_oxide::estimation::HybridEstimatorFactory;
//! use recon_oxide::reconciliation::{ibf_parameters, IbfConfig, KeyValueIbf};
//! use recon_oxide::DifferenceSets;
//!
//! let config = IbfConfig::default();
//!
//! // 1. both sides build constant-size estimators
//! let mut local_est = HybridEstimatorFactory::create(config, 1_000, 0).unwrap();
//! let mut remote_est = HybridEstimatorFactory::create(config, 1_000, 0).unwrap();
//! for id in 0..1_000u64 {
//!     local_est.add(id, b"row");
//!     if id % 100 != 0 {
//!         remote_est.add(id, b"row");
//!     }
//! }
//!
//! // 2. size a filter from the estimate and fill it
//! let estimate = local_est.decode(&remote_est).unwrap().expect("anchored");
//! let sizing = ibf_parameters(estimate, 0);
//! let mut local = KeyValueIbf::new(config, sizing.block_size).unwrap();
//! let mut remote = KeyValueIbf::new(config, sizing.block_size).unwrap();
//! for id in 0..1_000u64 {
//!     local.add(id, b"row");
//!     if id % 100 != 0 {
//!         remote.add(id, b"row");
//!     }
//! }
//!
//! // 3. decode the difference
//! let mut diff = DifferenceSets::new();
//! assert!(local.subtract_and_decode(&remote, &mut diff).unwrap());
//! assert_eq!(diff.only_in_a.len(), 10);
//! assert!(diff.only_in_b.is_empty());
//! ```
//!
//! Sketches are single-threaded: no operation locks, and exclusive access
//! to each sketch is the caller's responsibility. Decoding is probabilistic;
//! a failed decode is an ordinary outcome handled by resizing and retrying.

pub mod common;
pub mod estimation;
pub mod reconciliation;

// Re-export core types for convenience
pub use common::{DecodeOutcome, DifferenceSets, Reconcilable, ReconError, Result};

/// Error types and result aliases for sketch operations
pub mod error {
    pub use crate::common::{ReconError, Result};
}

// Re-export commonly used sketches
pub use estimation::{
    quasi_estimate, BitMinwiseEstimator, HybridEstimator, HybridEstimatorFactory, StrataEstimator,
};
pub use reconciliation::{ibf_parameters, CountKind, FoldingStrategy, Ibf, IbfConfig, KeyValueIbf};
