//! Difference-size estimation for sizing reconciliation filters
//!
//! Decoding an IBF only succeeds when the filter was sized for the actual
//! difference, so reconciliation starts by estimating `|A △ B|` from
//! constant-size sketches:
//!
//! - [`StrataEstimator`]: a bank of mini IBFs partitioned by identifier-hash
//!   depth; accurate at close range
//! - [`BitMinwiseEstimator`]: b-bit minwise similarity over the records the
//!   strata bank does not materialize
//! - [`HybridEstimator`]: the composition of both, built via
//!   [`HybridEstimatorFactory`] from the set size and failure history
//! - [`quasi_estimate`]: membership-sampling fallback for when the hybrid
//!   cannot anchor
//!
//! # Example
//! ```
//! use recon_oxide::estimation::HybridEstimatorFactory;
//! use recon_oxide::reconciliation::{ibf_parameters, IbfConfig};
//!
//! let config = IbfConfig::default();
//! let mut local = HybridEstimatorFactory::create(config, 5_000, 0).unwrap();
//! let mut remote = HybridEstimatorFactory::create(config, 5_000, 0).unwrap();
//! for id in 0..5_000u64 {
//!     local.add(id, b"row");
//! }
//! for id in 40..5_000u64 {
//!     remote.add(id, b"row");
//! }
//!
//! let estimate = local.decode(&remote).unwrap().expect("anchored");
//! let sizing = ibf_parameters(estimate, 0);
//! assert!(sizing.block_size >= estimate);
//! ```

pub mod hybrid;
pub mod minwise;
pub mod quasi;
pub mod strata;

pub use hybrid::{HybridEstimator, HybridEstimatorFactory};
pub use minwise::BitMinwiseEstimator;
pub use quasi::quasi_estimate;
pub use strata::{StrataEstimator, MAX_STRATA, STRATA_BLOCK_SIZE};
