//! Invertible Bloom filters for key/value set reconciliation
//!
//! Two parties each fill a filter with their records, exchange the
//! fixed-size sketches, subtract, and peel the difference out locally:
//!
//! 1. Estimate the difference size (see [`crate::estimation`])
//! 2. Size a filter with [`ibf_parameters`]
//! 3. Fill an [`Ibf`] (or a [`KeyValueIbf`] when value changes matter)
//! 4. `subtract_and_decode` against the remote sketch
//! 5. On failure, double the parameters and retry
//!
//! # Example
//! ```
//! use recon_oxide::reconciliation::{ibf_parameters, IbfConfig, KeyValueIbf};
//! use recon_oxide::DifferenceSets;
//!
//! let config = IbfConfig::default();
//! let sizing = ibf_parameters(8, 0);
//!
//! let mut local = KeyValueIbf::new(config, sizing.block_size).unwrap();
//! let mut remote = KeyValueIbf::new(config, sizing.block_size).unwrap();
//! for id in 0..50u64 {
//!     local.add(id, b"row");
//!     remote.add(id, b"row");
//! }
//! local.add(77, b"only here");
//! remote.add(99, b"only there");
//! remote.add(7, b"rewritten");
//! local.remove(7, b"row");
//! local.add(7, b"original");
//!
//! let mut diff = DifferenceSets::new();
//! assert!(local.subtract_and_decode(&remote, &mut diff).unwrap());
//! assert!(diff.only_in_a.contains(&77));
//! assert!(diff.only_in_b.contains(&99));
//! assert!(diff.modified.contains(&7));
//! ```

pub mod count;
pub mod folding;
pub mod ibf;
pub mod paired;
pub mod sizing;

pub use count::CountKind;
pub use folding::FoldingStrategy;
pub use ibf::{Ibf, IbfConfig, IbfStats};
pub use paired::KeyValueIbf;
pub use sizing::{ibf_parameters, IbfSizing};
