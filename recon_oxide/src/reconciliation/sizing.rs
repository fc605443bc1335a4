//! Sizing policy: filter parameters from a difference estimate
//!
//! Decoding succeeds with high probability when the filter carries roughly
//! 1.5 cells per expected difference per hash function. Every failed decode
//! doubles the block size; the estimate that drove it was too small.

use crate::reconciliation::count::CountKind;

/// Parameters for the next reconciliation filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IbfSizing {
    /// Cell count
    pub block_size: u64,
    /// Positions per record
    pub hash_count: u32,
    /// Counter width
    pub count_kind: CountKind,
}

/// Choose `(m, k, count width)` for an estimated difference `d` after
/// `failed_attempts` failed decodes
///
/// `k` is 3 below 200 estimated differences and 4 above; `m` is
/// `ceil(1.5 * d * k)` doubled per failure; the counter width is the
/// narrowest that accommodates the expected occupancy.
///
/// # Example
/// ```
/// use recon_oxide::reconciliation::ibf_parameters;
///
/// let sizing = ibf_parameters(100, 0);
/// assert_eq!(sizing.hash_count, 3);
/// assert_eq!(sizing.block_size, 450);
///
/// let retry = ibf_parameters(100, 1);
/// assert_eq!(retry.block_size, 900);
/// ```
pub fn ibf_parameters(estimated_diff: u64, failed_attempts: u32) -> IbfSizing {
    let d = estimated_diff.max(1);
    let hash_count: u32 = if d < 200 { 3 } else { 4 };

    let base = (1.5 * d as f64 * f64::from(hash_count)).ceil() as u64;
    let block_size = base
        .saturating_mul(1u64 << failed_attempts.min(24))
        .max(u64::from(hash_count) * 2)
        .max(8);

    IbfSizing {
        block_size,
        hash_count,
        count_kind: CountKind::for_occupancy(d, block_size),
    }
}
