//! Quasi-estimator: last-resort difference sizing by membership sampling
//!
//! When the hybrid estimator cannot anchor (its deepest stratum failed) one
//! side may still hold a remote IBF and its own raw records. Probing a
//! sample of local records against the remote filter separates probable
//! members from certain non-members: a zero counter at any probe position
//! rules membership out. The non-member count, corrected for the filter's
//! false-positive rate and scaled from the sample to the full set, bounds
//! the difference.

use crate::reconciliation::ibf::Ibf;

/// Estimate the symmetric difference between a local record set and the
/// set summarized by a remote filter
///
/// `sample` iterates `(id, value)` pairs drawn from the local set;
/// `local_set_size` is the full local cardinality the sample represents.
/// The estimate is capped by the combined cardinalities of both sides.
///
/// # Example
/// ```
/// use recon_oxide::estimation::quasi_estimate;
/// use recon_oxide::reconciliation::{Ibf, IbfConfig};
///
/// let mut remote = Ibf::new(IbfConfig::default(), 1_024).unwrap();
/// for id in 0..200u64 {
///     remote.add(id, b"row");
/// }
///
/// // the local set shares 150 records and holds 50 others
/// let local: Vec<(u64, Vec<u8>)> = (50..250u64).map(|id| (id, b"row".to_vec())).collect();
/// let estimate = quasi_estimate(
///     &remote,
///     local.iter().map(|(id, v)| (*id, v.as_slice())),
///     200,
/// );
/// assert!(estimate >= 25 && estimate <= 150);
/// ```
pub fn quasi_estimate<'a, I>(remote: &Ibf, sample: I, local_set_size: u64) -> u64
where
    I: IntoIterator<Item = (u64, &'a [u8])>,
{
    let remote_size = remote.item_count().unsigned_abs();
    let ceiling = local_set_size.saturating_add(remote_size);

    let mut sampled: u64 = 0;
    let mut non_members: u64 = 0;
    for (id, value) in sample {
        sampled += 1;
        if !remote.contains(id, value) {
            non_members += 1;
        }
    }
    if sampled == 0 {
        // nothing local to probe with; every remote record is a difference
        return remote_size.min(ceiling);
    }

    // membership probes pass spuriously when every position is occupied
    let occupancy = remote.occupied_cells() as f64 / remote.block_size() as f64;
    let false_positive_rate = occupancy.powi(remote.hash_count() as i32);
    let correction = (1.0 - false_positive_rate).max(0.01);

    let scale = local_set_size.max(sampled) as f64 / sampled as f64;
    let estimate = (non_members as f64 * scale / correction).round() as u64;
    estimate.min(ceiling)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconciliation::ibf::IbfConfig;

    fn remote_with(ids: std::ops::Range<u64>) -> Ibf {
        let mut ibf = Ibf::new(IbfConfig::default(), 1_024).unwrap();
        for id in ids {
            ibf.add(id, b"row");
        }
        ibf
    }

    #[test]
    fn test_identical_sets_estimate_zero() {
        let remote = remote_with(0..100);
        let local: Vec<(u64, Vec<u8>)> = (0..100u64).map(|id| (id, b"row".to_vec())).collect();
        let estimate = quasi_estimate(
            &remote,
            local.iter().map(|(id, v)| (*id, v.as_slice())),
            100,
        );
        assert_eq!(estimate, 0);
    }

    #[test]
    fn test_disjoint_local_records_counted() {
        let remote = remote_with(0..100);
        // half the local set is unknown to the remote filter
        let local: Vec<(u64, Vec<u8>)> = (50..150u64).map(|id| (id, b"row".to_vec())).collect();
        let estimate = quasi_estimate(
            &remote,
            local.iter().map(|(id, v)| (*id, v.as_slice())),
            100,
        );
        assert!(estimate >= 25, "estimate {} too low", estimate);
        assert!(estimate <= 200);
    }

    #[test]
    fn test_sample_scaling() {
        let remote = remote_with(0..100);
        // a tenth of the local set sampled, all non-members
        let local: Vec<(u64, Vec<u8>)> =
            (1_000..1_010u64).map(|id| (id, b"row".to_vec())).collect();
        let estimate = quasi_estimate(
            &remote,
            local.iter().map(|(id, v)| (*id, v.as_slice())),
            100,
        );
        assert!(estimate >= 80, "estimate {} lost the scale", estimate);
        assert!(estimate <= 200);
    }

    #[test]
    fn test_empty_sample_falls_back_to_remote_size() {
        let remote = remote_with(0..100);
        let estimate = quasi_estimate(&remote, std::iter::empty(), 0);
        assert_eq!(estimate, 100);
    }

    #[test]
    fn test_capped_by_combined_sizes() {
        let remote = remote_with(0..10);
        let local: Vec<(u64, Vec<u8>)> =
            (1_000..1_100u64).map(|id| (id, b"row".to_vec())).collect();
        let estimate = quasi_estimate(
            &remote,
            local.iter().map(|(id, v)| (*id, v.as_slice())),
            100,
        );
        assert!(estimate <= 110);
    }
}
