//! Hybrid estimator: strata close range, minwise far range
//!
//! The strata bank gives accurate counts for small differences but only
//! materializes a handful of strata; the records below the materialized
//! depth would overwhelm its mini filters anyway. The hybrid routes exactly
//! those records into a b-bit minwise sketch instead: the trailing-zero cut
//! is a consistent sample (the same identifier lands on the same side for
//! both parties), so the minwise similarity over the sampled residue
//! estimates the difference the strata never saw.
//!
//! The composed estimate is
//! `strata + 2 * decode_factor * sampled_capacity * (1 - similarity)`,
//! bounded above by the combined item counts of both parties.

use crate::common::hash::value_hash;
use crate::common::validation::{read_i64, validate_byte_size, validate_capacity};
use crate::common::{ReconError, Result};
use crate::estimation::minwise::BitMinwiseEstimator;
use crate::estimation::strata::StrataEstimator;
use crate::reconciliation::ibf::IbfConfig;

/// Composite difference estimator over strata and minwise sketches
///
/// # Example
/// ```
/// use recon_oxide::estimation::HybridEstimatorFactory;
/// use recon_oxide::reconciliation::IbfConfig;
///
/// let config = IbfConfig::default();
/// let mut a = HybridEstimatorFactory::create(config, 1_000, 0).unwrap();
/// let mut b = HybridEstimatorFactory::create(config, 1_000, 0).unwrap();
/// for id in 0..1_000u64 {
///     a.add(id, b"row");
/// }
/// for id in 100..1_000u64 {
///     b.add(id, b"row");
/// }
/// let estimate = a.decode(&b).unwrap().expect("strata anchor holds");
/// assert!(estimate >= 50 && estimate <= 200);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct HybridEstimator {
    config: IbfConfig,
    strata: StrataEstimator,
    minwise: BitMinwiseEstimator,
    capacity: u64,
    item_count: i64,
    decode_factor: u64,
}

impl HybridEstimator {
    /// Create an estimator sized for `capacity` records
    ///
    /// Records whose identifier-hash depth is below `strata_count` go to the
    /// strata bank; the rest feed the minwise sketch with `minwise_hashes`
    /// permutations of `bit_size` retained bits.
    ///
    /// # Errors
    /// Returns `InvalidParameter` when any component parameter is out of
    /// range.
    pub fn new(
        config: IbfConfig,
        capacity: u64,
        bit_size: u8,
        minwise_hashes: u32,
        strata_count: u8,
    ) -> Result<Self> {
        validate_capacity(capacity)?;
        Ok(Self {
            config,
            strata: StrataEstimator::new(config, strata_count)?,
            minwise: BitMinwiseEstimator::new(bit_size, minwise_hashes, capacity)?,
            capacity,
            item_count: 0,
            decode_factor: 1,
        })
    }

    /// The strata component
    pub fn strata(&self) -> &StrataEstimator {
        &self.strata
    }

    /// The minwise component
    pub fn minwise(&self) -> &BitMinwiseEstimator {
        &self.minwise
    }

    /// Capacity the estimator was sized for
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Net number of records added
    pub fn item_count(&self) -> i64 {
        self.item_count
    }

    /// Current estimate-scaling factor
    pub fn decode_factor(&self) -> u64 {
        self.decode_factor
    }

    /// Scale future estimates up after failed decode attempts
    pub fn set_failed_decode_count(&mut self, failed: u32) {
        self.decode_factor = 1u64 << failed.min(32);
        self.strata.set_failed_decode_count(failed);
    }

    /// Add a record
    pub fn add(&mut self, id: u64, value: &[u8]) {
        self.add_hashed(id, value_hash(value, self.config.hash_seed));
    }

    /// Add a record with a caller-computed value hash
    pub fn add_hashed(&mut self, id: u64, value_hash: u32) {
        if !self.strata.add_hashed(id, value_hash) {
            self.minwise.add(id);
        }
        self.item_count += 1;
    }

    /// Estimate the symmetric difference against another estimator
    ///
    /// `None` means the strata anchor failed (its deepest stratum would not
    /// peel); the caller must fall back to the quasi-estimator. Otherwise
    /// the strata estimate is combined with the minwise residue and capped
    /// by the combined item counts.
    ///
    /// # Errors
    /// Returns `IncompatibleSketches` when the estimators' parameters
    /// differ.
    pub fn decode(&self, other: &HybridEstimator) -> Result<Option<u64>> {
        let Some(close_range) = self.strata.decode(&other.strata)? else {
            return Ok(None);
        };

        let similarity = self.minwise.similarity(&other.minwise)?;
        let sampled =
            (self.minwise.item_count() + other.minwise.item_count()).max(0) as f64 / 2.0;
        let far_range =
            (2.0 * self.decode_factor as f64 * sampled * (1.0 - similarity)).round() as u64;

        let combined = (self.item_count + other.item_count).max(0) as u64;
        Ok(Some((close_range + far_range).min(combined)))
    }

    /// Serialize into the wire layout: item count, strata bank (stratum
    /// count plus 32 marked slots), then the minwise sketch
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&self.item_count.to_le_bytes());
        self.strata.write_into(&mut buf);
        self.minwise.write_into(&mut buf);
        buf
    }

    /// Deserialize an estimator serialized by [`HybridEstimator::serialize`]
    ///
    /// # Errors
    /// Returns `DeserializationError` on truncated or inconsistent data.
    pub fn deserialize(config: IbfConfig, bytes: &[u8]) -> Result<Self> {
        validate_byte_size(bytes.len())?;
        let mut offset = 0;
        let item_count = read_i64(bytes, &mut offset)?;
        let strata = StrataEstimator::read_from(config, bytes, &mut offset)?;
        let minwise = BitMinwiseEstimator::read_from(bytes, &mut offset)?;
        if offset != bytes.len() {
            return Err(ReconError::DeserializationError(format!(
                "Trailing bytes after hybrid estimator: {}",
                bytes.len() - offset
            )));
        }
        let capacity = minwise.capacity();
        Ok(Self {
            config,
            strata,
            minwise,
            capacity,
            item_count,
            decode_factor: 1,
        })
    }
}

/// Parameter table for building hybrid estimators from the set size
///
/// Larger sets push more records through every stratum, so they get deeper
/// banks and more minwise permutations; a failed decode forces the deepest
/// configuration outright.
pub struct HybridEstimatorFactory;

impl HybridEstimatorFactory {
    /// Build an estimator for a set of `set_size` records after
    /// `failed_decode_count` failed reconciliation attempts
    ///
    /// # Errors
    /// Returns `InvalidParameter` when the derived parameters are out of
    /// range (not reachable from the built-in table).
    pub fn create(
        config: IbfConfig,
        set_size: u64,
        failed_decode_count: u32,
    ) -> Result<HybridEstimator> {
        let (strata_count, minwise_hashes) = if set_size > 16_000 || failed_decode_count > 0 {
            (13, 15)
        } else if set_size > 8_000 {
            (9, 10)
        } else {
            (7, 8)
        };
        let mut estimator =
            HybridEstimator::new(config, set_size.max(1), 2, minwise_hashes, strata_count)?;
        estimator.set_failed_decode_count(failed_decode_count);
        Ok(estimator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> IbfConfig {
        IbfConfig::default()
    }

    #[test]
    fn test_self_estimate_is_zero() {
        let mut estimator = HybridEstimatorFactory::create(config(), 1_000, 0).unwrap();
        for id in 0..1_000u64 {
            estimator.add(id, b"v");
        }
        assert_eq!(estimator.decode(&estimator.clone()).unwrap(), Some(0));
    }

    #[test]
    fn test_empty_estimators() {
        let a = HybridEstimatorFactory::create(config(), 100, 0).unwrap();
        let b = HybridEstimatorFactory::create(config(), 100, 0).unwrap();
        assert_eq!(a.decode(&b).unwrap(), Some(0));
    }

    #[test]
    fn test_estimate_bounded_by_item_counts() {
        let mut a = HybridEstimatorFactory::create(config(), 100, 0).unwrap();
        let mut b = HybridEstimatorFactory::create(config(), 100, 0).unwrap();
        for id in 0..100u64 {
            a.add(id, b"v");
        }
        for id in 1_000..1_100u64 {
            b.add(id, b"v");
        }
        let estimate = a.decode(&b).unwrap().unwrap();
        assert!(estimate <= 200);
        assert!(estimate >= 100, "estimate {} too low", estimate);
    }

    #[test]
    fn test_factory_thresholds() {
        let small = HybridEstimatorFactory::create(config(), 1_000, 0).unwrap();
        assert_eq!(small.strata().strata_count(), 7);
        assert_eq!(small.minwise().hash_count(), 8);

        let medium = HybridEstimatorFactory::create(config(), 10_000, 0).unwrap();
        assert_eq!(medium.strata().strata_count(), 9);
        assert_eq!(medium.minwise().hash_count(), 10);

        let large = HybridEstimatorFactory::create(config(), 20_000, 0).unwrap();
        assert_eq!(large.strata().strata_count(), 13);
        assert_eq!(large.minwise().hash_count(), 15);

        // a failed decode forces the deepest configuration at any size
        let retry = HybridEstimatorFactory::create(config(), 1_000, 1).unwrap();
        assert_eq!(retry.strata().strata_count(), 13);
        assert_eq!(retry.decode_factor(), 2);
    }

    #[test]
    fn test_incompatible_estimators() {
        let a = HybridEstimatorFactory::create(config(), 1_000, 0).unwrap();
        let b = HybridEstimatorFactory::create(config(), 20_000, 0).unwrap();
        assert!(a.decode(&b).is_err());
    }

    #[test]
    fn test_serialization_round_trip() {
        let mut estimator = HybridEstimatorFactory::create(config(), 1_000, 0).unwrap();
        for id in 0..500u64 {
            estimator.add(id, format!("value {}", id).as_bytes());
        }
        let bytes = estimator.serialize();
        let back = HybridEstimator::deserialize(config(), &bytes).unwrap();
        assert_eq!(estimator.item_count(), back.item_count());
        assert_eq!(estimator.minwise(), back.minwise());
        assert_eq!(estimator.strata().strata_count(), back.strata().strata_count());
    }
}
