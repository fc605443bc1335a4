//! Strata estimator: difference sizing from a bank of mini filters
//!
//! Records are partitioned by the number of trailing zero bits of their
//! identifier hash: stratum `t` receives the ~`2^-(t+1)` fraction of records
//! whose hash ends in exactly `t` zeros. Each stratum is a small value-axis
//! IBF, so subtracting two banks and peeling stratum by stratum reveals the
//! difference density at geometrically decreasing sample rates.
//!
//! Decoding walks from the deepest (sparsest) stratum downward. Every
//! stratum that peels contributes its exact difference count; the first one
//! that stalls ends the walk, and the accumulated count is scaled by
//! `2^(s+1)` to account for the strata below it.
//!
//! # References
//!
//! - Eppstein, D., Goodrich, M. T., Uyeda, F., & Varghese, G. (2011).
//!   "What's the difference? Efficient set reconciliation without prior
//!   context" (strata estimator construction)

use crate::common::hash::{id_hash, value_hash};
use crate::common::validation::{read_i64, read_u8, validate_byte_size};
use crate::common::{DifferenceSets, ReconError, Result};
use crate::reconciliation::count::CountKind;
use crate::reconciliation::ibf::{Ibf, IbfConfig};

/// Upper bound on the stratum count (trailing zeros of a 32-bit hash)
pub const MAX_STRATA: u8 = 32;

/// Cells per mini filter
pub const STRATA_BLOCK_SIZE: u64 = 80;

/// Bank of mini IBFs partitioned by identifier-hash depth
///
/// # Example
/// ```
/// use recon_oxide::estimation::StrataEstimator;
/// use recon_oxide::reconciliation::IbfConfig;
///
/// let config = IbfConfig::default();
/// let mut a = StrataEstimator::new(config, 32).unwrap();
/// let mut b = StrataEstimator::new(config, 32).unwrap();
/// for id in 0..1_000u64 {
///     a.add(id, b"row");
///     b.add(id, b"row");
/// }
/// assert_eq!(a.decode(&b).unwrap(), Some(0));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct StrataEstimator {
    config: IbfConfig,
    strata: Vec<Ibf>,
    item_count: i64,
    decode_factor: u64,
}

impl StrataEstimator {
    /// Create a bank with `strata_count` mini filters
    ///
    /// Mini filters always use 32-bit counters: the shallow strata absorb
    /// half of every set added, far beyond what narrower counters tolerate.
    ///
    /// # Errors
    /// Returns `InvalidParameter` when `strata_count` is zero or above 32.
    pub fn new(config: IbfConfig, strata_count: u8) -> Result<Self> {
        if strata_count == 0 || strata_count > MAX_STRATA {
            return Err(ReconError::InvalidParameter {
                param: "strata_count".to_string(),
                value: strata_count.to_string(),
                constraint: format!("must be in range [1, {}]", MAX_STRATA),
            });
        }
        let mini_config = IbfConfig {
            count_kind: CountKind::I32,
            ..config
        };
        let strata = (0..strata_count)
            .map(|_| Ibf::new_reverse(mini_config, STRATA_BLOCK_SIZE))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            config: mini_config,
            strata,
            item_count: 0,
            decode_factor: 1,
        })
    }

    /// Number of materialized strata
    pub fn strata_count(&self) -> usize {
        self.strata.len()
    }

    /// Net number of records absorbed
    pub fn item_count(&self) -> i64 {
        self.item_count
    }

    /// Current estimate-scaling factor
    pub fn decode_factor(&self) -> u64 {
        self.decode_factor
    }

    /// Scale future estimates up after failed decode attempts
    ///
    /// Doubles per failure: an estimate that led to a failed decode was too
    /// small.
    pub fn set_failed_decode_count(&mut self, failed: u32) {
        self.decode_factor = 1u64 << failed.min(32);
    }

    /// Stratum index for an identifier
    fn stratum_of(&self, id: u64) -> usize {
        id_hash(id, self.config.hash_seed).trailing_zeros() as usize
    }

    /// Add a record; returns false when its stratum is not materialized
    pub fn add(&mut self, id: u64, value: &[u8]) -> bool {
        self.add_hashed(id, value_hash(value, self.config.hash_seed))
    }

    /// Add with a caller-computed value hash; returns false when the
    /// record's stratum is not materialized (the caller routes it elsewhere)
    pub fn add_hashed(&mut self, id: u64, value_hash: u32) -> bool {
        let t = self.stratum_of(id);
        if t >= self.strata.len() {
            return false;
        }
        self.strata[t].add_hashed(id, value_hash);
        self.item_count += 1;
        true
    }

    /// Remove a record; returns false when its stratum is not materialized
    pub fn remove(&mut self, id: u64, value: &[u8]) -> bool {
        self.remove_hashed(id, value_hash(value, self.config.hash_seed))
    }

    /// Remove with a caller-computed value hash
    pub fn remove_hashed(&mut self, id: u64, value_hash: u32) -> bool {
        let t = self.stratum_of(id);
        if t >= self.strata.len() {
            return false;
        }
        self.strata[t].remove_hashed(id, value_hash);
        self.item_count -= 1;
        true
    }

    /// Estimate the symmetric difference against another bank
    ///
    /// Walks from the deepest stratum down. `None` means the deepest
    /// stratum itself failed to peel; there is no anchor to scale from,
    /// and the caller must fall back to another estimator.
    ///
    /// # Errors
    /// Returns `IncompatibleSketches` when the banks differ in stratum
    /// count or filter parameters.
    pub fn decode(&self, other: &StrataEstimator) -> Result<Option<u64>> {
        if self.strata.len() != other.strata.len() {
            return Err(ReconError::IncompatibleSketches {
                reason: format!(
                    "Different stratum counts: {} vs {}",
                    self.strata.len(),
                    other.strata.len()
                ),
            });
        }

        let deepest = self.strata.len() - 1;
        let mut accumulated: u64 = 0;
        for s in (0..self.strata.len()).rev() {
            let mut sets = DifferenceSets::new();
            let decoded = self.strata[s].subtract_and_decode(&other.strata[s], &mut sets)?;
            if decoded {
                accumulated += sets.total_changes() as u64;
            } else if s == deepest {
                return Ok(None);
            } else {
                return Ok(Some(
                    self.decode_factor.saturating_mul(accumulated << (s + 1)),
                ));
            }
        }
        Ok(Some(self.decode_factor.saturating_mul(accumulated)))
    }

    pub(crate) fn write_into(&self, buf: &mut Vec<u8>) {
        buf.push(self.strata.len() as u8);
        for s in 0..MAX_STRATA as usize {
            if let Some(stratum) = self.strata.get(s) {
                buf.push(1);
                stratum.write_into(buf);
                buf.push(0);
            } else {
                buf.push(0);
            }
        }
    }

    pub(crate) fn read_from(config: IbfConfig, bytes: &[u8], offset: &mut usize) -> Result<Self> {
        let mini_config = IbfConfig {
            count_kind: CountKind::I32,
            ..config
        };
        let strata_count = read_u8(bytes, offset)?;
        if strata_count == 0 || strata_count > MAX_STRATA {
            return Err(ReconError::DeserializationError(format!(
                "Invalid stratum count {}",
                strata_count
            )));
        }
        let mut strata = Vec::with_capacity(strata_count as usize);
        for s in 0..MAX_STRATA {
            let present = read_u8(bytes, offset)?;
            match (present, s < strata_count) {
                (1, true) => {
                    let stratum = Ibf::read_from(mini_config, bytes, offset)?;
                    if read_u8(bytes, offset)? != 0 {
                        return Err(ReconError::DeserializationError(
                            "Unexpected sub-sketch in stratum".to_string(),
                        ));
                    }
                    strata.push(stratum);
                }
                (0, false) => {}
                _ => {
                    return Err(ReconError::DeserializationError(format!(
                        "Stratum {} presence contradicts the stratum count",
                        s
                    )))
                }
            }
        }
        let item_count = strata.iter().map(Ibf::item_count).sum();
        Ok(Self {
            config: mini_config,
            strata,
            item_count,
            decode_factor: 1,
        })
    }

    /// Serialize the bank: item count, stratum count, then 32 slots with
    /// presence markers
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&self.item_count.to_le_bytes());
        self.write_into(&mut buf);
        buf
    }

    /// Deserialize a bank serialized by [`StrataEstimator::serialize`]
    ///
    /// # Errors
    /// Returns `DeserializationError` on truncated or inconsistent data.
    pub fn deserialize(config: IbfConfig, bytes: &[u8]) -> Result<Self> {
        validate_byte_size(bytes.len())?;
        let mut offset = 0;
        let item_count = read_i64(bytes, &mut offset)?;
        let mut estimator = Self::read_from(config, bytes, &mut offset)?;
        if offset != bytes.len() {
            return Err(ReconError::DeserializationError(format!(
                "Trailing bytes after strata estimator: {}",
                bytes.len() - offset
            )));
        }
        estimator.item_count = item_count;
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
    fn test_new_validates() {
        assert!(StrataEstimator::new(config(), 7).is_ok());
        assert!(StrataEstimator::new(config(), 32).is_ok());
        assert!(StrataEstimator::new(config(), 0).is_err());
        assert!(StrataEstimator::new(config(), 33).is_err());
    }

    #[test]
    fn test_add_routes_by_depth() {
        let mut estimator = StrataEstimator::new(config(), 4).unwrap();
        let mut absorbed = 0;
        let mut routed_out = 0;
        for id in 0..1_000u64 {
            if estimator.add(id, b"v") {
                absorbed += 1;
            } else {
                routed_out += 1;
            }
        }
        // depth >= 4 has probability 1/16
        assert!(absorbed > 850);
        assert!(routed_out > 20);
        assert_eq!(estimator.item_count(), absorbed);
    }

    #[test]
    fn test_identical_banks_estimate_zero() {
        let mut a = StrataEstimator::new(config(), 32).unwrap();
        let mut b = StrataEstimator::new(config(), 32).unwrap();
        for id in 0..500u64 {
            a.add(id, b"v");
            b.add(id, b"v");
        }
        assert_eq!(a.decode(&b).unwrap(), Some(0));
    }

    #[test]
    fn test_small_difference_estimated_closely() {
        let mut a = StrataEstimator::new(config(), 32).unwrap();
        let mut b = StrataEstimator::new(config(), 32).unwrap();
        for id in 0..1_000u64 {
            a.add(id, b"v");
        }
        for id in 20..1_000u64 {
            b.add(id, b"v");
        }
        let estimate = a.decode(&b).unwrap().expect("deepest strata are sparse");
        // 20 true differences; every stratum that holds one should peel
        assert!(estimate >= 10, "estimate {} too low", estimate);
        assert!(estimate <= 80, "estimate {} too high", estimate);
    }

    #[test]
    fn test_decode_factor_scales() {
        let mut a = StrataEstimator::new(config(), 32).unwrap();
        let mut b = StrataEstimator::new(config(), 32).unwrap();
        for id in 0..100u64 {
            a.add(id, b"v");
        }
        for id in 50..100u64 {
            b.add(id, b"v");
        }
        let base = a.decode(&b).unwrap().unwrap();
        a.set_failed_decode_count(2);
        let scaled = a.decode(&b).unwrap().unwrap();
        assert_eq!(scaled, base * 4);
    }

    #[test]
    fn test_incompatible_counts() {
        let a = StrataEstimator::new(config(), 7).unwrap();
        let b = StrataEstimator::new(config(), 9).unwrap();
        assert!(a.decode(&b).is_err());
    }

    #[test]
    fn test_serialization_round_trip() {
        let mut estimator = StrataEstimator::new(config(), 13).unwrap();
        for id in 0..300u64 {
            estimator.add(id, format!("value {}", id).as_bytes());
        }
        let bytes = estimator.serialize();
        let back = StrataEstimator::deserialize(config(), &bytes).unwrap();
        assert_eq!(estimator, back);
    }
}
