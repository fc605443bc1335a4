//! Paired key/value filter with modification detection
//!
//! The plain key-axis IBF cancels a record whose value changed (both sides
//! contribute identical cells), so value changes are invisible to it. The
//! paired filter keeps a second, value-axis filter alongside: there a
//! changed record surfaces as two singletons sharing an identifier, which
//! the decoder classifies as a modification.
//!
//! The two filters are siblings owned by one struct; every operation
//! dispatches to both explicitly.

use crate::common::validation::{read_u8, validate_byte_size};
use crate::common::{DecodeOutcome, DifferenceSets, Reconcilable, ReconError, Result};
use crate::reconciliation::ibf::{Ibf, IbfConfig};

/// Paired key-axis and value-axis IBF over `(u64, value)` records
///
/// # Example
/// ```
/// use recon_oxide::reconciliation::{IbfConfig, KeyValueIbf};
/// use recon_oxide::DifferenceSets;
///
/// let config = IbfConfig::default();
/// let mut alice = KeyValueIbf::new(config, 60).unwrap();
/// let mut bob = KeyValueIbf::new(config, 60).unwrap();
///
/// alice.add(1, b"same");
/// bob.add(1, b"same");
/// alice.add(2, b"old value");
/// bob.add(2, b"new value");
///
/// let mut diff = DifferenceSets::new();
/// let decoded = alice.subtract_and_decode(&bob, &mut diff).unwrap();
/// assert!(decoded);
/// assert!(diff.modified.contains(&2));
/// assert!(diff.only_in_a.is_empty());
/// assert!(diff.only_in_b.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct KeyValueIbf {
    key_filter: Ibf,
    value_filter: Ibf,
}

impl KeyValueIbf {
    /// Create a paired filter; both members share the configuration and
    /// block size
    ///
    /// # Errors
    /// Returns `InvalidParameter` when the configuration or block size is
    /// out of range.
    pub fn new(config: IbfConfig, block_size: u64) -> Result<Self> {
        Ok(Self {
            key_filter: Ibf::new(config, block_size)?,
            value_filter: Ibf::new_reverse(config, block_size)?,
        })
    }

    /// The key-axis member
    pub fn key_filter(&self) -> &Ibf {
        &self.key_filter
    }

    /// The value-axis member
    pub fn value_filter(&self) -> &Ibf {
        &self.value_filter
    }

    /// Net number of records added
    pub fn item_count(&self) -> i64 {
        self.key_filter.item_count()
    }

    /// Whether either member has saturated a counter
    pub fn is_saturated(&self) -> bool {
        self.key_filter.is_saturated() || self.value_filter.is_saturated()
    }

    /// True when every cell of both members is the identity cell
    pub fn is_empty(&self) -> bool {
        self.key_filter.is_empty() && self.value_filter.is_empty()
    }

    /// Add a record to both members
    pub fn add(&mut self, id: u64, value: &[u8]) {
        self.key_filter.add(id, value);
        self.value_filter.add(id, value);
    }

    /// Add with a caller-computed value hash
    pub fn add_hashed(&mut self, id: u64, value_hash: u32) {
        self.key_filter.add_hashed(id, value_hash);
        self.value_filter.add_hashed(id, value_hash);
    }

    /// Remove a record from both members
    pub fn remove(&mut self, id: u64, value: &[u8]) {
        self.key_filter.remove(id, value);
        self.value_filter.remove(id, value);
    }

    /// Remove with a caller-computed value hash
    pub fn remove_hashed(&mut self, id: u64, value_hash: u32) {
        self.key_filter.remove_hashed(id, value_hash);
        self.value_filter.remove_hashed(id, value_hash);
    }

    /// Probabilistic membership test against both members
    pub fn contains(&self, id: u64, value: &[u8]) -> bool {
        self.key_filter.contains(id, value) && self.value_filter.contains(id, value)
    }

    /// Fold both members by the same factor
    ///
    /// # Errors
    /// Returns `InvalidFoldFactor` when the factor does not divide either
    /// member's block size.
    pub fn fold(&self, factor: u64) -> Result<KeyValueIbf> {
        Ok(KeyValueIbf {
            key_filter: self.key_filter.fold(factor)?,
            value_filter: self.value_filter.fold(factor)?,
        })
    }

    /// Fold both members by the divisor the key filter's strategy chooses
    ///
    /// Identity clone when no usable divisor exists.
    pub fn compress(&self) -> KeyValueIbf {
        let key = &self.key_filter;
        if let Some(factor) = key.config().folding.fold_factor(
            key.block_size(),
            key.capacity(),
            key.item_count(),
        ) {
            if let Ok(folded) = self.fold(factor) {
                return folded;
            }
        }
        self.clone()
    }

    /// Cell-wise addition of another paired filter; both members recurse
    ///
    /// # Errors
    /// Returns `IncompatibleSketches` when either member pair cannot be
    /// aligned.
    pub fn add_sketch(&mut self, other: &KeyValueIbf) -> Result<()> {
        self.key_filter.add_sketch(&other.key_filter)?;
        self.value_filter.add_sketch(&other.value_filter)
    }

    /// Subtract another paired filter, allocating the result
    ///
    /// # Errors
    /// Returns `IncompatibleSketches` when either member pair cannot be
    /// aligned.
    pub fn subtract(&self, other: &KeyValueIbf) -> Result<KeyValueIbf> {
        Ok(KeyValueIbf {
            key_filter: self.key_filter.subtract(&other.key_filter)?,
            value_filter: self.value_filter.subtract(&other.value_filter)?,
        })
    }

    /// Subtract another paired filter into `self`
    ///
    /// # Errors
    /// Returns `IncompatibleSketches` when either member pair cannot be
    /// aligned.
    pub fn subtract_in_place(&mut self, other: &KeyValueIbf) -> Result<()> {
        self.key_filter.subtract_in_place(&other.key_filter)?;
        self.value_filter.subtract_in_place(&other.value_filter)
    }

    /// Peel both members of a post-subtract paired filter
    ///
    /// The key pass fills the only-in sets; the value pass detects
    /// modifications and migrates their identifiers out of the only-in
    /// sets. Returns the conjunction of both peels' outcomes.
    pub fn decode(&mut self, sets: &mut DifferenceSets) -> DecodeOutcome {
        let key_outcome = self.key_filter.decode(sets);

        let mut value_sets = DifferenceSets::new();
        let value_outcome = self.value_filter.decode(&mut value_sets);
        Self::merge_value_pass(sets, value_sets);

        key_outcome.and(value_outcome)
    }

    /// Subtract and decode both members, leaving `self` untouched
    ///
    /// Returns `Ok(true)` when both peels fully resolved.
    ///
    /// # Errors
    /// Returns `IncompatibleSketches` when either member pair cannot be
    /// aligned.
    pub fn subtract_and_decode(
        &self,
        other: &KeyValueIbf,
        sets: &mut DifferenceSets,
    ) -> Result<bool> {
        let key_ok = self
            .key_filter
            .subtract_and_decode(&other.key_filter, sets)?;

        let mut value_sets = DifferenceSets::new();
        let value_ok = self
            .value_filter
            .subtract_and_decode(&other.value_filter, &mut value_sets)?;
        Self::merge_value_pass(sets, value_sets);

        Ok(key_ok && value_ok)
    }

    /// Fold the value pass into the key pass results
    ///
    /// The value pass re-derives the only-in records (covering anything a
    /// stalled key pass missed) and owns modification detection.
    fn merge_value_pass(sets: &mut DifferenceSets, value_sets: DifferenceSets) {
        for id in value_sets.only_in_a {
            if !sets.modified.contains(&id) {
                sets.only_in_a.insert(id);
            }
        }
        for id in value_sets.only_in_b {
            if !sets.modified.contains(&id) {
                sets.only_in_b.insert(id);
            }
        }
        for id in value_sets.modified {
            sets.move_to_modified(id);
        }
    }

    /// Serialize into the wire layout: the key filter followed by the value
    /// filter as its sub-sketch
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.key_filter.write_into(&mut buf);
        buf.push(1);
        self.value_filter.write_into(&mut buf);
        buf.push(0);
        buf
    }

    /// Deserialize a paired filter from the wire layout
    ///
    /// # Errors
    /// Returns `DeserializationError` on truncated or inconsistent data,
    /// including a missing sub-sketch or wrong member axes.
    pub fn deserialize(config: IbfConfig, bytes: &[u8]) -> Result<Self> {
        validate_byte_size(bytes.len())?;
        let mut offset = 0;

        let key_filter = Ibf::read_from(config, bytes, &mut offset)?;
        if key_filter.is_reverse() {
            return Err(ReconError::DeserializationError(
                "Primary sketch of a paired filter must be key-axis".to_string(),
            ));
        }
        if read_u8(bytes, &mut offset)? != 1 {
            return Err(ReconError::DeserializationError(
                "Paired filter is missing its value-axis sub-sketch".to_string(),
            ));
        }

        let value_filter = Ibf::read_from(config, bytes, &mut offset)?;
        if !value_filter.is_reverse() {
            return Err(ReconError::DeserializationError(
                "Sub-sketch of a paired filter must be value-axis".to_string(),
            ));
        }
        if read_u8(bytes, &mut offset)? != 0 {
            return Err(ReconError::DeserializationError(
                "Unexpected nested sub-sketch".to_string(),
            ));
        }
        if offset != bytes.len() {
            return Err(ReconError::DeserializationError(format!(
                "Trailing bytes after paired filter: {}",
                bytes.len() - offset
            )));
        }

        Ok(Self {
            key_filter,
            value_filter,
        })
    }
}

impl Reconcilable for KeyValueIbf {
    fn subtract_in_place(&mut self, other: &Self) -> Result<()> {
        KeyValueIbf::subtract_in_place(self, other)
    }

    fn decode(&mut self, sets: &mut DifferenceSets) -> DecodeOutcome {
        KeyValueIbf::decode(self, sets)
    }

    fn subtract_and_decode(&self, other: &Self, sets: &mut DifferenceSets) -> Result<bool> {
        KeyValueIbf::subtract_and_decode(self, other, sets)
    }
}
