//! Invertible Bloom filter for key/value set reconciliation
//!
//! An IBF is a counting sketch whose cells carry XOR-folded identifier and
//! hash sums. Two compatible IBFs can be subtracted cell-wise; records
//! present in both cancel, and a peeling decoder extracts the symmetric
//! difference from what remains.
//!
//! # Algorithm Overview
//!
//! 1. Each record is mapped to `k` distinct cell positions via double
//!    hashing over its entry hash
//! 2. Insertion increments the counter and XORs the identifier and entry
//!    hash into every touched cell
//! 3. Subtraction combines two filters cell-wise (counts subtract, sums XOR)
//! 4. Decoding repeatedly extracts pure cells (`|count| == 1` with a
//!    consistent hash) and cancels their contributions until the filter is
//!    empty or the peel stalls
//!
//! # Filter axes
//!
//! The peel re-derives probe positions from a cell's hash sum, so every
//! filter stores the hash that drove its positions:
//!
//! - a **key filter** is positioned and checksummed by the identifier hash.
//!   Purity can be verified (`hash_sum == id_hash(id_sum)`), and records can
//!   be removed by key alone. Records that differ only in value cancel
//!   entirely under subtraction.
//! - a **value (reverse) filter** is positioned by a combined
//!   identifier/value hash and keeps the identifier in its id sum. A record
//!   whose value changed surfaces as two singletons with the same
//!   identifier and different hash sums, which is what makes modification
//!   detection possible; records that merely share a value stay spread over
//!   distinct cells.
//!
//! Identifiers are stored offset by one so that a lone record can never XOR
//! to the identity id sum; `u64::MAX` is reserved.
//!
//! # References
//!
//! - Eppstein, D., Goodrich, M. T., Uyeda, F., & Varghese, G. (2011).
//!   "What's the difference? Efficient set reconciliation without prior
//!   context"
//! - Goodrich, M. T., & Mitzenmacher, M. (2011). "Invertible bloom lookup
//!   tables"

use crate::common::hash::{gcd, id_hash, probe_positions, value_hash};
use crate::common::validation::{
    read_i64, read_u32, read_u64, read_u8, validate_block_size, validate_byte_size,
    validate_capacity, validate_hash_count, validate_min_size,
};
use crate::common::{DecodeOutcome, DifferenceSets, Reconcilable, ReconError, Result};
use crate::reconciliation::count::{CountKind, CountSlots};
use crate::reconciliation::folding::FoldingStrategy;
use std::collections::HashSet;

/// Construction parameters shared by every filter of an exchange
///
/// Both sides of a reconciliation must build their filters from the same
/// configuration; it is part of the protocol agreement and is not carried in
/// the serialized layout (except for the hash count and counter width, which
/// are checked on deserialization).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IbfConfig {
    /// Number of cell positions per record (3 or 4 in practice)
    pub hash_count: u32,

    /// Counter width for the cell counts
    pub count_kind: CountKind,

    /// Seed for the identifier and value hashes
    pub hash_seed: u32,

    /// Folding policy for allocation rounding and [`Ibf::compress`]
    pub folding: FoldingStrategy,
}

impl Default for IbfConfig {
    fn default() -> Self {
        Self {
            hash_count: 3,
            count_kind: CountKind::I32,
            hash_seed: 0x9747_B28C,
            folding: FoldingStrategy::default(),
        }
    }
}

/// Snapshot of a filter's state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IbfStats {
    /// Number of cells
    pub block_size: u64,
    /// Positions per record
    pub hash_count: u32,
    /// Capacity the filter was allocated for
    pub capacity: u64,
    /// Net number of records added (negative after subtraction)
    pub item_count: i64,
    /// Cells with a non-zero counter
    pub occupied_cells: u64,
    /// Whether any counter has saturated
    pub saturated: bool,
}

/// Invertible Bloom filter over `(u64, value-hash)` records
///
/// # Example
/// ```
/// use recon_oxide::reconciliation::{Ibf, IbfConfig};
/// use recon_oxide::DifferenceSets;
///
/// let config = IbfConfig::default();
/// let mut alice = Ibf::new(config, 60).unwrap();
/// let mut bob = Ibf::new(config, 60).unwrap();
///
/// for id in 0..100u64 {
///     alice.add(id, b"shared");
///     bob.add(id, b"shared");
/// }
/// alice.add(1_000, b"alice only");
/// bob.add(2_000, b"bob only");
///
/// let mut diff = DifferenceSets::new();
/// let decoded = alice.subtract_and_decode(&bob, &mut diff).unwrap();
/// assert!(decoded);
/// assert!(diff.only_in_a.contains(&1_000));
/// assert!(diff.only_in_b.contains(&2_000));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Ibf {
    config: IbfConfig,
    block_size: u64,
    capacity: u64,
    item_count: i64,
    is_reverse: bool,
    counts: CountSlots,
    id_sums: Vec<u64>,
    hash_sums: Vec<u32>,
    saturated: bool,
}

/// Offset identifiers so a stored id is never the identity word
fn encode_id(id: u64) -> u64 {
    id.wrapping_add(1)
}

fn decode_id(stored: u64) -> u64 {
    stored.wrapping_sub(1)
}

impl Ibf {
    /// Create a key-axis filter with `block_size` cells
    ///
    /// The block size may be rounded up by the configured folding strategy
    /// (7-smooth allocation).
    ///
    /// # Errors
    /// Returns `InvalidParameter` when the hash count or block size is out
    /// of range.
    pub fn new(config: IbfConfig, block_size: u64) -> Result<Self> {
        Self::with_axis(config, block_size, false)
    }

    /// Create a value-axis (reverse) filter with `block_size` cells
    ///
    /// # Errors
    /// Returns `InvalidParameter` when the hash count or block size is out
    /// of range.
    pub fn new_reverse(config: IbfConfig, block_size: u64) -> Result<Self> {
        Self::with_axis(config, block_size, true)
    }

    fn with_axis(config: IbfConfig, block_size: u64, is_reverse: bool) -> Result<Self> {
        validate_hash_count(config.hash_count)?;
        let block_size = config.folding.allocation_size(block_size);
        validate_block_size(block_size, config.hash_count)?;
        Ok(Self {
            config,
            block_size,
            capacity: block_size,
            item_count: 0,
            is_reverse,
            counts: CountSlots::new(config.count_kind, block_size as usize),
            id_sums: vec![0; block_size as usize],
            hash_sums: vec![0; block_size as usize],
            saturated: false,
        })
    }

    /// The configuration this filter was built with
    pub fn config(&self) -> IbfConfig {
        self.config
    }

    /// Number of cells
    pub fn block_size(&self) -> u64 {
        self.block_size
    }

    /// Positions per record
    pub fn hash_count(&self) -> u32 {
        self.config.hash_count
    }

    /// Capacity the filter was allocated for
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Net number of records added (negative after subtraction)
    pub fn item_count(&self) -> i64 {
        self.item_count
    }

    /// Whether this is a value-axis filter
    pub fn is_reverse(&self) -> bool {
        self.is_reverse
    }

    /// Whether any counter has hit its representation bound
    ///
    /// Saturation is a soft error: operations continue, but purity detection
    /// and count estimates degrade until the filter is resized.
    pub fn is_saturated(&self) -> bool {
        self.saturated
    }

    /// True when every cell is the identity cell
    pub fn is_empty(&self) -> bool {
        (0..self.block_size as usize).all(|i| self.cell_is_identity(i))
    }

    /// Cells with a non-zero counter
    pub fn occupied_cells(&self) -> u64 {
        (0..self.block_size as usize)
            .filter(|&i| self.counts.value(i) != 0)
            .count() as u64
    }

    /// Cardinality estimate from the counters alone
    pub fn estimated_item_count(&self) -> u64 {
        self.counts.estimated_count(self.config.hash_count)
    }

    /// Snapshot of the filter's state
    pub fn stats(&self) -> IbfStats {
        IbfStats {
            block_size: self.block_size,
            hash_count: self.config.hash_count,
            capacity: self.capacity,
            item_count: self.item_count,
            occupied_cells: self.occupied_cells(),
            saturated: self.saturated,
        }
    }

    /// Hash that drives this filter's positions for a record
    ///
    /// The value axis folds the identifier hash in so that records sharing
    /// a value spread over distinct cells; a changed value still moves the
    /// record to fresh positions, which is what surfaces modifications.
    fn entry_hash(&self, id: u64, value_hash: u32) -> u32 {
        if self.is_reverse {
            let h = id_hash(id, self.config.hash_seed) ^ value_hash;
            if h == 0 {
                1
            } else {
                h
            }
        } else {
            id_hash(id, self.config.hash_seed)
        }
    }

    fn apply_entry(&mut self, stored_id: u64, entry_hash: u32, add: bool) {
        for p in probe_positions(entry_hash, self.config.hash_count as usize, self.block_size) {
            let i = p as usize;
            let clamped = if add {
                self.counts.increase(i)
            } else {
                self.counts.decrease(i)
            };
            if clamped {
                self.saturated = true;
            }
            self.id_sums[i] ^= stored_id;
            self.hash_sums[i] ^= entry_hash;
        }
    }

    /// Add a record
    pub fn add(&mut self, id: u64, value: &[u8]) {
        self.add_hashed(id, value_hash(value, self.config.hash_seed));
    }

    /// Add a record whose value hash was computed by the caller
    pub fn add_hashed(&mut self, id: u64, value_hash: u32) {
        let h = self.entry_hash(id, value_hash);
        self.apply_entry(encode_id(id), h, true);
        self.item_count += 1;
    }

    /// Remove a record
    pub fn remove(&mut self, id: u64, value: &[u8]) {
        self.remove_hashed(id, value_hash(value, self.config.hash_seed));
    }

    /// Remove a record whose value hash was computed by the caller
    pub fn remove_hashed(&mut self, id: u64, value_hash: u32) {
        let h = self.entry_hash(id, value_hash);
        self.apply_entry(encode_id(id), h, false);
        self.item_count -= 1;
    }

    /// Remove a record by identifier alone
    ///
    /// Only key-axis filters position records by identifier; a value-axis
    /// filter cannot locate a record without its value hash.
    ///
    /// # Errors
    /// Returns `InvalidParameter` on a value-axis filter.
    pub fn remove_key(&mut self, id: u64) -> Result<()> {
        if self.is_reverse {
            return Err(ReconError::InvalidParameter {
                param: "is_reverse".to_string(),
                value: "true".to_string(),
                constraint: "remove_key requires a key-axis filter".to_string(),
            });
        }
        let h = id_hash(id, self.config.hash_seed);
        self.apply_entry(encode_id(id), h, false);
        self.item_count -= 1;
        Ok(())
    }

    /// Probabilistic membership test
    ///
    /// A zero counter at any probe position rules the record out; a pure
    /// cell holding a different identifier does too. False positives occur
    /// at the usual Bloom rate for the filter's load.
    pub fn contains(&self, id: u64, value: &[u8]) -> bool {
        self.contains_hashed(id, value_hash(value, self.config.hash_seed))
    }

    /// Membership test with a caller-computed value hash
    pub fn contains_hashed(&self, id: u64, value_hash: u32) -> bool {
        let h = self.entry_hash(id, value_hash);
        let stored = encode_id(id);
        for p in probe_positions(h, self.config.hash_count as usize, self.block_size) {
            let i = p as usize;
            if self.counts.value(i) == 0 {
                return false;
            }
            if self.counts.is_pure(i) && self.id_sums[i] != stored {
                return false;
            }
        }
        true
    }

    /// Block size both operands can be folded to, or the reason they cannot
    fn common_block_size(&self, other: &Ibf) -> Result<u64> {
        if self.config.hash_count != other.config.hash_count {
            return Err(ReconError::IncompatibleSketches {
                reason: format!(
                    "Different hash counts: {} vs {}",
                    self.config.hash_count, other.config.hash_count
                ),
            });
        }
        if self.is_reverse != other.is_reverse {
            return Err(ReconError::IncompatibleSketches {
                reason: "Cannot combine key-axis and value-axis filters".to_string(),
            });
        }
        let target = gcd(self.block_size, other.block_size);
        if target < u64::from(self.config.hash_count) {
            return Err(ReconError::IncompatibleSketches {
                reason: format!(
                    "Block sizes {} and {} share no usable fold ({} common cells)",
                    self.block_size, other.block_size, target
                ),
            });
        }
        Ok(target)
    }

    fn folded_to(&self, target: u64) -> Result<Ibf> {
        if self.block_size == target {
            Ok(self.clone())
        } else {
            self.fold(self.block_size / target)
        }
    }

    /// Subtract another compatible filter, allocating the result
    ///
    /// Operands of different block sizes are folded to their common size
    /// first. Records present in both filters cancel; the result is what the
    /// decoder consumes.
    ///
    /// # Errors
    /// Returns `IncompatibleSketches` when the filters cannot be aligned.
    pub fn subtract(&self, other: &Ibf) -> Result<Ibf> {
        self.subtract_with_capture(other, None)
    }

    /// Subtract another compatible filter into `self`
    ///
    /// The destructive form: this filter's arrays are reused where the block
    /// sizes already agree.
    ///
    /// # Errors
    /// Returns `IncompatibleSketches` when the filters cannot be aligned.
    pub fn subtract_in_place(&mut self, other: &Ibf) -> Result<()> {
        let target = self.common_block_size(other)?;
        if self.block_size == target
            && other.block_size == target
            && self.counts.kind() == other.counts.kind()
        {
            for i in 0..target as usize {
                let diff = self.counts.value(i) - other.counts.value(i);
                if self.counts.set(i, diff) {
                    self.saturated = true;
                }
                self.id_sums[i] ^= other.id_sums[i];
                self.hash_sums[i] ^= other.hash_sums[i];
            }
            self.item_count -= other.item_count;
            self.saturated |= other.saturated;
            return Ok(());
        }
        *self = self.subtract_with_capture(other, None)?;
        Ok(())
    }

    fn subtract_with_capture(
        &self,
        other: &Ibf,
        capture: Option<&mut DifferenceSets>,
    ) -> Result<Ibf> {
        let target = self.common_block_size(other)?;
        let a = self.folded_to(target)?;
        let b = other.folded_to(target)?;

        let kind = a.counts.kind().max(b.counts.kind());
        let mut counts = CountSlots::new(kind, target as usize);
        let mut id_sums = vec![0u64; target as usize];
        let mut hash_sums = vec![0u32; target as usize];
        let mut saturated = a.saturated || b.saturated;

        // Pure cells on both sides holding different singletons cannot
        // cancel cell-wise; capture both so they can be fully cancelled
        // after the pass.
        let mut captured_a: Vec<(u64, u32)> = Vec::new();
        let mut captured_b: Vec<(u64, u32)> = Vec::new();
        let mut seen_a: HashSet<u64> = HashSet::new();
        let mut seen_b: HashSet<u64> = HashSet::new();

        for i in 0..target as usize {
            let diff = a.counts.value(i) - b.counts.value(i);
            if counts.set(i, diff) {
                saturated = true;
            }
            id_sums[i] = a.id_sums[i] ^ b.id_sums[i];
            hash_sums[i] = a.hash_sums[i] ^ b.hash_sums[i];

            if capture.is_some()
                && a.counts.value(i) == 1
                && b.counts.value(i) == 1
                && a.cell_is_pure(i)
                && b.cell_is_pure(i)
                && (id_sums[i] != 0 || hash_sums[i] != 0)
            {
                if seen_a.insert(a.id_sums[i]) {
                    captured_a.push((a.id_sums[i], a.hash_sums[i]));
                }
                if seen_b.insert(b.id_sums[i]) {
                    captured_b.push((b.id_sums[i], b.hash_sums[i]));
                }
            }
        }

        let mut result = Ibf {
            config: IbfConfig {
                count_kind: kind,
                ..a.config
            },
            block_size: target,
            capacity: target,
            item_count: a.item_count - b.item_count,
            is_reverse: a.is_reverse,
            counts,
            id_sums,
            hash_sums,
            saturated,
        };

        if let Some(sets) = capture {
            for (stored, h) in captured_a {
                result.apply_entry(stored, h, false);
                sets.only_in_a.insert(decode_id(stored));
            }
            for (stored, h) in captured_b {
                result.apply_entry(stored, h, true);
                sets.only_in_b.insert(decode_id(stored));
            }
        }

        Ok(result)
    }

    /// Subtract and decode in one step
    ///
    /// Enables the pure-pair capture during subtraction, then peels the
    /// result. Returns `Ok(true)` when the peel fully resolved.
    ///
    /// # Errors
    /// Returns `IncompatibleSketches` when the filters cannot be aligned.
    pub fn subtract_and_decode(&self, other: &Ibf, sets: &mut DifferenceSets) -> Result<bool> {
        let mut diff = self.subtract_with_capture(other, Some(sets))?;
        Ok(diff.decode(sets).is_success())
    }

    /// Cell-wise addition of another compatible filter
    ///
    /// Counts add, sums XOR, item counts sum. Operands of different block
    /// sizes are folded to their common size first.
    ///
    /// # Errors
    /// Returns `IncompatibleSketches` when the filters cannot be aligned.
    pub fn add_sketch(&mut self, other: &Ibf) -> Result<()> {
        let target = self.common_block_size(other)?;
        let mut a = self.folded_to(target)?;
        let b = other.folded_to(target)?;
        for i in 0..target as usize {
            let sum = a.counts.value(i) + b.counts.value(i);
            if a.counts.set(i, sum) {
                a.saturated = true;
            }
            a.id_sums[i] ^= b.id_sums[i];
            a.hash_sums[i] ^= b.hash_sums[i];
        }
        a.item_count += b.item_count;
        a.saturated |= b.saturated;
        *self = a;
        Ok(())
    }

    /// Fold to `block_size / factor` cells by XOR-summing stripes
    ///
    /// # Errors
    /// Returns `InvalidFoldFactor` when the factor is zero, does not divide
    /// the block size, or would leave fewer cells than hash functions.
    pub fn fold(&self, factor: u64) -> Result<Ibf> {
        if factor == 0 || self.block_size % factor != 0 {
            return Err(ReconError::InvalidFoldFactor {
                factor,
                block_size: self.block_size,
            });
        }
        let target = self.block_size / factor;
        if target < u64::from(self.config.hash_count) {
            return Err(ReconError::InvalidFoldFactor {
                factor,
                block_size: self.block_size,
            });
        }

        let mut counts = CountSlots::new(self.counts.kind(), target as usize);
        let mut id_sums = vec![0u64; target as usize];
        let mut hash_sums = vec![0u32; target as usize];
        let mut saturated = self.saturated;

        for i in 0..self.block_size as usize {
            let t = i % target as usize;
            let sum = counts.value(t) + self.counts.value(i);
            if counts.set(t, sum) {
                saturated = true;
            }
            id_sums[t] ^= self.id_sums[i];
            hash_sums[t] ^= self.hash_sums[i];
        }

        Ok(Ibf {
            config: self.config,
            block_size: target,
            capacity: self.capacity / factor,
            item_count: self.item_count,
            is_reverse: self.is_reverse,
            counts,
            id_sums,
            hash_sums,
            saturated,
        })
    }

    /// Fold by the divisor the folding strategy chooses, if any
    ///
    /// Identity clone when no usable divisor exists.
    pub fn compress(&self) -> Ibf {
        if let Some(factor) = self
            .config
            .folding
            .fold_factor(self.block_size, self.capacity, self.item_count)
        {
            if let Ok(folded) = self.fold(factor) {
                return folded;
            }
        }
        self.clone()
    }

    fn cell_is_identity(&self, i: usize) -> bool {
        self.counts.value(i) == 0 && self.id_sums[i] == 0 && self.hash_sums[i] == 0
    }

    fn cell_is_pure(&self, i: usize) -> bool {
        if !self.counts.is_pure(i) {
            return false;
        }
        if self.is_reverse {
            // no recomputable checksum on the value axis
            self.id_sums[i] != 0 && self.hash_sums[i] != 0
        } else {
            self.hash_sums[i] == id_hash(decode_id(self.id_sums[i]), self.config.hash_seed)
        }
    }

    /// Peel this (usually post-subtract) filter into difference sets
    ///
    /// Destructive: cells are consumed as records are extracted. Positive
    /// singletons land in `only_in_a`, negative ones in `only_in_b`. On a
    /// value-axis filter, records whose identifier surfaces with two
    /// different hash sums are classified as modified, and a final scan
    /// reclassifies count-zero residue cells whose identifier was already
    /// extracted.
    ///
    /// Returns [`DecodeOutcome::Failure`] when non-pure, non-identity cells
    /// remain; the sets filled so far stay valid but incomplete.
    pub fn decode(&mut self, sets: &mut DifferenceSets) -> DecodeOutcome {
        let m = self.block_size as usize;
        let k = self.config.hash_count as usize;
        let track_modifications = self.is_reverse;

        let mut work: Vec<usize> = (0..m).filter(|&i| self.cell_is_pure(i)).collect();

        // A garbage singleton on the value axis can push the peel in
        // circles; bound the work so decoding stays deterministic.
        let mut steps = 0usize;
        let step_limit = (m + 1) * 16;
        let mut exhausted = false;

        while let Some(p) = work.pop() {
            steps += 1;
            if steps > step_limit {
                exhausted = true;
                break;
            }
            if !self.cell_is_pure(p) {
                continue;
            }

            let stored = self.id_sums[p];
            let h = self.hash_sums[p];
            let negative = self.counts.value(p) < 0;
            let mut modified = false;

            for q in probe_positions(h, k, self.block_size) {
                let q = q as usize;
                if track_modifications
                    && q != p
                    && self.cell_is_pure(q)
                    && self.id_sums[q] == stored
                    && self.hash_sums[q] != h
                {
                    // same identifier at two positions with different value
                    // hashes: the record was modified, not moved
                    let other_hash = self.hash_sums[q];
                    sets.modified.insert(decode_id(stored));
                    modified = true;
                    self.apply_cell(q, stored, other_hash, !negative);
                    if self.cell_is_pure(q) {
                        work.push(q);
                    }
                    continue;
                }

                self.apply_cell(q, stored, h, negative);
                if self.cell_is_pure(q) {
                    work.push(q);
                }
            }

            if !modified {
                if negative {
                    sets.only_in_b.insert(decode_id(stored));
                } else {
                    sets.only_in_a.insert(decode_id(stored));
                }
            }
        }

        if track_modifications {
            self.recover_modifications(sets);
            // the same identifier surfacing on both sides is a value change
            let both: Vec<u64> = sets
                .only_in_a
                .intersection(&sets.only_in_b)
                .copied()
                .collect();
            for id in both {
                sets.move_to_modified(id);
            }
        }

        if exhausted {
            return DecodeOutcome::Failure;
        }
        for i in 0..m {
            if !self.cell_is_pure(i) && !self.cell_is_identity(i) {
                return DecodeOutcome::Failure;
            }
        }
        DecodeOutcome::Success
    }

    /// Reverse (or apply) one record at one cell during the peel
    fn apply_cell(&mut self, i: usize, stored_id: u64, entry_hash: u32, add: bool) {
        let clamped = if add {
            self.counts.increase(i)
        } else {
            self.counts.decrease(i)
        };
        if clamped {
            self.saturated = true;
        }
        self.id_sums[i] ^= stored_id;
        self.hash_sums[i] ^= entry_hash;
    }

    /// Final scan of a value-axis peel: count-zero cells with non-identity
    /// sums are the residue of value changes whose occurrences partially
    /// overlapped; reclassify identifiers that were already extracted.
    fn recover_modifications(&mut self, sets: &mut DifferenceSets) {
        for i in 0..self.block_size as usize {
            if self.counts.value(i) != 0 {
                continue;
            }
            if self.id_sums[i] == 0 && self.hash_sums[i] == 0 {
                continue;
            }
            let id = decode_id(self.id_sums[i]);
            if self.id_sums[i] != 0
                && (sets.only_in_a.contains(&id)
                    || sets.only_in_b.contains(&id)
                    || sets.modified.contains(&id))
            {
                sets.move_to_modified(id);
                self.id_sums[i] = 0;
                self.hash_sums[i] = 0;
            }
        }
    }

    /// Serialize into the wire layout
    ///
    /// Layout (little-endian): hash count `u32`, reverse flag `u8`, block
    /// size `u64`, capacity `u64`, item count `i64`, counter width tag `u8`,
    /// the three cell arrays, then a sub-sketch presence byte (always 0 for
    /// a standalone filter).
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.write_into(&mut buf);
        buf.push(0);
        buf
    }

    pub(crate) fn write_into(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.config.hash_count.to_le_bytes());
        buf.push(u8::from(self.is_reverse));
        buf.extend_from_slice(&self.block_size.to_le_bytes());
        buf.extend_from_slice(&self.capacity.to_le_bytes());
        buf.extend_from_slice(&self.item_count.to_le_bytes());
        buf.push(self.counts.kind().width_tag());
        for i in 0..self.block_size as usize {
            match self.counts.kind() {
                CountKind::I8 => buf.extend_from_slice(&(self.counts.value(i) as i8).to_le_bytes()),
                CountKind::I16 => {
                    buf.extend_from_slice(&(self.counts.value(i) as i16).to_le_bytes());
                }
                CountKind::I32 => {
                    buf.extend_from_slice(&(self.counts.value(i) as i32).to_le_bytes());
                }
            }
        }
        for id in &self.id_sums {
            buf.extend_from_slice(&id.to_le_bytes());
        }
        for h in &self.hash_sums {
            buf.extend_from_slice(&h.to_le_bytes());
        }
    }

    /// Deserialize a standalone filter from the wire layout
    ///
    /// The configuration is the caller's side of the protocol agreement; its
    /// hash count must match the serialized one.
    ///
    /// # Errors
    /// Returns `DeserializationError` on truncated or inconsistent data.
    pub fn deserialize(config: IbfConfig, bytes: &[u8]) -> Result<Self> {
        validate_byte_size(bytes.len())?;
        let mut offset = 0;
        let ibf = Self::read_from(config, bytes, &mut offset)?;
        let sub = read_u8(bytes, &mut offset)?;
        if sub != 0 {
            return Err(ReconError::DeserializationError(
                "Unexpected sub-sketch on a standalone filter".to_string(),
            ));
        }
        if offset != bytes.len() {
            return Err(ReconError::DeserializationError(format!(
                "Trailing bytes after filter: {}",
                bytes.len() - offset
            )));
        }
        Ok(ibf)
    }

    pub(crate) fn read_from(config: IbfConfig, bytes: &[u8], offset: &mut usize) -> Result<Self> {
        let hash_count = read_u32(bytes, offset)?;
        if hash_count != config.hash_count {
            return Err(ReconError::DeserializationError(format!(
                "Hash count mismatch: serialized {}, configured {}",
                hash_count, config.hash_count
            )));
        }
        let is_reverse = match read_u8(bytes, offset)? {
            0 => false,
            1 => true,
            other => {
                return Err(ReconError::DeserializationError(format!(
                    "Invalid reverse flag {}",
                    other
                )))
            }
        };
        let block_size = read_u64(bytes, offset)?;
        validate_block_size(block_size, hash_count)?;
        let capacity = read_u64(bytes, offset)?;
        validate_capacity(capacity)?;
        let item_count = read_i64(bytes, offset)?;
        let kind = CountKind::from_width_tag(read_u8(bytes, offset)?)?;

        let m = block_size as usize;
        let width = kind.width_tag() as usize;
        validate_min_size(bytes.len(), *offset + m * (width + 12))?;

        let mut counts = CountSlots::new(kind, m);
        for i in 0..m {
            let v = match kind {
                CountKind::I8 => i64::from(bytes[*offset] as i8),
                CountKind::I16 => i64::from(i16::from_le_bytes(
                    bytes[*offset..*offset + 2].try_into().map_err(|_| {
                        ReconError::DeserializationError("Invalid count field".to_string())
                    })?,
                )),
                CountKind::I32 => i64::from(i32::from_le_bytes(
                    bytes[*offset..*offset + 4].try_into().map_err(|_| {
                        ReconError::DeserializationError("Invalid count field".to_string())
                    })?,
                )),
            };
            counts.set(i, v);
            *offset += width;
        }

        let mut id_sums = Vec::with_capacity(m);
        for _ in 0..m {
            id_sums.push(read_u64(bytes, offset)?);
        }
        let mut hash_sums = Vec::with_capacity(m);
        for _ in 0..m {
            hash_sums.push(read_u32(bytes, offset)?);
        }

        Ok(Ibf {
            config: IbfConfig {
                count_kind: kind,
                ..config
            },
            block_size,
            capacity,
            item_count,
            is_reverse,
            counts,
            id_sums,
            hash_sums,
            saturated: false,
        })
    }
}

impl Reconcilable for Ibf {
    fn subtract_in_place(&mut self, other: &Self) -> Result<()> {
        Ibf::subtract_in_place(self, other)
    }

    fn decode(&mut self, sets: &mut DifferenceSets) -> DecodeOutcome {
        Ibf::decode(self, sets)
    }

    fn subtract_and_decode(&self, other: &Self, sets: &mut DifferenceSets) -> Result<bool> {
        Ibf::subtract_and_decode(self, other, sets)
    }
}
