//! Count algebra for the invertible Bloom filter cells
//!
//! Each cell carries a bounded signed counter. All arithmetic saturates at
//! the representation bounds: a wrapped counter would silently corrupt the
//! XOR algebra, while a saturated one merely degrades purity detection and
//! is observable through the owning filter's `is_saturated` flag.
//!
//! The counter width is a runtime tag rather than a virtual configuration
//! object: the three widths cover lightly loaded filters (`I8`), the common
//! case (`I16`), and heavily loaded or repeatedly added sketches (`I32`).

use crate::common::{ReconError, Result};

/// Width tag for the cell counters of a filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CountKind {
    /// 8-bit signed counters
    I8,
    /// 16-bit signed counters
    I16,
    /// 32-bit signed counters
    I32,
}

impl CountKind {
    /// Byte width written into the serialized layout
    pub fn width_tag(self) -> u8 {
        match self {
            CountKind::I8 => 1,
            CountKind::I16 => 2,
            CountKind::I32 => 4,
        }
    }

    /// Inverse of [`CountKind::width_tag`]
    ///
    /// # Errors
    /// Returns `DeserializationError` for an unknown tag.
    pub fn from_width_tag(tag: u8) -> Result<Self> {
        match tag {
            1 => Ok(CountKind::I8),
            2 => Ok(CountKind::I16),
            4 => Ok(CountKind::I32),
            other => Err(ReconError::DeserializationError(format!(
                "Unknown count width tag {}",
                other
            ))),
        }
    }

    /// Largest representable counter value
    pub fn max_value(self) -> i64 {
        match self {
            CountKind::I8 => i64::from(i8::MAX),
            CountKind::I16 => i64::from(i16::MAX),
            CountKind::I32 => i64::from(i32::MAX),
        }
    }

    /// Smallest representable counter value
    pub fn min_value(self) -> i64 {
        match self {
            CountKind::I8 => i64::from(i8::MIN),
            CountKind::I16 => i64::from(i16::MIN),
            CountKind::I32 => i64::from(i32::MIN),
        }
    }

    /// Does this width accommodate the expected occupancy?
    ///
    /// The densest realistic cell sees a small multiple of the average load
    /// `capacity / size`; a 16x headroom keeps saturation rare at sane
    /// utilizations.
    pub fn supports(self, capacity: u64, size: u64) -> bool {
        let load = (capacity / size.max(1)) + 1;
        i64::try_from(load)
            .map(|l| l.saturating_mul(16) <= self.max_value())
            .unwrap_or(false)
    }

    /// Narrowest width whose range accommodates the expected occupancy
    pub fn for_occupancy(capacity: u64, size: u64) -> CountKind {
        for kind in [CountKind::I8, CountKind::I16, CountKind::I32] {
            if kind.supports(capacity, size) {
                return kind;
            }
        }
        CountKind::I32
    }
}

/// Parallel counter storage at a fixed width
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CountSlots {
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
}

impl CountSlots {
    pub(crate) fn new(kind: CountKind, len: usize) -> Self {
        match kind {
            CountKind::I8 => CountSlots::I8(vec![0; len]),
            CountKind::I16 => CountSlots::I16(vec![0; len]),
            CountKind::I32 => CountSlots::I32(vec![0; len]),
        }
    }

    pub(crate) fn kind(&self) -> CountKind {
        match self {
            CountSlots::I8(_) => CountKind::I8,
            CountSlots::I16(_) => CountKind::I16,
            CountSlots::I32(_) => CountKind::I32,
        }
    }

    pub(crate) fn len(&self) -> usize {
        match self {
            CountSlots::I8(v) => v.len(),
            CountSlots::I16(v) => v.len(),
            CountSlots::I32(v) => v.len(),
        }
    }

    /// Counter value widened to 64 bits
    pub(crate) fn value(&self, i: usize) -> i64 {
        match self {
            CountSlots::I8(v) => i64::from(v[i]),
            CountSlots::I16(v) => i64::from(v[i]),
            CountSlots::I32(v) => i64::from(v[i]),
        }
    }

    /// Store a widened value, clamping at the width bounds
    ///
    /// Returns true when the value saturated.
    pub(crate) fn set(&mut self, i: usize, value: i64) -> bool {
        let kind = self.kind();
        let clamped = value.clamp(kind.min_value(), kind.max_value());
        match self {
            CountSlots::I8(v) => v[i] = clamped as i8,
            CountSlots::I16(v) => v[i] = clamped as i16,
            CountSlots::I32(v) => v[i] = clamped as i32,
        }
        clamped != value
    }

    /// Saturating increment; returns true on saturation
    pub(crate) fn increase(&mut self, i: usize) -> bool {
        let v = self.value(i);
        self.set(i, v + 1)
    }

    /// Saturating decrement; returns true on saturation
    pub(crate) fn decrease(&mut self, i: usize) -> bool {
        let v = self.value(i);
        self.set(i, v - 1)
    }

    /// Purity predicate on the counter alone: `|count| == 1`
    pub(crate) fn is_pure(&self, i: usize) -> bool {
        self.value(i).abs() == 1
    }

    /// Estimated number of distinct items contributing to these counters
    ///
    /// The sum of absolute counter values counts every item `hash_count`
    /// times.
    pub(crate) fn estimated_count(&self, hash_count: u32) -> u64 {
        let total: u64 = (0..self.len()).map(|i| self.value(i).unsigned_abs()).sum();
        total / u64::from(hash_count.max(1))
    }
}
