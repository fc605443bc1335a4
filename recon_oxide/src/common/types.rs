//! Common types shared by the filters and estimators

use std::collections::HashSet;

/// Classified symmetric difference between two key/value sets
///
/// Produced by the peeling decoder. Identifiers land in `only_in_a` or
/// `only_in_b` when the record exists on exactly one side, and in `modified`
/// when the identifier exists on both sides with different values.
///
/// # Example
/// ```
/// use recon_oxide::DifferenceSets;
///
/// let mut diff = DifferenceSets::new();
/// diff.only_in_a.insert(7);
/// diff.modified.insert(9);
/// assert_eq!(diff.total_changes(), 2);
/// assert!(!diff.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DifferenceSets {
    /// Identifiers present only in the left-hand set
    pub only_in_a: HashSet<u64>,

    /// Identifiers present only in the right-hand set
    pub only_in_b: HashSet<u64>,

    /// Identifiers present in both sets with differing values
    pub modified: HashSet<u64>,
}

impl DifferenceSets {
    /// Creates an empty difference
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if no differences were recorded
    pub fn is_empty(&self) -> bool {
        self.only_in_a.is_empty() && self.only_in_b.is_empty() && self.modified.is_empty()
    }

    /// Total number of recorded differences across all three classes
    pub fn total_changes(&self) -> usize {
        self.only_in_a.len() + self.only_in_b.len() + self.modified.len()
    }

    /// Reclassify an identifier as modified
    ///
    /// Removes it from both only-in sets (where a single-axis decode may have
    /// tentatively placed it) and records it as modified.
    pub fn move_to_modified(&mut self, id: u64) {
        self.only_in_a.remove(&id);
        self.only_in_b.remove(&id);
        self.modified.insert(id);
    }
}

/// Result of a peeling decode
///
/// Failure is an ordinary outcome, not an error: the difference sets filled
/// so far remain valid but incomplete, and the caller is expected to resize
/// and retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeOutcome {
    /// Every non-pure cell reached the identity state
    Success,
    /// The peel stalled with unresolved cells remaining
    Failure,
}

impl DecodeOutcome {
    /// Returns true for [`DecodeOutcome::Success`]
    pub fn is_success(self) -> bool {
        matches!(self, DecodeOutcome::Success)
    }

    /// Conjunction of two outcomes; failure dominates
    pub fn and(self, other: DecodeOutcome) -> DecodeOutcome {
        if self.is_success() && other.is_success() {
            DecodeOutcome::Success
        } else {
            DecodeOutcome::Failure
        }
    }
}
