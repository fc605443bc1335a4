//! Core traits for reconciliation sketches

use super::error::Result;
use super::types::{DecodeOutcome, DifferenceSets};

/// Trait for sketches that support set reconciliation
///
/// Set reconciliation computes the symmetric difference between two sets
/// from their sketches alone, without either side transmitting its full
/// contents. Implemented by [`Ibf`](crate::reconciliation::Ibf) and
/// [`KeyValueIbf`](crate::reconciliation::KeyValueIbf).
///
/// The canonical flow is `subtract_and_decode`: combine the local sketch
/// with the remote one, then peel the combined sketch into the three
/// difference classes. The split `subtract_in_place` / `decode` form exists
/// for callers that want to keep the subtracted sketch around (for folding,
/// serialization, or a later retry).
pub trait Reconcilable {
    /// Subtract another sketch from this one in place
    ///
    /// Afterwards this sketch represents the cell-wise difference; records
    /// present in both inputs have cancelled out.
    ///
    /// # Errors
    /// Returns [`ReconError::IncompatibleSketches`](crate::ReconError::IncompatibleSketches)
    /// when the sketches cannot be aligned.
    fn subtract_in_place(&mut self, other: &Self) -> Result<()>;

    /// Peel this (usually post-subtract) sketch into difference sets
    ///
    /// Destructive: the sketch's cells are consumed by the peel. Failure is
    /// an outcome value; whatever was extracted before the stall remains in
    /// `sets`.
    fn decode(&mut self, sets: &mut DifferenceSets) -> DecodeOutcome;

    /// Subtract and decode in one step, leaving this sketch untouched
    ///
    /// Returns `Ok(true)` when the peel fully resolved, `Ok(false)` when it
    /// stalled (partial results remain valid).
    ///
    /// # Errors
    /// Returns [`ReconError::IncompatibleSketches`](crate::ReconError::IncompatibleSketches)
    /// when the sketches cannot be aligned.
    fn subtract_and_decode(&self, other: &Self, sets: &mut DifferenceSets) -> Result<bool>;
}
