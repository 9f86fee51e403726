//! k-th order statistic selection without a full sort.
//!
//! Two algorithms share the [`KthStatistic`] interface:
//! - [`HoareSelect`]: in-place quickselect, the always-correct baseline.
//! - [`PredictingSelector`]: samples the sequence, guesses a narrow value range that
//!   should contain the answer, filters into its own scratch buffer and selects there,
//!   falling back to [`HoareSelect`] on the whole sequence when the guess misses.
//!
//! How much a predicting selector samples is decided by a [`SampleSizes`] policy.
pub mod error;
pub mod predict;
pub mod select;
pub mod sizes;
pub mod validate;

pub use error::SelectError;
pub use predict::{PredictingSelector, Statistics};
pub use select::HoareSelect;
pub use sizes::{FixedRatio, PowerCurve, SampleSizes, SimpleRatio, TunedRatio};

/// A selection algorithm that finds the element which would sit at index `k` if the
/// sequence were sorted.
pub trait KthStatistic<T> {
    /// Diagnostic name.
    fn name(&self) -> &str;

    /// Whether the algorithm works without scratch memory.
    fn is_inplace(&self) -> bool;

    /// Whether `find` may overwrite elements instead of only permuting them. Callers
    /// that need the input afterwards must copy it first either way.
    fn is_destructive(&self) -> bool;

    /// Largest sequence length `find` currently accepts.
    fn size(&self) -> usize;

    /// Prepares scratch space for sequences of up to `new_size` elements. Repeating
    /// the current size is free.
    fn resize(&mut self, new_size: usize);

    /// Returns the k-th smallest element of `data`, reordering `data` as it goes.
    ///
    /// Fails if `k >= data.len()` or `data.len() > self.size()`.
    fn find(&mut self, data: &mut [T], k: usize) -> Result<T, SelectError>;
}
