use thiserror::Error;

/// Precondition failures reported by selection algorithms and sample-size policies.
///
/// A failed prediction is not an error: predicting selectors fall back to direct
/// selection and only count the miss.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectError {
    #[error("index {k} is out of range for a sequence of length {len}")]
    IndexOutOfRange { k: usize, len: usize },

    #[error("sequence of length {len} exceeds the scratch capacity {capacity}, call resize first")]
    CapacityExceeded { len: usize, capacity: usize },

    #[error("sample-size policy returned phase 1 = {phase_1}, phase 2 = {phase_2} for length {len}")]
    InvalidSampleSizes {
        len: usize,
        phase_1: usize,
        phase_2: usize,
    },

    #[error("invalid {name}: {value}")]
    InvalidDivisor { name: &'static str, value: usize },
}
