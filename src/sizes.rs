//! Sample-size policies for [`PredictingSelector`](crate::PredictingSelector).
//!
//! A policy decides, from the sequence length alone, whether sampling is worth it
//! and how many elements go into each sampling phase. Keeping this apart from the
//! selector lets the sampling cost be tuned without touching the selection logic.

use crate::SelectError;

/// How many elements a predicting selector samples for a sequence of length `n`.
///
/// Implementations must keep `n_phase_2_samples(n, p) <= p`. Policies hold no
/// per-sequence state, so one instance can be shared by any number of selectors.
pub trait SampleSizes {
    /// Whether sampling pays off at length `n`. Below this, selectors go straight
    /// to direct selection.
    fn is_size_acceptable(&self, n: usize) -> bool;

    /// Number of evenly spaced elements drawn for the coarse estimate.
    fn n_phase_1_samples(&self, n: usize) -> usize;

    /// Width, in sample positions, of the window that bounds the value range.
    fn n_phase_2_samples(&self, n: usize, phase_1: usize) -> usize;
}

/// Samples every `phase_1_divisor`-th element and keeps a window of roughly
/// `1 / phase_2_divisor` of the sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedRatio {
    phase_1_divisor: usize,
    phase_2_divisor: usize,
}

impl FixedRatio {
    pub fn new(phase_1_divisor: usize, phase_2_divisor: usize) -> Result<Self, SelectError> {
        // A divisor of 1 would sample the whole sequence.
        if phase_1_divisor < 2 {
            return Err(SelectError::InvalidDivisor {
                name: "phase 1 divisor",
                value: phase_1_divisor,
            });
        }
        if phase_2_divisor == 0 {
            return Err(SelectError::InvalidDivisor {
                name: "phase 2 divisor",
                value: phase_2_divisor,
            });
        }
        Ok(Self {
            phase_1_divisor,
            phase_2_divisor,
        })
    }

    pub fn phase_1_divisor(&self) -> usize {
        self.phase_1_divisor
    }

    pub fn phase_2_divisor(&self) -> usize {
        self.phase_2_divisor
    }
}

impl SampleSizes for FixedRatio {
    fn is_size_acceptable(&self, n: usize) -> bool {
        n >= 2 * self.phase_1_divisor
    }

    fn n_phase_1_samples(&self, n: usize) -> usize {
        n / self.phase_1_divisor
    }

    fn n_phase_2_samples(&self, _n: usize, phase_1: usize) -> usize {
        phase_1.min(1 + phase_1 / self.phase_2_divisor)
    }
}

/// A divisor curve made of two power laws `mult * n^power`, one for small and one
/// for large `n`, joined by log-linear interpolation.
///
/// Values up to `hi_min` are tabulated once at construction; beyond that the
/// large-`n` law is evaluated directly.
#[derive(Debug, Clone, PartialEq)]
pub struct PowerCurve {
    hi_power: f64,
    hi_mult: f64,
    table: Vec<f64>,
}

impl PowerCurve {
    /// Builds the curve. Requires `1 <= lo_max < hi_min`.
    pub fn new(lo_power: f64, lo_mult: f64, lo_max: usize, hi_power: f64, hi_mult: f64, hi_min: usize) -> Self {
        assert!(1 <= lo_max && lo_max < hi_min, "power curve breakpoints out of order");

        let mut table = vec![0.0; hi_min + 1];
        for (n, slot) in table.iter_mut().enumerate().take(lo_max + 1).skip(1) {
            *slot = (n as f64).powf(lo_power) * lo_mult;
        }
        table[hi_min] = (hi_min as f64).powf(hi_power) * hi_mult;

        let log_lo_max = (lo_max as f64).ln();
        let log_hi_min = (hi_min as f64).ln();
        let log_lo_val = table[lo_max].ln();
        let log_hi_val = table[hi_min].ln();
        for n in lo_max + 1..hi_min {
            let x = ((n as f64).ln() - log_lo_max) / (log_hi_min - log_lo_max);
            table[n] = (log_lo_val + x * (log_hi_val - log_lo_val)).exp();
        }

        Self {
            hi_power,
            hi_mult,
            table,
        }
    }

    pub fn value(&self, n: usize) -> f64 {
        match self.table.get(n) {
            Some(&v) => v,
            None => (n as f64).powf(self.hi_power) * self.hi_mult,
        }
    }
}

/// Sample sizes fitted empirically so that the sampling ratio shrinks as `n` grows.
#[derive(Debug, Clone, PartialEq)]
pub struct TunedRatio {
    phase_1_curve: PowerCurve,
    phase_2_curve: PowerCurve,
}

impl TunedRatio {
    pub fn new() -> Self {
        Self::with_curves(
            PowerCurve::new(0.8, 0.63, 100, 1.0 / 3.0, 1.3, 1000),
            PowerCurve::new(0.9, 0.63, 100, 0.58, 1.29, 1000),
        )
    }

    /// `phase_1_curve` and `phase_2_curve` give the divisor applied to `n` for each phase.
    pub fn with_curves(phase_1_curve: PowerCurve, phase_2_curve: PowerCurve) -> Self {
        Self {
            phase_1_curve,
            phase_2_curve,
        }
    }
}

impl Default for TunedRatio {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleSizes for TunedRatio {
    fn is_size_acceptable(&self, n: usize) -> bool {
        n >= 10
    }

    fn n_phase_1_samples(&self, n: usize) -> usize {
        (n as f64 / self.phase_1_curve.value(n)) as usize
    }

    fn n_phase_2_samples(&self, n: usize, phase_1: usize) -> usize {
        let guess = 1 + (n as f64 / self.phase_2_curve.value(n)) as usize;
        guess.min(phase_1)
    }
}

/// Quarter-size sample with a window of an eighth of it.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimpleRatio;

impl SampleSizes for SimpleRatio {
    fn is_size_acceptable(&self, n: usize) -> bool {
        n >= 16
    }

    fn n_phase_1_samples(&self, n: usize) -> usize {
        n / 4
    }

    fn n_phase_2_samples(&self, _n: usize, phase_1: usize) -> usize {
        phase_1.min(1 + phase_1 / 8)
    }
}
