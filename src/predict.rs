//! Sampling-based selection.
//!
//! To find the k-th order statistic:
//! - take an evenly spaced sample of the sequence,
//! - pick two sample order statistics that should bracket the answer,
//! - copy the elements between them into a scratch buffer, counting the ones below,
//! - if the answer provably landed in the buffer, select there,
//! - otherwise fall back to direct selection on the whole sequence.
//!
//! A failed guess only costs time, never correctness.

use std::fmt;

use log::{debug, info, trace};

use crate::{HoareSelect, KthStatistic, SampleSizes, SelectError};

/// Running counters of a [`PredictingSelector`].
///
/// Calls rejected by the policy's size check are not counted.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Statistics {
    pub hits: usize,
    pub misses: usize,
    /// Total number of elements drawn in phase 1.
    pub phase_1_samples: usize,
    /// Total size of the filtered buffers selected from on hits.
    pub phase_2_samples: usize,
    pub below: usize,
    pub mid: usize,
    pub above: usize,
}

impl Statistics {
    pub fn calls(&self) -> usize {
        self.hits + self.misses
    }

    pub fn phase_1_average(&self) -> f64 {
        self.phase_1_samples as f64 / self.calls() as f64
    }

    pub fn phase_2_average(&self) -> f64 {
        self.phase_2_samples as f64 / self.hits as f64
    }
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[Hits: {}, misses: {}, phase 1 samples avg: {}, phase 2 samples avg: {}, below: {}, mid: {}, above: {}]",
            self.hits,
            self.misses,
            self.phase_1_average(),
            self.phase_2_average(),
            self.below,
            self.mid,
            self.above
        )
    }
}

/// Where `k` sits relative to the sampled positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Regime {
    Below,
    Mid,
    Above,
}

enum Prediction<T> {
    /// Candidates were copied to `mem[..len]`; `target` is `k` translated into them,
    /// if it could be.
    Filtered { len: usize, target: Option<usize> },
    /// The bracket collapsed to one value and counting showed it is the answer.
    Exact(T),
    Miss,
}

/// Selector that narrows the search with a sample before selecting.
///
/// Owns a scratch buffer sized by [`resize`](KthStatistic::resize) and borrows its
/// [`SampleSizes`] policy, so one policy can serve many selectors. A selector is
/// meant for one caller at a time; use one instance per thread.
pub struct PredictingSelector<'a, T, S: ?Sized> {
    name: String,
    capacity: usize,
    mem: Vec<T>,
    stats: Statistics,
    sizes: &'a S,
}

impl<'a, T: PartialOrd + Copy, S: SampleSizes + ?Sized> PredictingSelector<'a, T, S> {
    pub fn new(sizes: &'a S, initial_size: usize) -> Self {
        Self {
            name: "simple predicting kth".to_string(),
            capacity: initial_size,
            mem: Vec::with_capacity(initial_size),
            stats: Statistics::default(),
            sizes,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn statistics(&self) -> &Statistics {
        &self.stats
    }

    /// Returns the counters accumulated so far and starts over from zero.
    pub fn take_statistics(&mut self) -> Statistics {
        std::mem::take(&mut self.stats)
    }

    /// Logs the counters at info level and resets them.
    pub fn log_statistics(&mut self) {
        let stats = self.take_statistics();
        info!("{}: {}", self.name, stats);
    }

    fn predict_below(&mut self, data: &[T], k: usize, n_samples: usize, n_samples_2: usize) -> Prediction<T> {
        let upper = HoareSelect::select(&mut self.mem[..n_samples], n_samples_2 - 1);
        let len = filter_into(&mut self.mem, data, |x| x <= upper);
        // Everything dropped is above `upper`, so k keeps its meaning.
        Prediction::Filtered { len, target: Some(k) }
    }

    fn predict_above(&mut self, data: &[T], k: usize, n_samples: usize, n_samples_2: usize) -> Prediction<T> {
        let lower = HoareSelect::select(&mut self.mem[..n_samples], n_samples - n_samples_2);
        let len = filter_into(&mut self.mem, data, |x| x >= lower);
        Prediction::Filtered {
            len,
            target: len.checked_sub(data.len() - k),
        }
    }

    fn predict_mid(
        &mut self,
        data: &[T],
        k: usize,
        n_samples: usize,
        n_samples_2: usize,
        proportion: usize,
        offset_from_below: usize,
    ) -> Prediction<T> {
        let expected = (k - offset_from_below) / proportion;
        let (lo, hi) = window(expected, n_samples, n_samples_2);

        let samples = &mut self.mem[..n_samples];
        let lower = HoareSelect::select(samples, lo);
        let upper = if hi == lo {
            lower
        } else {
            HoareSelect::select(&mut samples[lo + 1..], hi - lo - 1)
        };

        // Trim both ends of elements that are certainly outside [lower, upper]. Both
        // scans stop at the latest on the element `lower` was sampled from.
        let mut first = 0;
        let mut last = data.len() - 1;
        let mut k_change = 0;
        while data[first] < lower {
            first += 1;
            k_change += 1;
        }
        while data[first] > upper {
            first += 1;
        }
        while data[last] < lower {
            last -= 1;
            k_change += 1;
        }
        while data[last] > upper {
            last -= 1;
        }

        let Some(k_mod) = k.checked_sub(k_change) else {
            return Prediction::Miss;
        };
        let Some(span) = data.get(first..=last) else {
            return Prediction::Miss;
        };

        if lower == upper {
            // Nothing to narrow down further, count instead.
            let (less, equal) = span.iter().fold((0, 0), |(less, equal), &x| {
                (less + (x < lower) as usize, equal + (x == lower) as usize)
            });
            return if k_mod >= less && k_mod < less + equal {
                Prediction::Exact(lower)
            } else {
                Prediction::Miss
            };
        }

        let mut len = 0;
        let mut below = 0;
        for &x in span {
            self.mem[len] = x;
            let is_lower = x < lower;
            below += is_lower as usize;
            len += (!is_lower && x <= upper) as usize;
        }
        Prediction::Filtered {
            len,
            target: k_mod.checked_sub(below),
        }
    }
}

/// Inclusive range of `n_samples_2` sample positions centred on `expected`.
///
/// A window sticking out of `0..n_samples` is shifted back inside, never narrowed.
/// Requires `1 <= n_samples_2 <= n_samples`.
fn window(expected: usize, n_samples: usize, n_samples_2: usize) -> (usize, usize) {
    let (mut lo, mut hi) = match expected.checked_sub(n_samples_2 / 2) {
        Some(lo) => (lo, lo + n_samples_2 - 1),
        None => (0, n_samples_2 - 1),
    };
    if hi >= n_samples {
        hi = n_samples - 1;
        lo = hi + 1 - n_samples_2;
    }
    (lo, hi)
}

/// Copies the elements of `src` accepted by `keep` to the front of `mem` and returns
/// how many there are. `mem` must be at least as long as `src`.
fn filter_into<T: Copy>(mem: &mut [T], src: &[T], keep: impl Fn(T) -> bool) -> usize {
    let mut end = 0;
    for &x in src {
        mem[end] = x;
        end += keep(x) as usize;
    }
    end
}

impl<T: PartialOrd + Copy, S: SampleSizes + ?Sized> KthStatistic<T> for PredictingSelector<'_, T, S> {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_inplace(&self) -> bool {
        false
    }

    fn is_destructive(&self) -> bool {
        // Filtering works on copies; only the fallback reorders the input.
        false
    }

    fn size(&self) -> usize {
        self.capacity
    }

    fn resize(&mut self, new_size: usize) {
        if self.capacity != new_size {
            self.mem = Vec::with_capacity(new_size);
            self.capacity = new_size;
        }
    }

    fn find(&mut self, data: &mut [T], k: usize) -> Result<T, SelectError> {
        let n = data.len();
        if k >= n {
            return Err(SelectError::IndexOutOfRange { k, len: n });
        }
        if n > self.capacity {
            return Err(SelectError::CapacityExceeded {
                len: n,
                capacity: self.capacity,
            });
        }
        if !self.sizes.is_size_acceptable(n) {
            return Ok(HoareSelect::select(data, k));
        }

        let n_samples = self.sizes.n_phase_1_samples(n);
        let n_samples_2 = self.sizes.n_phase_2_samples(n, n_samples);
        if n_samples == 0 || n_samples >= n || n_samples_2 == 0 || n_samples_2 > n_samples {
            return Err(SelectError::InvalidSampleSizes {
                len: n,
                phase_1: n_samples,
                phase_2: n_samples_2,
            });
        }

        // Stays within the capacity reserved by `resize`.
        if self.mem.len() < n {
            self.mem.resize(n, data[0]);
        }

        let proportion = n / n_samples;
        let offset_from_below = (n - (n_samples - 1) * proportion + 1) / 2;
        debug_assert!(offset_from_below + (n_samples - 1) * proportion < n);
        for (slot, &x) in self.mem[..n_samples]
            .iter_mut()
            .zip(data[offset_from_below..].iter().step_by(proportion))
        {
            *slot = x;
        }
        self.stats.phase_1_samples += n_samples;

        let regime = if k < offset_from_below {
            Regime::Below
        } else if n - k < offset_from_below {
            Regime::Above
        } else {
            Regime::Mid
        };
        trace!(
            "{}: n = {n}, k = {k}, phase 1 = {n_samples}, phase 2 = {n_samples_2}, {regime:?}",
            self.name
        );

        let prediction = match regime {
            Regime::Below => {
                self.stats.below += 1;
                self.predict_below(data, k, n_samples, n_samples_2)
            }
            Regime::Above => {
                self.stats.above += 1;
                self.predict_above(data, k, n_samples, n_samples_2)
            }
            Regime::Mid => {
                self.stats.mid += 1;
                self.predict_mid(data, k, n_samples, n_samples_2, proportion, offset_from_below)
            }
        };

        match prediction {
            Prediction::Exact(value) => {
                self.stats.hits += 1;
                Ok(value)
            }
            Prediction::Filtered {
                len,
                target: Some(target),
            } if target < len => {
                self.stats.hits += 1;
                self.stats.phase_2_samples += len;
                Ok(HoareSelect::select(&mut self.mem[..len], target))
            }
            _ => {
                self.stats.misses += 1;
                debug!("{}: prediction missed for n = {n}, k = {k} ({regime:?})", self.name);
                Ok(HoareSelect::select(data, k))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::prelude::*;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::{FixedRatio, SimpleRatio, TunedRatio};

    fn expected(data: &[i32], k: usize) -> i32 {
        let mut copy = data.to_vec();
        HoareSelect::select(&mut copy, k)
    }

    #[test]
    fn test_scenarios() {
        // Smallest policy that samples a six element sequence: 3 samples, window of 3.
        let sizes = FixedRatio::new(2, 1).unwrap();
        let mut selector = PredictingSelector::new(&sizes, 6);

        for (k, answer) in [(2, 3), (0, 1), (5, 9)] {
            let mut data = vec![5, 3, 8, 1, 9, 2];
            assert_eq!(selector.find(&mut data, k), Ok(answer));
        }
        let stats = selector.take_statistics();
        assert_eq!((stats.below, stats.mid, stats.above), (1, 2, 0));
        // 9 lies above every sample, so the last call falls back.
        assert_eq!((stats.hits, stats.misses), (2, 1));
        assert_eq!(stats.phase_1_samples, 9);

        let mut data = vec![4, 4, 4, 2, 4];
        assert_eq!(selector.find(&mut data, 1), Ok(4));
        assert_eq!(selector.statistics().hits, 1);
    }

    #[test]
    fn test_small_sizes_skip_sampling() {
        let sizes = TunedRatio::new();
        let mut selector = PredictingSelector::new(&sizes, 9);
        let mut data = vec![9, 8, 7, 6, 5, 4, 3, 2, 1];
        assert_eq!(selector.find(&mut data, 4), Ok(5));
        assert_eq!(*selector.statistics(), Statistics::default());
    }

    #[test]
    fn test_regimes() {
        let sizes = FixedRatio::new(10, 10).unwrap();
        let mut selector = PredictingSelector::new(&sizes, 1000);
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        let mut reference: Vec<i32> = (0..1000).collect();
        reference.shuffle(&mut rng);

        // 100 samples spaced 10 apart starting at 5: k < 5 is below, k > 995 above.
        for k in [0, 4, 5, 500, 995, 996, 999] {
            let mut data = reference.clone();
            assert_eq!(selector.find(&mut data, k), Ok(k as i32));
        }
        let stats = selector.take_statistics();
        assert_eq!((stats.below, stats.mid, stats.above), (2, 3, 2));
        assert_eq!(stats.calls(), 7);
    }

    #[test]
    fn test_window_shifts_without_shrinking() {
        // Centred, clear of both ends.
        assert_eq!(window(50, 100, 11), (45, 55));
        // Off the low end.
        assert_eq!(window(2, 100, 11), (0, 10));
        assert_eq!(window(0, 100, 11), (0, 10));
        // Off the high end, including an estimate past the last sample.
        assert_eq!(window(97, 100, 11), (89, 99));
        assert_eq!(window(130, 100, 11), (89, 99));
        // Window as wide as the sample.
        assert_eq!(window(0, 7, 7), (0, 6));
        assert_eq!(window(3, 7, 7), (0, 6));
        assert_eq!(window(6, 7, 7), (0, 6));
        // Single position.
        assert_eq!(window(0, 5, 1), (0, 0));
        assert_eq!(window(4, 5, 1), (4, 4));
        assert_eq!(window(9, 5, 1), (4, 4));

        for n_samples in 1..40 {
            for n_samples_2 in 1..=n_samples {
                for expected in 0..n_samples + 5 {
                    let (lo, hi) = window(expected, n_samples, n_samples_2);
                    assert_eq!(hi - lo + 1, n_samples_2, "expected = {expected}, {n_samples}/{n_samples_2}");
                    assert!(hi < n_samples);
                }
            }
        }
    }

    #[test]
    fn test_forced_miss_with_distinct_samples() {
        let sizes = FixedRatio::new(10, 10).unwrap();
        let mut selector = PredictingSelector::new(&sizes, 1000);
        // Sampled positions hold small values, everything else is far larger, so the
        // sample badly underestimates the median.
        let reference: Vec<i32> = (0..1000)
            .map(|i| if i % 10 == 5 { i } else { 10_000 + i })
            .collect();

        let mut data = reference.clone();
        assert_eq!(selector.find(&mut data, 500), Ok(expected(&reference, 500)));
        let stats = selector.statistics();
        assert_eq!((stats.mid, stats.hits, stats.misses), (1, 0, 1));
    }

    #[test]
    fn test_forced_miss_with_equal_samples() {
        let sizes = FixedRatio::new(10, 10).unwrap();
        let mut selector = PredictingSelector::new(&sizes, 1000);
        let reference: Vec<i32> = (0..1000).map(|i| if i % 10 == 5 { 0 } else { 1000 + i }).collect();

        let mut data = reference.clone();
        assert_eq!(selector.find(&mut data, 500), Ok(expected(&reference, 500)));
        assert_eq!(selector.statistics().misses, 1);

        // Within the run of zeros the count settles it without a fallback.
        let mut data = reference.clone();
        assert_eq!(selector.find(&mut data, 50), Ok(0));
        assert_eq!(selector.statistics().hits, 1);
    }

    #[test]
    fn test_all_equal() {
        let sizes = TunedRatio::new();
        let mut selector = PredictingSelector::new(&sizes, 1000);
        for k in 0..1000 {
            let mut data = vec![7u64; 1000];
            assert_eq!(selector.find(&mut data, k), Ok(7));
        }
        let stats = selector.statistics();
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.hits, 1000);
    }

    #[test]
    fn test_random_against_hoare() {
        let sizes = TunedRatio::new();
        let mut selector = PredictingSelector::new(&sizes, 1);
        let mut rng = ChaCha8Rng::seed_from_u64(87512451357632);
        for len in [10usize, 57, 100, 1000, 10_000] {
            selector.resize(len);
            for _ in 0..50 {
                let k = rng.random_range(0..len);
                let reference: Vec<i32> = (0..len).map(|_| rng.random_range(-1000..=1000)).collect();
                let mut data = reference.clone();
                assert_eq!(selector.find(&mut data, k), Ok(expected(&reference, k)), "len = {len}, k = {k}");
            }
        }
        assert!(selector.statistics().hits > 0);
    }

    #[test]
    fn test_floats() {
        let sizes = SimpleRatio;
        let mut selector = PredictingSelector::new(&sizes, 64);
        let mut data: Vec<f64> = (0..64).map(|i| ((i * 37) % 64) as f64 / 8.0).collect();
        assert_eq!(selector.find(&mut data, 10), Ok(1.25));
    }

    #[test]
    fn test_preconditions() {
        let sizes = SimpleRatio;
        let mut selector = PredictingSelector::new(&sizes, 10);
        let mut data = vec![0; 20];
        assert_eq!(
            selector.find(&mut data, 3),
            Err(SelectError::CapacityExceeded { len: 20, capacity: 10 })
        );
        let mut data = vec![0; 5];
        assert_eq!(
            selector.find(&mut data, 5),
            Err(SelectError::IndexOutOfRange { k: 5, len: 5 })
        );
    }

    struct Broken;

    impl SampleSizes for Broken {
        fn is_size_acceptable(&self, _n: usize) -> bool {
            true
        }

        fn n_phase_1_samples(&self, n: usize) -> usize {
            n / 4
        }

        fn n_phase_2_samples(&self, _n: usize, phase_1: usize) -> usize {
            phase_1 + 1
        }
    }

    #[test]
    fn test_policy_violation_is_rejected() {
        let mut selector = PredictingSelector::new(&Broken, 100);
        let mut data: Vec<i32> = (0..100).collect();
        assert_eq!(
            selector.find(&mut data, 50),
            Err(SelectError::InvalidSampleSizes {
                len: 100,
                phase_1: 25,
                phase_2: 26
            })
        );
    }

    #[test]
    fn test_resize_is_idempotent() {
        let sizes = TunedRatio::new();
        let mut selector: PredictingSelector<'_, i32, _> = PredictingSelector::new(&sizes, 1);
        selector.resize(500);
        selector.resize(500);
        assert_eq!(selector.size(), 500);

        let reference: Vec<i32> = (0..500).rev().collect();
        let mut data = reference.clone();
        assert_eq!(selector.find(&mut data, 123), Ok(123));

        selector.resize(100);
        assert_eq!(selector.size(), 100);
    }

    #[test]
    fn test_statistics_display_and_reset() {
        let sizes = FixedRatio::new(2, 1).unwrap();
        let mut selector: PredictingSelector<'_, i32, _> = PredictingSelector::new(&sizes, 6).with_name("fixed");
        assert_eq!(selector.name(), "fixed");

        let mut data = vec![5, 3, 8, 1, 9, 2];
        selector.find(&mut data, 2).unwrap();
        assert_eq!(
            selector.statistics().to_string(),
            "[Hits: 1, misses: 0, phase 1 samples avg: 3, phase 2 samples avg: 3, below: 0, mid: 1, above: 0]"
        );

        selector.log_statistics();
        assert_eq!(*selector.statistics(), Statistics::default());
    }
}
