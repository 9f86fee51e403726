//! Correctness checks for any [`KthStatistic`] over `i32`.
//!
//! Every check resizes the algorithm first, then compares each answer with a known
//! ground truth: a closed form for 0/1 sequences and permutations, [`HoareSelect`]
//! on an untouched copy for random input.

use std::fmt::Debug;

use log::info;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

use crate::{HoareSelect, KthStatistic, SelectError};

/// Inputs longer than this are reported by seed and attempt instead of by content.
const MAX_DUMP_LEN: usize = 100;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("[{test}, {algorithm}] size {size} is too large, at most {max} is supported")]
    TooLarge {
        test: &'static str,
        algorithm: String,
        size: usize,
        max: usize,
    },

    #[error("[{test}, {algorithm}] after resize the size is still too small ({capacity} while expecting at least {size})")]
    NotResized {
        test: &'static str,
        algorithm: String,
        size: usize,
        capacity: usize,
    },

    #[error("[{test}, {algorithm}] expected {expected}, found {found} on test with k = {k}, {input}")]
    Mismatch {
        test: &'static str,
        algorithm: String,
        k: usize,
        expected: String,
        found: String,
        input: String,
    },

    #[error("[{test}, {algorithm}] {source}")]
    Select {
        test: &'static str,
        algorithm: String,
        source: SelectError,
    },
}

/// Value layout of generated sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Workload {
    Uniform,
    Ascending,
    Descending,
}

impl Workload {
    pub const ALL: [Workload; 3] = [Workload::Uniform, Workload::Ascending, Workload::Descending];

    pub fn name(&self) -> &'static str {
        match self {
            Workload::Uniform => "uniform",
            Workload::Ascending => "ascending",
            Workload::Descending => "descending",
        }
    }

    /// Fills `data` with values drawn uniformly from `range`, sorted as the workload asks.
    pub fn fill<T>(&self, rng: &mut ChaCha8Rng, data: &mut [T], range: std::ops::Range<T>)
    where
        T: PartialOrd + Copy + rand::distr::uniform::SampleUniform,
    {
        for x in data.iter_mut() {
            *x = rng.random_range(range.clone());
        }
        match self {
            Workload::Uniform => {}
            Workload::Ascending => data.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal)),
            Workload::Descending => data.sort_unstable_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal)),
        }
    }
}

fn prepare<A>(algorithm: &mut A, size: usize, test: &'static str, max: usize) -> Result<(), ValidationError>
where
    A: KthStatistic<i32> + ?Sized,
{
    if size > max {
        return Err(ValidationError::TooLarge {
            test,
            algorithm: algorithm.name().to_string(),
            size,
            max,
        });
    }
    algorithm.resize(size);
    if algorithm.size() < size {
        return Err(ValidationError::NotResized {
            test,
            algorithm: algorithm.name().to_string(),
            size,
            capacity: algorithm.size(),
        });
    }
    Ok(())
}

fn run<A>(algorithm: &mut A, data: &mut [i32], k: usize, test: &'static str) -> Result<i32, ValidationError>
where
    A: KthStatistic<i32> + ?Sized,
{
    algorithm.find(data, k).map_err(|source| ValidationError::Select {
        test,
        algorithm: algorithm.name().to_string(),
        source,
    })
}

fn dump<T: Debug>(data: &[T]) -> String {
    format!("array {data:?}")
}

/// Every sequence of zeros and ones of length `size`, every `k`.
pub fn check_all_binary<A>(algorithm: &mut A, size: usize) -> Result<(), ValidationError>
where
    A: KthStatistic<i32> + ?Sized,
{
    const TEST: &str = "test_all_01s";
    prepare(algorithm, size, TEST, 30)?;

    let mut values = vec![0i32; size];
    for mask in 0u32..1 << size {
        let ones = mask.count_ones() as usize;
        for k in 0..size {
            for (i, v) in values.iter_mut().enumerate() {
                *v = ((mask >> i) & 1) as i32;
            }
            let found = run(algorithm, &mut values, k, TEST)?;
            let expected = (k + ones >= size) as i32;
            if found != expected {
                let input: Vec<i32> = (0..size).map(|i| ((mask >> i) & 1) as i32).collect();
                return Err(ValidationError::Mismatch {
                    test: TEST,
                    algorithm: algorithm.name().to_string(),
                    k,
                    expected: expected.to_string(),
                    found: found.to_string(),
                    input: dump(&input),
                });
            }
        }
    }
    Ok(())
}

/// Every permutation of `0..size`, every `k`; the answer is `k` itself.
pub fn check_all_permutations<A>(algorithm: &mut A, size: usize) -> Result<(), ValidationError>
where
    A: KthStatistic<i32> + ?Sized,
{
    const TEST: &str = "test_all_perms";
    prepare(algorithm, size, TEST, 10)?;

    let mut reference = Vec::with_capacity(size);
    let mut working = vec![0i32; size];
    permute(algorithm, size, 0, &mut reference, &mut working)
}

fn permute<A>(
    algorithm: &mut A,
    size: usize,
    used: u32,
    reference: &mut Vec<i32>,
    working: &mut [i32],
) -> Result<(), ValidationError>
where
    A: KthStatistic<i32> + ?Sized,
{
    const TEST: &str = "test_all_perms";
    if reference.len() == size {
        for k in 0..size {
            working.copy_from_slice(reference);
            let found = run(algorithm, working, k, TEST)?;
            if found != k as i32 {
                return Err(ValidationError::Mismatch {
                    test: TEST,
                    algorithm: algorithm.name().to_string(),
                    k,
                    expected: k.to_string(),
                    found: found.to_string(),
                    input: dump(reference.as_slice()),
                });
            }
        }
        return Ok(());
    }
    for v in 0..size {
        if used & (1 << v) == 0 {
            reference.push(v as i32);
            permute(algorithm, size, used | (1 << v), reference, working)?;
            reference.pop();
        }
    }
    Ok(())
}

/// `count` uniformly random sequences of length `size`, each with a random `k`.
pub fn check_random<A>(algorithm: &mut A, size: usize, count: usize, seed: u64) -> Result<(), ValidationError>
where
    A: KthStatistic<i32> + ?Sized,
{
    const TEST: &str = "test_random";
    prepare(algorithm, size, TEST, 10_000_000)?;

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut reference = vec![0i32; size];
    let mut working = vec![0i32; size];

    for attempt in 0..count {
        let k = rng.random_range(0..size);
        for x in reference.iter_mut() {
            *x = rng.random_range(i32::MIN..=i32::MAX);
        }
        working.copy_from_slice(&reference);
        let expected = HoareSelect::select(&mut working, k);

        working.copy_from_slice(&reference);
        let found = run(algorithm, &mut working, k, TEST)?;
        if found != expected {
            let input = if size <= MAX_DUMP_LEN {
                dump(&reference)
            } else {
                format!("seed {seed}, attempt {attempt}")
            };
            return Err(ValidationError::Mismatch {
                test: TEST,
                algorithm: algorithm.name().to_string(),
                k,
                expected: expected.to_string(),
                found: found.to_string(),
                input,
            });
        }
    }
    Ok(())
}

/// Runs the full battery. `scale` divides the number of random trials per size;
/// 1 reproduces the complete run of ten million elements per size.
pub fn check_all<A>(algorithm: &mut A, scale: usize) -> Result<(), ValidationError>
where
    A: KthStatistic<i32> + ?Sized,
{
    for size in 1..=16 {
        check_all_binary(algorithm, size)?;
    }
    info!("{}: test_all_01s OK", algorithm.name());

    for size in 1..=9 {
        check_all_permutations(algorithm, size)?;
    }
    info!("{}: test_all_perms OK", algorithm.name());

    let mut size = 10;
    for idx in 1..=6u64 {
        let count = (10_000_000 / size / scale.max(1)).max(1);
        check_random(algorithm, size, count, 87512451357632 * idx)?;
        size *= 10;
    }
    info!("{}: test_random OK", algorithm.name());
    Ok(())
}
