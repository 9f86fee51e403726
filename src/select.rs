use crate::{KthStatistic, SelectError};

/// Quickselect with bidirectional Hoare partitioning around the middle element.
///
/// This is the direct selection primitive: it works in place, needs no scratch
/// memory, and is always correct. Elements equal to the pivot may end up on either
/// side of a partition, which keeps duplicate-heavy inputs from degrading the
/// split. Expected time is linear, worst case is quadratic.
#[derive(Debug, Default, Clone, Copy)]
pub struct HoareSelect;

impl HoareSelect {
    pub fn new() -> Self {
        Self
    }

    /// Hoare partition of `data[from..=to]` around the value at its middle index.
    ///
    /// Returns `(lower_end, upper_start)`: afterwards every element of
    /// `data[from..lower_end]` is `<= pivot`, every element of `data[upper_start..=to]`
    /// is `>= pivot`, and anything in between equals the pivot. `lower_end` may be
    /// equal to `from` when the lower side is empty.
    fn partition<T: PartialOrd + Copy>(data: &mut [T], from: usize, to: usize) -> (usize, usize) {
        let pivot = data[from + ((to - from) >> 1)];
        // `j` is one past the right cursor so it can step below `from` without wrapping.
        let mut i = from;
        let mut j = to + 1;
        loop {
            while data[i] < pivot {
                i += 1;
            }
            while data[j - 1] > pivot {
                j -= 1;
            }
            if i < j {
                data.swap(i, j - 1);
                i += 1;
                j -= 1;
            }
            if i >= j {
                return (j, i);
            }
        }
    }

    /// Reorders `data` so that `data[k]` holds the k-th smallest element and returns it.
    ///
    /// Everything before `k` ends up `<= data[k]` and everything after it `>=`.
    ///
    /// # Panics
    ///
    /// Panics if `k >= data.len()`.
    pub fn select<T: PartialOrd + Copy>(data: &mut [T], k: usize) -> T {
        let len = data.len();
        if len == 2 {
            if data[0] > data[1] {
                data.swap(0, 1);
            }
        } else if len > 2 {
            let mut from = 0;
            let mut to = len - 1;
            while to > from {
                let (lower_end, upper_start) = Self::partition(data, from, to);
                if k < lower_end {
                    to = lower_end - 1;
                } else if upper_start <= k {
                    from = upper_start;
                } else {
                    // k sits between the partitions, on a pivot-equal element.
                    break;
                }
            }
        }
        data[k]
    }
}

impl<T: PartialOrd + Copy> KthStatistic<T> for HoareSelect {
    fn name(&self) -> &str {
        "bidirectional Hoare"
    }

    fn is_inplace(&self) -> bool {
        true
    }

    fn is_destructive(&self) -> bool {
        false
    }

    fn size(&self) -> usize {
        usize::MAX
    }

    fn resize(&mut self, _new_size: usize) {}

    fn find(&mut self, data: &mut [T], k: usize) -> Result<T, SelectError> {
        if k >= data.len() {
            return Err(SelectError::IndexOutOfRange { k, len: data.len() });
        }
        Ok(Self::select(data, k))
    }
}
