//! Combination of several groupings into one sorted partition of rows.

use std::cmp::Ordering;

use crate::error::{Error, Result};
use crate::groupby::grouping::Grouping;

/// Sort permutation and group-space shape of a set of groupings.
///
/// Rows sharing a tuple of codes are contiguous once reordered by
/// `sort_order`; for every key prefix the matching rows form one range
/// nested inside the range of the shorter prefix.
#[derive(Debug, Clone)]
pub struct GroupIndexer {
    shape: Vec<usize>,
    sort_order: Vec<usize>,
    sorted_labels: Vec<Vec<i64>>,
}

impl GroupIndexer {
    pub fn new(groupings: &[Grouping]) -> Result<Self> {
        let shape: Vec<usize> = groupings.iter().map(|g| g.ngroups()).collect();
        group_space_size(&shape)?;

        let labels: Vec<&[i64]> = groupings.iter().map(|g| g.labels()).collect();
        let n = labels.first().map_or(0, |l| l.len());
        let sort_order = lexsort(&labels, n);
        let sorted_labels: Vec<Vec<i64>> = labels
            .iter()
            .map(|level| sort_order.iter().map(|&i| level[i]).collect())
            .collect();

        log::debug!(
            "sorted {} rows into a group space of shape {:?}",
            n,
            shape
        );

        Ok(GroupIndexer {
            shape,
            sort_order,
            sorted_labels,
        })
    }

    /// Distinct key count of each grouping
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Row permutation that makes groups contiguous
    pub fn sort_order(&self) -> &[usize] {
        &self.sort_order
    }

    /// Codes of each level in sorted row order
    pub fn sorted_labels(&self) -> &[Vec<i64>] {
        &self.sorted_labels
    }

    /// Number of cells of the group space
    pub fn space_size(&self) -> usize {
        self.shape.iter().product()
    }

    /// Flat group id of a code tuple; the last key varies fastest
    pub fn ravel(&self, codes: &[usize]) -> usize {
        codes
            .iter()
            .zip(&self.shape)
            .fold(0, |flat, (&code, &size)| flat * size + code)
    }

    /// Code tuple of a flat group id
    pub fn unravel(&self, mut flat: usize) -> Vec<usize> {
        let mut codes = vec![0; self.shape.len()];
        for (level, &size) in self.shape.iter().enumerate().rev() {
            codes[level] = flat % size.max(1);
            flat /= size.max(1);
        }
        codes
    }

    /// Flat group id of each row in sorted order, -1 when any key is missing
    pub fn sorted_group_ids(&self) -> Vec<i64> {
        (0..self.sort_order.len())
            .map(|row| {
                let mut flat: i64 = 0;
                for (level, &size) in self.sorted_labels.iter().zip(&self.shape) {
                    let code = level[row];
                    if code < 0 {
                        return -1;
                    }
                    flat = flat * size as i64 + code;
                }
                flat
            })
            .collect()
    }

    /// Reorder values by the sort permutation
    pub fn reorder<T: Clone>(&self, values: &[T]) -> Vec<T> {
        self.sort_order.iter().map(|&i| values[i].clone()).collect()
    }
}

/// Product of the shape, failing when it does not fit a signed 64-bit id
pub fn group_space_size(shape: &[usize]) -> Result<usize> {
    shape
        .iter()
        .try_fold(1usize, |acc, &n| acc.checked_mul(n))
        .filter(|&size| size <= i64::MAX as usize)
        .ok_or_else(|| {
            Error::Configuration(format!("group space {:?} is too large to index", shape))
        })
}

/// Stable lexicographic argsort of `n` rows over several code arrays;
/// `keys[0]` is the most significant.
pub fn lexsort(keys: &[&[i64]], n: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        keys.iter()
            .map(|key| key[a].cmp(&key[b]))
            .find(|ord| ord.is_ne())
            .unwrap_or(Ordering::Equal)
    });
    order
}
