use std::ops::Range;
use std::sync::OnceLock;

use crate::dataframe::DataFrame;
use crate::error::{Error, Result};
use crate::groupby::grouping::{Grouping, KeySource};
use crate::groupby::indexer::GroupIndexer;
use crate::groupby::slicer::{GroupCell, GroupSlicer};
use crate::index::{DataFrameIndex, Index, Label, MultiIndex};

/// The split step of a group-by: one or more groupings over the same axis
/// and the sorted partition they induce.
///
/// A `Grouper` is immutable once built. Grouped views share it through an
/// `Arc`, so a column selected from a DataFrame group-by reuses the
/// partition instead of recomputing it.
#[derive(Debug)]
pub struct Grouper {
    groupings: Vec<Grouping>,
    indexer: GroupIndexer,
    cells: OnceLock<Vec<GroupCell>>,
    sorted_ids: OnceLock<Vec<i64>>,
}

impl Grouper {
    /// Combine groupings of equal length.
    ///
    /// Unnamed groupings are named `key` (single key) or `key_{i}`.
    pub fn new(mut groupings: Vec<Grouping>) -> Result<Self> {
        let n = match groupings.first() {
            Some(first) => first.len(),
            None => return Err(Error::Configuration("no grouping keys given".into())),
        };
        if let Some(bad) = groupings.iter().find(|g| g.len() != n) {
            return Err(Error::LengthMismatch {
                expected: n,
                actual: bad.len(),
            });
        }

        let single = groupings.len() == 1;
        for (i, grouping) in groupings.iter_mut().enumerate() {
            if grouping.name().is_none() {
                grouping.set_name(if single {
                    "key".to_string()
                } else {
                    format!("key_{}", i)
                });
            }
        }

        let indexer = GroupIndexer::new(&groupings)?;
        Ok(Grouper {
            groupings,
            indexer,
            cells: OnceLock::new(),
            sorted_ids: OnceLock::new(),
        })
    }

    /// Resolve key sources against an axis; returns the grouper and the
    /// columns used as keys
    pub(crate) fn from_keys(
        axis: &DataFrameIndex,
        keys: Vec<KeySource>,
        frame: Option<&DataFrame>,
    ) -> Result<(Self, Vec<String>)> {
        let mut groupings = Vec::with_capacity(keys.len());
        let mut exclusions = Vec::new();
        for key in keys {
            let resolved = key.resolve(axis, frame)?;
            exclusions.extend(resolved.exclusion);
            groupings.push(Grouping::new(resolved.values, resolved.name));
        }
        Ok((Grouper::new(groupings)?, exclusions))
    }

    pub fn groupings(&self) -> &[Grouping] {
        &self.groupings
    }

    pub fn nkeys(&self) -> usize {
        self.groupings.len()
    }

    /// Length of the grouped axis
    pub fn axis_len(&self) -> usize {
        self.indexer.sort_order().len()
    }

    pub fn names(&self) -> Vec<Option<String>> {
        self.groupings
            .iter()
            .map(|g| g.name().map(String::from))
            .collect()
    }

    pub fn shape(&self) -> &[usize] {
        self.indexer.shape()
    }

    pub fn indexer(&self) -> &GroupIndexer {
        &self.indexer
    }

    /// Row permutation that makes groups contiguous
    pub fn sort_order(&self) -> &[usize] {
        self.indexer.sort_order()
    }

    /// Flat group id of each row of the sorted buffer
    pub fn sorted_group_ids(&self) -> &[i64] {
        self.sorted_ids
            .get_or_init(|| self.indexer.sorted_group_ids())
    }

    /// Fresh walk over every cell of the group space, occupied or not
    pub fn slicer(&self, skip_empty: bool) -> GroupSlicer<'_> {
        GroupSlicer::new(
            self.indexer.sorted_labels(),
            self.indexer.shape(),
            0..self.axis_len(),
            skip_empty,
        )
    }

    /// Occupied cells in key order
    pub fn cells(&self) -> &[GroupCell] {
        self.cells.get_or_init(|| self.slicer(true).collect())
    }

    /// Number of groups with at least one row
    pub fn ngroups(&self) -> usize {
        self.cells().len()
    }

    /// Key values of a code tuple, one per grouping
    pub fn key(&self, codes: &[usize]) -> Vec<Label> {
        self.groupings
            .iter()
            .zip(codes)
            .map(|(g, &code)| g.ids()[code].clone())
            .collect()
    }

    /// Public form of a key: the label itself for a single key, a tuple
    /// otherwise
    pub fn key_label(&self, key: Vec<Label>) -> Label {
        if self.nkeys() == 1 {
            key.into_iter().next().unwrap_or(Label::Tuple(Vec::new()))
        } else {
            Label::Tuple(key)
        }
    }

    /// `(key, range of the sorted buffer)` for every occupied group
    pub fn iter(&self) -> impl Iterator<Item = (Label, Range<usize>)> + '_ {
        self.cells()
            .iter()
            .map(move |cell| (self.key_label(self.key(&cell.codes)), cell.range.clone()))
    }

    /// Original row positions of a sorted-buffer range, ascending
    pub fn positions(&self, range: Range<usize>) -> &[usize] {
        &self.sort_order()[range]
    }

    /// Cell holding `key`, if that group has rows
    pub fn find(&self, key: &Label) -> Option<&GroupCell> {
        let parts = if self.nkeys() == 1 {
            vec![key.clone()]
        } else {
            key.clone().into_parts()
        };
        if parts.len() != self.nkeys() {
            return None;
        }
        let codes: Option<Vec<usize>> = self
            .groupings
            .iter()
            .zip(&parts)
            .map(|(g, part)| g.reverse_id(part))
            .collect();
        let codes = codes?;
        self.cells().iter().find(|cell| cell.codes == codes)
    }

    /// Index of per-group results for the given flat group ids: the
    /// distinct keys for a single grouping, one level per grouping
    /// otherwise
    pub fn result_index(&self, flat_ids: &[usize]) -> Result<DataFrameIndex> {
        if let [grouping] = self.groupings.as_slice() {
            let values = flat_ids.iter().map(|&id| grouping.ids()[id].clone()).collect();
            return Ok(Index::with_name(values, grouping.name().map(String::from)).into());
        }

        let mut codes = vec![Vec::with_capacity(flat_ids.len()); self.nkeys()];
        for &id in flat_ids {
            for (level, code) in self.indexer.unravel(id).into_iter().enumerate() {
                codes[level].push(code as i32);
            }
        }
        let levels = self.groupings.iter().map(|g| g.ids().to_vec()).collect();
        Ok(MultiIndex::new(levels, codes, Some(self.names()))?.into())
    }

    /// Flat ids of the occupied groups, ascending
    pub fn occupied_ids(&self) -> Vec<usize> {
        self.cells()
            .iter()
            .map(|cell| self.indexer.ravel(&cell.codes))
            .collect()
    }

    /// Check that an object to group has one row per key
    pub(crate) fn check_len(&self, len: usize) -> Result<()> {
        if len != self.axis_len() {
            return Err(Error::LengthMismatch {
                expected: self.axis_len(),
                actual: len,
            });
        }
        Ok(())
    }
}
