mod label;
mod multi_index;

pub use label::Label;
pub use multi_index::MultiIndex;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Single-level row labels.
///
/// Labels need not be unique: grouped data may carry repeated labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Index {
    values: Vec<Label>,
    name: Option<String>,
}

impl Index {
    pub fn new(values: Vec<Label>) -> Self {
        Self::with_name(values, None)
    }

    pub fn with_name(values: Vec<Label>, name: Option<String>) -> Self {
        Index { values, name }
    }

    /// Integer labels `start..end`
    pub fn from_range(range: Range<usize>) -> Self {
        Index::new(range.map(Label::from).collect())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get_value(&self, pos: usize) -> Option<&Label> {
        self.values.get(pos)
    }

    pub fn values(&self) -> &[Label] {
        &self.values
    }

    pub fn name(&self) -> Option<&String> {
        self.name.as_ref()
    }
}

/// Row labels of a Series or DataFrame: flat or hierarchical
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DataFrameIndex {
    Simple(Index),
    Multi(MultiIndex),
}

impl DataFrameIndex {
    /// Default `0..len` integer labels
    pub fn default_with_len(len: usize) -> Self {
        DataFrameIndex::Simple(Index::from_range(0..len))
    }

    pub fn from_labels(values: Vec<Label>) -> Self {
        DataFrameIndex::Simple(Index::new(values))
    }

    pub fn len(&self) -> usize {
        match self {
            DataFrameIndex::Simple(idx) => idx.len(),
            DataFrameIndex::Multi(idx) => idx.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_multi(&self) -> bool {
        matches!(self, DataFrameIndex::Multi(_))
    }

    pub fn n_levels(&self) -> usize {
        match self {
            DataFrameIndex::Simple(_) => 1,
            DataFrameIndex::Multi(idx) => idx.n_levels(),
        }
    }

    pub fn names(&self) -> Vec<Option<String>> {
        match self {
            DataFrameIndex::Simple(idx) => vec![idx.name().cloned()],
            DataFrameIndex::Multi(idx) => idx.names().to_vec(),
        }
    }

    /// The label at `pos`; an entry of a hierarchical index is a `Label::Tuple`
    pub fn get(&self, pos: usize) -> Option<Label> {
        match self {
            DataFrameIndex::Simple(idx) => idx.get_value(pos).cloned(),
            DataFrameIndex::Multi(idx) => idx.get_tuple(pos).map(Label::Tuple),
        }
    }

    /// All labels, flattened to one `Label` per row
    pub fn labels(&self) -> Vec<Label> {
        match self {
            DataFrameIndex::Simple(idx) => idx.values().to_vec(),
            DataFrameIndex::Multi(idx) => (0..idx.len())
                .filter_map(|i| idx.get_tuple(i).map(Label::Tuple))
                .collect(),
        }
    }

    /// Per-level label arrays, each of length `len()`
    pub fn level_arrays(&self) -> Vec<Vec<Label>> {
        match self {
            DataFrameIndex::Simple(idx) => vec![idx.values().to_vec()],
            DataFrameIndex::Multi(idx) => (0..idx.n_levels())
                .map(|level| idx.level_labels(level))
                .collect(),
        }
    }

    pub fn equals(&self, other: &DataFrameIndex) -> bool {
        self.view(0..self.len()).equals(&other.view(0..other.len()))
    }

    /// Reorder (or subset) by integer positions
    pub fn take(&self, indexer: &[usize]) -> Self {
        match self {
            DataFrameIndex::Simple(idx) => DataFrameIndex::Simple(Index::with_name(
                indexer.iter().map(|&i| idx.values()[i].clone()).collect(),
                idx.name().cloned(),
            )),
            DataFrameIndex::Multi(idx) => DataFrameIndex::Multi(idx.take(indexer)),
        }
    }

    pub fn slice(&self, range: Range<usize>) -> Self {
        match self {
            DataFrameIndex::Simple(idx) => DataFrameIndex::Simple(Index::with_name(
                idx.values()[range].to_vec(),
                idx.name().cloned(),
            )),
            DataFrameIndex::Multi(idx) => DataFrameIndex::Multi(idx.slice(range)),
        }
    }

    /// Zero-copy window onto `range`
    pub fn view(&self, range: Range<usize>) -> IndexView<'_> {
        IndexView { index: self, range }
    }

    /// Concatenate indexes with the same number of levels
    pub fn concat(parts: &[DataFrameIndex]) -> Result<Self> {
        let first = match parts.first() {
            Some(first) => first,
            None => return Ok(DataFrameIndex::default_with_len(0)),
        };

        let n_levels = first.n_levels();
        if parts.iter().any(|p| p.n_levels() != n_levels) {
            return Err(Error::Index(
                "cannot concatenate indexes with different numbers of levels".into(),
            ));
        }

        if n_levels == 1 && !first.is_multi() {
            let values = parts.iter().flat_map(|p| p.labels()).collect();
            return Ok(DataFrameIndex::Simple(Index::with_name(
                values,
                first.names().into_iter().next().flatten(),
            )));
        }

        let mut arrays: Vec<Vec<Label>> = vec![Vec::new(); n_levels];
        for part in parts {
            for (level, values) in part.level_arrays().into_iter().enumerate() {
                arrays[level].extend(values);
            }
        }
        Ok(DataFrameIndex::Multi(MultiIndex::from_arrays(
            arrays,
            Some(first.names()),
        )?))
    }
}

impl PartialEq for DataFrameIndex {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl From<Index> for DataFrameIndex {
    fn from(index: Index) -> Self {
        DataFrameIndex::Simple(index)
    }
}

impl From<MultiIndex> for DataFrameIndex {
    fn from(index: MultiIndex) -> Self {
        DataFrameIndex::Multi(index)
    }
}

/// A borrowed window `[start, end)` of an index
#[derive(Debug, Clone)]
pub struct IndexView<'a> {
    index: &'a DataFrameIndex,
    range: Range<usize>,
}

impl<'a> IndexView<'a> {
    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    pub fn n_levels(&self) -> usize {
        self.index.n_levels()
    }

    pub fn get(&self, pos: usize) -> Option<Label> {
        if pos >= self.len() {
            return None;
        }
        self.index.get(self.range.start + pos)
    }

    pub fn iter(&self) -> impl Iterator<Item = Label> + '_ {
        self.range.clone().filter_map(move |i| self.index.get(i))
    }

    /// Same length, same levels, same labels in the same order
    pub fn equals(&self, other: &IndexView<'_>) -> bool {
        if self.len() != other.len() || self.n_levels() != other.n_levels() {
            return false;
        }
        match (self.index, other.index) {
            (DataFrameIndex::Simple(a), DataFrameIndex::Simple(b)) => {
                a.values()[self.range.clone()] == b.values()[other.range.clone()]
            }
            _ => (0..self.len()).all(|i| self.get(i) == other.get(i)),
        }
    }

    pub fn equals_index(&self, other: &DataFrameIndex) -> bool {
        self.equals(&other.view(0..other.len()))
    }

    pub fn to_index(&self) -> DataFrameIndex {
        self.index.slice(self.range.clone())
    }
}
