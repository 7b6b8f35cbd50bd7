use num_traits::ToPrimitive;
use std::fmt::Debug;
use std::ops::Range;

use crate::error::{Error, Result};
use crate::index::{DataFrameIndex, IndexView, Label};

/// Series: a one-dimensional array of values with row labels
#[derive(Debug, Clone, PartialEq)]
pub struct Series<T>
where
    T: Debug + Clone,
{
    values: Vec<T>,

    index: DataFrameIndex,

    name: Option<String>,
}

impl<T> Series<T>
where
    T: Debug + Clone,
{
    /// Create a Series with the default `0..n` index
    pub fn new(values: Vec<T>, name: Option<String>) -> Self {
        let index = DataFrameIndex::default_with_len(values.len());
        Series {
            values,
            index,
            name,
        }
    }

    /// Create a Series with custom row labels
    pub fn with_index(
        values: Vec<T>,
        index: impl Into<DataFrameIndex>,
        name: Option<String>,
    ) -> Result<Self> {
        let index = index.into();
        if values.len() != index.len() {
            return Err(Error::LengthMismatch {
                expected: index.len(),
                actual: values.len(),
            });
        }

        Ok(Series {
            values,
            index,
            name,
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, pos: usize) -> Option<&T> {
        self.values.get(pos)
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn into_values(self) -> Vec<T> {
        self.values
    }

    pub fn name(&self) -> Option<&String> {
        self.name.as_ref()
    }

    pub fn index(&self) -> &DataFrameIndex {
        &self.index
    }

    /// Reorder (or subset) values and labels by integer positions
    pub fn take(&self, indexer: &[usize]) -> Self {
        Series {
            values: indexer.iter().map(|&i| self.values[i].clone()).collect(),
            index: self.index.take(indexer),
            name: self.name.clone(),
        }
    }

    /// Borrow rows `[start, end)`
    pub fn view(&self, range: Range<usize>) -> SeriesView<'_, T> {
        SeriesView {
            values: &self.values[range.clone()],
            index: self.index.view(range),
            series_name: self.name.as_deref(),
            name: Vec::new(),
        }
    }

    /// Same labels, transformed values
    pub fn map<U, F>(&self, f: F) -> Series<U>
    where
        U: Debug + Clone,
        F: FnMut(&T) -> U,
    {
        Series {
            values: self.values.iter().map(f).collect(),
            index: self.index.clone(),
            name: self.name.clone(),
        }
    }

    /// Label and value pairs in row order
    pub fn iter(&self) -> impl Iterator<Item = (Label, &T)> + '_ {
        self.values
            .iter()
            .enumerate()
            .filter_map(move |(i, v)| self.index.get(i).map(|label| (label, v)))
    }
}

fn to_f64_vec<T: ToPrimitive>(values: &[T]) -> Vec<f64> {
    values
        .iter()
        .map(|v| v.to_f64().unwrap_or(f64::NAN))
        .collect()
}

/// A borrowed run of rows of a Series.
///
/// Groups are handed to user functions as views over the sorted buffer;
/// `name()` carries the key of the group the rows belong to.
#[derive(Debug, Clone)]
pub struct SeriesView<'a, T> {
    values: &'a [T],
    index: IndexView<'a>,
    series_name: Option<&'a str>,
    name: Vec<Label>,
}

impl<'a, T> SeriesView<'a, T>
where
    T: Debug + Clone,
{
    pub(crate) fn with_key(mut self, key: Vec<Label>) -> Self {
        self.name = key;
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &'a [T] {
        self.values
    }

    pub fn index(&self) -> &IndexView<'a> {
        &self.index
    }

    /// Group key of these rows (empty outside of a group-by)
    pub fn name(&self) -> &[Label] {
        &self.name
    }

    pub fn series_name(&self) -> Option<&'a str> {
        self.series_name
    }

    /// Copy into an owned Series with the same labels
    pub fn to_series(&self) -> Series<T> {
        Series {
            values: self.values.to_vec(),
            index: self.index.to_index(),
            name: self.series_name.map(String::from),
        }
    }

    /// Owned Series with the same labels and transformed values
    pub fn map<U, F>(&self, f: F) -> Series<U>
    where
        U: Debug + Clone,
        F: FnMut(&T) -> U,
    {
        Series {
            values: self.values.iter().map(f).collect(),
            index: self.index.to_index(),
            name: self.series_name.map(String::from),
        }
    }
}

impl<'a, T> SeriesView<'a, T>
where
    T: Debug + Clone + ToPrimitive,
{
    pub fn to_f64_vec(&self) -> Vec<f64> {
        to_f64_vec(self.values)
    }

    pub fn sum(&self) -> f64 {
        stats::sum(&self.to_f64_vec())
    }

    pub fn mean(&self) -> f64 {
        stats::mean(&self.to_f64_vec())
    }

    pub fn std(&self) -> f64 {
        stats::std(&self.to_f64_vec())
    }

    pub fn var(&self) -> f64 {
        stats::var(&self.to_f64_vec())
    }
}

/// Elementwise statistics over float slices; NaN values are skipped
pub mod stats {
    pub fn sum(values: &[f64]) -> f64 {
        values.iter().filter(|v| !v.is_nan()).sum()
    }

    pub fn count(values: &[f64]) -> usize {
        values.iter().filter(|v| !v.is_nan()).count()
    }

    pub fn mean(values: &[f64]) -> f64 {
        let n = count(values);
        if n == 0 {
            f64::NAN
        } else {
            sum(values) / n as f64
        }
    }

    /// Sample variance (n - 1 denominator)
    pub fn var(values: &[f64]) -> f64 {
        let n = count(values);
        if n <= 1 {
            return f64::NAN;
        }
        let mean = mean(values);
        values
            .iter()
            .filter(|v| !v.is_nan())
            .map(|v| (v - mean).powi(2))
            .sum::<f64>()
            / (n - 1) as f64
    }

    pub fn std(values: &[f64]) -> f64 {
        var(values).sqrt()
    }
}
