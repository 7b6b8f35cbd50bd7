//! DataFrame: named columns sharing one row index

use std::ops::Range;

use crate::column::{Column, ColumnView, Scalar};
use crate::error::{Error, Result};
use crate::index::{DataFrameIndex, Index, IndexView, Label};
use crate::series::Series;

#[derive(Debug, Clone, PartialEq)]
pub struct DataFrame {
    columns: Vec<String>,
    data: Vec<Column>,
    index: DataFrameIndex,
}

impl Default for DataFrame {
    fn default() -> Self {
        Self::new()
    }
}

impl DataFrame {
    /// Create an empty DataFrame
    pub fn new() -> Self {
        DataFrame {
            columns: Vec::new(),
            data: Vec::new(),
            index: DataFrameIndex::default_with_len(0),
        }
    }

    /// Create an empty DataFrame with fixed row labels
    pub fn with_index(index: impl Into<DataFrameIndex>) -> Self {
        DataFrame {
            columns: Vec::new(),
            data: Vec::new(),
            index: index.into(),
        }
    }

    /// Add a column.
    ///
    /// The first column of a DataFrame without row labels sets a default
    /// `0..n` index; every later column must match the row count. A named
    /// or multi-level index is kept even when it has no rows.
    pub fn add_column(&mut self, name: impl Into<String>, column: impl Into<Column>) -> Result<()> {
        let name = name.into();
        let column = column.into();

        if self.columns.contains(&name) {
            return Err(Error::Configuration(format!("duplicate column name: {}", name)));
        }

        if self.data.is_empty() && self.has_placeholder_index() {
            self.index = DataFrameIndex::default_with_len(column.len());
        } else if column.len() != self.row_count() {
            return Err(Error::LengthMismatch {
                expected: self.row_count(),
                actual: column.len(),
            });
        }

        self.columns.push(name);
        self.data.push(column);
        Ok(())
    }

    /// Builder-style `add_column`
    pub fn with_column(mut self, name: impl Into<String>, column: impl Into<Column>) -> Result<Self> {
        self.add_column(name, column)?;
        Ok(self)
    }

    pub fn set_index(&mut self, index: impl Into<DataFrameIndex>) -> Result<()> {
        let index = index.into();
        if !self.data.is_empty() && index.len() != self.row_count() {
            return Err(Error::LengthMismatch {
                expected: self.row_count(),
                actual: index.len(),
            });
        }
        self.index = index;
        Ok(())
    }

    fn has_placeholder_index(&self) -> bool {
        match &self.index {
            DataFrameIndex::Simple(idx) => idx.is_empty() && idx.name().is_none(),
            DataFrameIndex::Multi(_) => false,
        }
    }

    pub fn row_count(&self) -> usize {
        self.index.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    pub fn index(&self) -> &DataFrameIndex {
        &self.index
    }

    pub fn column(&self, name: &str) -> Result<&Column> {
        self.columns
            .iter()
            .position(|c| c == name)
            .map(|pos| &self.data[pos])
            .ok_or_else(|| Error::ColumnNotFound(name.to_string()))
    }

    /// `(name, column)` pairs in column order
    pub fn columns(&self) -> impl Iterator<Item = (&str, &Column)> + '_ {
        self.columns.iter().map(String::as_str).zip(self.data.iter())
    }

    /// A column as a Series of cells, carrying the row labels
    pub fn column_series(&self, name: &str) -> Result<Series<Scalar>> {
        let column = self.column(name)?;
        Series::with_index(column.to_scalars(), self.index.clone(), Some(name.to_string()))
    }

    /// Cell at `(row, column)`
    pub fn get(&self, row: usize, name: &str) -> Result<Scalar> {
        let column = self.column(name)?;
        column.get(row).ok_or(Error::Index(format!(
            "row {} out of range for {} rows",
            row,
            self.row_count()
        )))
    }

    /// Reorder (or subset) rows by integer positions
    pub fn take(&self, indexer: &[usize]) -> Self {
        DataFrame {
            columns: self.columns.clone(),
            data: self.data.iter().map(|c| c.take(indexer)).collect(),
            index: self.index.take(indexer),
        }
    }

    /// Copy without the named columns
    pub fn drop_columns(&self, names: &[String]) -> Self {
        let (columns, data) = self
            .columns
            .iter()
            .zip(self.data.iter())
            .filter(|(name, _)| !names.contains(name))
            .map(|(name, col)| (name.clone(), col.clone()))
            .unzip();
        DataFrame {
            columns,
            data,
            index: self.index.clone(),
        }
    }

    /// Borrow rows `[start, end)`
    pub fn view(&self, range: Range<usize>) -> FrameView<'_> {
        FrameView {
            frame: self,
            range,
            name: Vec::new(),
        }
    }

    /// Swap rows and columns.
    ///
    /// Column names become the row labels and row labels become column
    /// names, as text. Each former row is re-typed from its cells.
    pub fn transpose(&self) -> DataFrame {
        self.transpose_with(None, |name| Label::from(name))
    }

    pub(crate) fn transpose_with<F>(&self, index_name: Option<String>, label_of: F) -> DataFrame
    where
        F: Fn(&str) -> Label,
    {
        let labels = self.columns.iter().map(|name| label_of(name)).collect();
        let columns = self
            .index
            .labels()
            .iter()
            .map(|label| label.to_string())
            .collect();
        let data = (0..self.row_count())
            .map(|row| {
                Column::from_scalars(
                    self.data
                        .iter()
                        .map(|column| column.get(row).unwrap_or(Scalar::Null))
                        .collect(),
                )
            })
            .collect();
        DataFrame {
            columns,
            data,
            index: Index::with_name(labels, index_name).into(),
        }
    }

    /// Build from column vectors sharing an index
    pub(crate) fn from_parts(
        columns: Vec<String>,
        data: Vec<Column>,
        index: DataFrameIndex,
    ) -> Result<Self> {
        if let Some(bad) = data.iter().find(|c| c.len() != index.len()) {
            return Err(Error::LengthMismatch {
                expected: index.len(),
                actual: bad.len(),
            });
        }
        Ok(DataFrame {
            columns,
            data,
            index,
        })
    }
}

/// A borrowed run of rows of a DataFrame.
///
/// Group functions receive these; `name()` is the group key.
#[derive(Debug, Clone)]
pub struct FrameView<'a> {
    frame: &'a DataFrame,
    range: Range<usize>,
    name: Vec<Label>,
}

impl<'a> FrameView<'a> {
    pub(crate) fn with_key(mut self, key: Vec<Label>) -> Self {
        self.name = key;
        self
    }

    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    /// Group key of these rows (empty outside of a group-by)
    pub fn name(&self) -> &[Label] {
        &self.name
    }

    pub fn column_names(&self) -> &'a [String] {
        &self.frame.columns
    }

    pub fn column(&self, name: &str) -> Result<ColumnView<'a>> {
        let frame: &'a DataFrame = self.frame;
        Ok(frame.column(name)?.view(self.range.clone()))
    }

    pub fn columns(&self) -> impl Iterator<Item = (&'a str, ColumnView<'a>)> + '_ {
        let frame: &'a DataFrame = self.frame;
        frame
            .columns
            .iter()
            .zip(frame.data.iter())
            .map(move |(name, col)| (name.as_str(), col.view(self.range.clone())))
    }

    pub fn index(&self) -> IndexView<'a> {
        self.frame.index.view(self.range.clone())
    }

    pub fn get(&self, row: usize, name: &str) -> Result<Scalar> {
        self.column(name)?.get(row).ok_or(Error::Index(format!(
            "row {} out of range for {} rows",
            row,
            self.len()
        )))
    }

    /// Copy into an owned DataFrame with the same labels
    pub fn to_frame(&self) -> DataFrame {
        self.frame.take(&self.range.clone().collect::<Vec<_>>())
    }

    pub fn head(&self, n: usize) -> DataFrame {
        let end = self.range.start + n.min(self.len());
        self.frame.take(&(self.range.start..end).collect::<Vec<_>>())
    }

    pub fn tail(&self, n: usize) -> DataFrame {
        let start = self.range.end - n.min(self.len());
        self.frame.take(&(start..self.range.end).collect::<Vec<_>>())
    }

    /// Owned DataFrame with the same labels, each column transformed by `f`
    pub fn map_columns<F>(&self, mut f: F) -> Result<DataFrame>
    where
        F: FnMut(&str, ColumnView<'a>) -> Result<Column>,
    {
        let mut data = Vec::with_capacity(self.frame.column_count());
        for (name, view) in self.columns() {
            data.push(f(name, view)?);
        }
        DataFrame::from_parts(self.frame.columns.clone(), data, self.index().to_index())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DataFrame {
        DataFrame::new()
            .with_column("a", vec![1i64, 2, 3])
            .unwrap()
            .with_column("b", vec!["x", "y", "z"])
            .unwrap()
    }

    #[test]
    fn test_add_column_length_check() {
        let mut df = sample();
        let err = df.add_column("c", vec![1.0]).unwrap_err();
        assert!(matches!(err, Error::LengthMismatch { expected: 3, actual: 1 }));
    }

    #[test]
    fn test_add_column_keeps_named_empty_index() {
        let index = Index::with_name(Vec::new(), Some("key".to_string()));
        let mut df = DataFrame::with_index(index);
        df.add_column("x", Vec::<f64>::new()).unwrap();
        assert_eq!(df.index().names(), vec![Some("key".to_string())]);

        let err = df.add_column("y", vec![1.0]).unwrap_err();
        assert!(matches!(err, Error::LengthMismatch { expected: 0, actual: 1 }));

        let mut unlabelled = DataFrame::new();
        unlabelled.add_column("x", vec![1.0, 2.0]).unwrap();
        assert_eq!(unlabelled.row_count(), 2);
    }

    #[test]
    fn test_view_head_tail() {
        let df = sample();
        let view = df.view(1..3);
        assert_eq!(view.len(), 2);
        assert_eq!(view.head(1).get(0, "b").unwrap(), Scalar::from("y"));
        assert_eq!(view.tail(1).index().labels(), vec![Label::Int(2)]);
    }

    #[test]
    fn test_transpose() {
        let df = sample();
        let flipped = df.transpose();
        assert_eq!(
            flipped.column_names(),
            &["0".to_string(), "1".to_string(), "2".to_string()]
        );
        assert_eq!(flipped.index().labels(), vec![Label::from("a"), Label::from("b")]);
        // a former row mixing numbers and text holds both
        assert_eq!(flipped.get(0, "2").unwrap(), Scalar::Int64(3));
        assert_eq!(flipped.get(1, "2").unwrap(), Scalar::from("z"));
        assert_eq!(flipped.transpose().column_names(), df.column_names());
    }

    #[test]
    fn test_drop_columns() {
        let df = sample().drop_columns(&["a".to_string()]);
        assert_eq!(df.column_names(), &["b".to_string()]);
        assert_eq!(df.row_count(), 3);
    }
}
