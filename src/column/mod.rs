//! Typed column storage and borrowed column slices

mod scalar;

pub use scalar::Scalar;

use num_traits::ToPrimitive;
use std::borrow::Cow;
use std::ops::Range;

use crate::error::{Error, Result};
use crate::index::Label;
use crate::na::NA;

/// Column data type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Int64,
    Float64,
    Boolean,
    String,
    Object,
}

/// Owned column data. Missing floats are NaN; `Object` holds mixed values.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Int64(Vec<i64>),
    Float64(Vec<f64>),
    Boolean(Vec<bool>),
    String(Vec<String>),
    Object(Vec<Scalar>),
}

macro_rules! column_dispatch {
    ($value:expr, $data:ident => $body:expr) => {
        match $value {
            Column::Int64($data) => $body,
            Column::Float64($data) => $body,
            Column::Boolean($data) => $body,
            Column::String($data) => $body,
            Column::Object($data) => $body,
        }
    };
}

impl Column {
    pub fn len(&self) -> usize {
        column_dispatch!(self, data => data.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn column_type(&self) -> ColumnType {
        match self {
            Column::Int64(_) => ColumnType::Int64,
            Column::Float64(_) => ColumnType::Float64,
            Column::Boolean(_) => ColumnType::Boolean,
            Column::String(_) => ColumnType::String,
            Column::Object(_) => ColumnType::Object,
        }
    }

    pub fn get(&self, pos: usize) -> Option<Scalar> {
        self.view(0..self.len()).get(pos)
    }

    /// Borrow rows `[start, end)` without copying
    pub fn view(&self, range: Range<usize>) -> ColumnView<'_> {
        match self {
            Column::Int64(d) => ColumnView::Int64(&d[range]),
            Column::Float64(d) => ColumnView::Float64(&d[range]),
            Column::Boolean(d) => ColumnView::Boolean(&d[range]),
            Column::String(d) => ColumnView::String(&d[range]),
            Column::Object(d) => ColumnView::Object(&d[range]),
        }
    }

    /// Reorder (or subset) by integer positions
    pub fn take(&self, indexer: &[usize]) -> Column {
        match self {
            Column::Int64(d) => Column::Int64(indexer.iter().map(|&i| d[i]).collect()),
            Column::Float64(d) => Column::Float64(indexer.iter().map(|&i| d[i]).collect()),
            Column::Boolean(d) => Column::Boolean(indexer.iter().map(|&i| d[i]).collect()),
            Column::String(d) => {
                Column::String(indexer.iter().map(|&i| d[i].clone()).collect())
            }
            Column::Object(d) => {
                Column::Object(indexer.iter().map(|&i| d[i].clone()).collect())
            }
        }
    }

    pub fn to_scalars(&self) -> Vec<Scalar> {
        self.view(0..self.len()).iter().collect()
    }

    /// Key values for grouping; nulls and NaN become missing keys
    pub fn to_labels(&self) -> Vec<NA<Label>> {
        self.view(0..self.len()).iter().map(|s| s.to_label()).collect()
    }

    /// Build a column from cell values, picking the narrowest type that
    /// holds all of them.
    ///
    /// Integers stay integers unless a null or float appears, in which case
    /// the column becomes `Float64` with NaN for nulls. Anything that does
    /// not fit a single type becomes `Object`.
    pub fn from_scalars(values: Vec<Scalar>) -> Column {
        let all = |pred: fn(&Scalar) -> bool| values.iter().all(pred);
        let non_empty = !values.is_empty();
        let all_int = non_empty && all(|s| matches!(s, Scalar::Int64(_)));
        let all_bool = non_empty && all(|s| matches!(s, Scalar::Boolean(_)));
        let all_float =
            all(|s| matches!(s, Scalar::Int64(_) | Scalar::Float64(_) | Scalar::Null));
        let all_text = all(|s| matches!(s, Scalar::String(_)));

        if all_int {
            Column::Int64(values.iter().filter_map(|s| s.to_i64()).collect())
        } else if all_bool {
            Column::Boolean(
                values
                    .iter()
                    .map(|s| matches!(s, Scalar::Boolean(true)))
                    .collect(),
            )
        } else if all_float {
            Column::Float64(
                values
                    .iter()
                    .map(|s| s.as_f64().unwrap_or(f64::NAN))
                    .collect(),
            )
        } else if all_text {
            Column::String(values.iter().map(|s| s.to_string()).collect())
        } else {
            Column::Object(values)
        }
    }

    /// Concatenate columns; mismatched types fall back to cell-wise inference
    pub fn concat(parts: &[ColumnView<'_>]) -> Column {
        let same_type = parts
            .windows(2)
            .all(|w| w[0].column_type() == w[1].column_type());

        match parts.first() {
            Some(ColumnView::Int64(_)) if same_type => Column::Int64(
                parts
                    .iter()
                    .flat_map(|p| match p {
                        ColumnView::Int64(d) => d.to_vec(),
                        _ => Vec::new(),
                    })
                    .collect(),
            ),
            Some(ColumnView::Float64(_)) if same_type => Column::Float64(
                parts
                    .iter()
                    .flat_map(|p| match p {
                        ColumnView::Float64(d) => d.to_vec(),
                        _ => Vec::new(),
                    })
                    .collect(),
            ),
            _ => Column::from_scalars(parts.iter().flat_map(|p| p.iter()).collect()),
        }
    }
}

impl From<Vec<i64>> for Column {
    fn from(v: Vec<i64>) -> Self {
        Column::Int64(v)
    }
}

impl From<Vec<f64>> for Column {
    fn from(v: Vec<f64>) -> Self {
        Column::Float64(v)
    }
}

impl From<Vec<bool>> for Column {
    fn from(v: Vec<bool>) -> Self {
        Column::Boolean(v)
    }
}

impl From<Vec<String>> for Column {
    fn from(v: Vec<String>) -> Self {
        Column::String(v)
    }
}

impl From<Vec<&str>> for Column {
    fn from(v: Vec<&str>) -> Self {
        Column::String(v.into_iter().map(String::from).collect())
    }
}

impl From<Vec<Scalar>> for Column {
    fn from(v: Vec<Scalar>) -> Self {
        Column::from_scalars(v)
    }
}

/// A borrowed contiguous slice of a column
#[derive(Debug, Clone, Copy)]
pub enum ColumnView<'a> {
    Int64(&'a [i64]),
    Float64(&'a [f64]),
    Boolean(&'a [bool]),
    String(&'a [String]),
    Object(&'a [Scalar]),
}

impl<'a> ColumnView<'a> {
    pub fn len(&self) -> usize {
        match self {
            ColumnView::Int64(d) => d.len(),
            ColumnView::Float64(d) => d.len(),
            ColumnView::Boolean(d) => d.len(),
            ColumnView::String(d) => d.len(),
            ColumnView::Object(d) => d.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn column_type(&self) -> ColumnType {
        match self {
            ColumnView::Int64(_) => ColumnType::Int64,
            ColumnView::Float64(_) => ColumnType::Float64,
            ColumnView::Boolean(_) => ColumnType::Boolean,
            ColumnView::String(_) => ColumnType::String,
            ColumnView::Object(_) => ColumnType::Object,
        }
    }

    pub fn get(&self, pos: usize) -> Option<Scalar> {
        match self {
            ColumnView::Int64(d) => d.get(pos).map(|&v| Scalar::Int64(v)),
            ColumnView::Float64(d) => d.get(pos).map(|&v| Scalar::Float64(v)),
            ColumnView::Boolean(d) => d.get(pos).map(|&v| Scalar::Boolean(v)),
            ColumnView::String(d) => d.get(pos).map(|v| Scalar::String(v.clone())),
            ColumnView::Object(d) => d.get(pos).cloned(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Scalar> + 'a {
        let view = *self;
        (0..view.len()).filter_map(move |i| view.get(i))
    }

    /// Numeric values of the slice.
    ///
    /// Borrows float data as-is; fails with `AggregationType` for text and
    /// for object slices holding text.
    pub fn to_f64(&self) -> Result<Cow<'a, [f64]>> {
        match self {
            ColumnView::Float64(d) => Ok(Cow::Borrowed(d)),
            ColumnView::Int64(d) => Ok(Cow::Owned(d.iter().map(|&v| v as f64).collect())),
            ColumnView::Boolean(d) => Ok(Cow::Owned(
                d.iter().map(|&v| if v { 1.0 } else { 0.0 }).collect(),
            )),
            ColumnView::String(_) => Err(Error::AggregationType(
                "string data is not numeric".into(),
            )),
            ColumnView::Object(d) => d
                .iter()
                .map(|s| {
                    s.as_f64().ok_or_else(|| {
                        Error::AggregationType(format!("object value '{}' is not numeric", s))
                    })
                })
                .collect::<Result<Vec<f64>>>()
                .map(Cow::Owned),
        }
    }

    /// Rows `[start, end)` of this slice
    pub fn slice(&self, range: Range<usize>) -> ColumnView<'a> {
        match self {
            ColumnView::Int64(d) => ColumnView::Int64(&d[range]),
            ColumnView::Float64(d) => ColumnView::Float64(&d[range]),
            ColumnView::Boolean(d) => ColumnView::Boolean(&d[range]),
            ColumnView::String(d) => ColumnView::String(&d[range]),
            ColumnView::Object(d) => ColumnView::Object(&d[range]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_scalars_inference() {
        let ints = Column::from_scalars(vec![Scalar::Int64(1), Scalar::Int64(2)]);
        assert_eq!(ints.column_type(), ColumnType::Int64);

        let floats = Column::from_scalars(vec![Scalar::Int64(1), Scalar::Null]);
        match floats {
            Column::Float64(v) => {
                assert_eq!(v[0], 1.0);
                assert!(v[1].is_nan());
            }
            other => panic!("expected floats, got {:?}", other),
        }

        let mixed = Column::from_scalars(vec![Scalar::Int64(1), Scalar::from("a")]);
        assert_eq!(mixed.column_type(), ColumnType::Object);
    }

    #[test]
    fn test_text_is_not_numeric() {
        let col = Column::from(vec!["a", "b"]);
        let err = col.view(0..2).to_f64().unwrap_err();
        assert!(err.is_fallback_candidate());
    }

    #[test]
    fn test_float_view_borrows() {
        let col = Column::from(vec![1.0, 2.0, 3.0]);
        let values = col.view(1..3).to_f64().unwrap();
        assert!(matches!(values, Cow::Borrowed(_)));
        assert_eq!(&*values, &[2.0, 3.0]);
    }
}
