use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::{self, Display};

use crate::index::Label;
use crate::na::NA;

/// A single cell value of dynamically typed data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    Null,
    Boolean(bool),
    Int64(i64),
    Float64(f64),
    String(String),
}

impl Scalar {
    /// Null or a NaN float
    pub fn is_null(&self) -> bool {
        match self {
            Scalar::Null => true,
            Scalar::Float64(v) => v.is_nan(),
            _ => false,
        }
    }

    /// Numeric value; nulls become NaN, text has none
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Null => Some(f64::NAN),
            Scalar::Boolean(v) => Some(if *v { 1.0 } else { 0.0 }),
            Scalar::Int64(v) => Some(*v as f64),
            Scalar::Float64(v) => Some(*v),
            Scalar::String(_) => None,
        }
    }

    /// Convert to a grouping key; nulls and NaN are missing keys
    pub fn to_label(&self) -> NA<Label> {
        match self {
            Scalar::Null => NA::NA,
            Scalar::Boolean(v) => NA::Value(Label::Bool(*v)),
            Scalar::Int64(v) => NA::Value(Label::Int(*v)),
            Scalar::Float64(v) if v.is_nan() => NA::NA,
            Scalar::Float64(v) => NA::Value(Label::Float(*v)),
            Scalar::String(v) => NA::Value(Label::Str(v.clone())),
        }
    }

    /// Ordering used by min/max reductions.
    ///
    /// Numbers compare numerically and strings lexically; mixing the two
    /// has no ordering.
    pub fn compare(&self, other: &Scalar) -> Option<Ordering> {
        match (self, other) {
            (Scalar::String(a), Scalar::String(b)) => Some(a.cmp(b)),
            (Scalar::Boolean(a), Scalar::Boolean(b)) => Some(a.cmp(b)),
            (Scalar::Int64(a), Scalar::Int64(b)) => Some(a.cmp(b)),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.partial_cmp(&y),
                _ => None,
            },
        }
    }
}

impl Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => write!(f, "null"),
            Scalar::Boolean(v) => write!(f, "{}", v),
            Scalar::Int64(v) => write!(f, "{}", v),
            Scalar::Float64(v) => write!(f, "{}", v),
            Scalar::String(v) => write!(f, "{}", v),
        }
    }
}

impl ToPrimitive for Scalar {
    fn to_i64(&self) -> Option<i64> {
        match self {
            Scalar::Int64(v) => Some(*v),
            Scalar::Boolean(v) => Some(*v as i64),
            Scalar::Float64(v) => v.to_i64(),
            _ => None,
        }
    }

    fn to_u64(&self) -> Option<u64> {
        self.to_i64().and_then(|v| v.to_u64())
    }

    fn to_f64(&self) -> Option<f64> {
        self.as_f64()
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Float64(v)
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Int64(v)
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Boolean(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::String(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::String(v)
    }
}

impl From<Label> for Scalar {
    fn from(label: Label) -> Self {
        match label {
            Label::Bool(v) => Scalar::Boolean(v),
            Label::Int(v) => Scalar::Int64(v),
            Label::Float(v) => Scalar::Float64(v),
            Label::Str(v) => Scalar::String(v),
            tuple @ Label::Tuple(_) => Scalar::String(tuple.to_string()),
        }
    }
}
