use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::{self, Display};
use std::hash::{Hash, Hasher};

/// A row label or grouping key value.
///
/// Labels are hashable and totally ordered so that distinct key values can
/// be sorted into canonical group codes. Integers and floats compare
/// numerically with each other; other variants order by kind
/// (`Bool < numbers < Str < Tuple`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Label {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// One entry of a hierarchical axis
    Tuple(Vec<Label>),
}

impl Label {
    fn kind_rank(&self) -> u8 {
        match self {
            Label::Bool(_) => 0,
            Label::Int(_) | Label::Float(_) => 1,
            Label::Str(_) => 2,
            Label::Tuple(_) => 3,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Label::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Label::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Split a tuple label into its parts; any other label is a 1-tuple
    pub fn into_parts(self) -> Vec<Label> {
        match self {
            Label::Tuple(parts) => parts,
            other => vec![other],
        }
    }
}

impl PartialEq for Label {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Label {}

impl PartialOrd for Label {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Label {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Label::Bool(a), Label::Bool(b)) => a.cmp(b),
            (Label::Int(a), Label::Int(b)) => a.cmp(b),
            (Label::Float(a), Label::Float(b)) => a.total_cmp(b),
            // Int(1) and Float(1.0) are distinct labels; ints sort first on ties
            (Label::Int(a), Label::Float(b)) => {
                (*a as f64).total_cmp(b).then(Ordering::Less)
            }
            (Label::Float(a), Label::Int(b)) => {
                a.total_cmp(&(*b as f64)).then(Ordering::Greater)
            }
            (Label::Str(a), Label::Str(b)) => a.cmp(b),
            (Label::Tuple(a), Label::Tuple(b)) => a.cmp(b),
            _ => self.kind_rank().cmp(&other.kind_rank()),
        }
    }
}

impl Hash for Label {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Label::Bool(v) => {
                0u8.hash(state);
                v.hash(state);
            }
            Label::Int(v) => {
                1u8.hash(state);
                v.hash(state);
            }
            Label::Float(v) => {
                2u8.hash(state);
                v.to_bits().hash(state);
            }
            Label::Str(v) => {
                3u8.hash(state);
                v.hash(state);
            }
            Label::Tuple(v) => {
                4u8.hash(state);
                v.hash(state);
            }
        }
    }
}

impl Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Bool(v) => write!(f, "{}", v),
            Label::Int(v) => write!(f, "{}", v),
            Label::Float(v) => write!(f, "{}", v),
            Label::Str(v) => write!(f, "{}", v),
            Label::Tuple(parts) => {
                write!(f, "(")?;
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", part)?;
                }
                write!(f, ")")
            }
        }
    }
}

impl From<bool> for Label {
    fn from(v: bool) -> Self {
        Label::Bool(v)
    }
}

impl From<i64> for Label {
    fn from(v: i64) -> Self {
        Label::Int(v)
    }
}

impl From<i32> for Label {
    fn from(v: i32) -> Self {
        Label::Int(v as i64)
    }
}

impl From<usize> for Label {
    fn from(v: usize) -> Self {
        Label::Int(v as i64)
    }
}

impl From<f64> for Label {
    fn from(v: f64) -> Self {
        Label::Float(v)
    }
}

impl From<&str> for Label {
    fn from(v: &str) -> Self {
        Label::Str(v.to_string())
    }
}

impl From<String> for Label {
    fn from(v: String) -> Self {
        Label::Str(v)
    }
}

impl From<Vec<Label>> for Label {
    fn from(v: Vec<Label>) -> Self {
        Label::Tuple(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixed_numeric_order() {
        let mut labels = vec![
            Label::Float(2.5),
            Label::Int(3),
            Label::Int(1),
            Label::Float(1.0),
        ];
        labels.sort();
        assert_eq!(
            labels,
            vec![
                Label::Int(1),
                Label::Float(1.0),
                Label::Float(2.5),
                Label::Int(3)
            ]
        );
        assert_ne!(Label::Int(1), Label::Float(1.0));
    }

    #[test]
    fn test_kind_order() {
        assert!(Label::Bool(true) < Label::Int(-5));
        assert!(Label::Int(100) < Label::from("a"));
        assert!(Label::from("z") < Label::Tuple(vec![]));
    }
}
