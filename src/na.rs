use std::fmt::{self, Debug, Display};

/// A possibly-missing value.
///
/// Key sources produce `NA<Label>` per row; rows whose key is `NA::NA`
/// belong to no group and carry the code -1 through the grouping machinery.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NA<T> {
    /// Missing. Orders before every present value.
    NA,
    /// A present value
    Value(T),
}

impl<T> NA<T> {
    pub fn is_na(&self) -> bool {
        matches!(self, NA::NA)
    }

    pub fn is_value(&self) -> bool {
        !self.is_na()
    }

    /// Borrow the value if present
    pub fn value(&self) -> Option<&T> {
        match self {
            NA::Value(v) => Some(v),
            NA::NA => None,
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            NA::Value(v) => Some(v),
            NA::NA => None,
        }
    }

    pub fn map<U, F>(self, f: F) -> NA<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            NA::Value(v) => NA::Value(f(v)),
            NA::NA => NA::NA,
        }
    }

    pub fn as_ref(&self) -> NA<&T> {
        match self {
            NA::Value(v) => NA::Value(v),
            NA::NA => NA::NA,
        }
    }
}

impl<T> From<T> for NA<T> {
    fn from(value: T) -> Self {
        NA::Value(value)
    }
}

impl<T> From<Option<T>> for NA<T> {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => NA::Value(v),
            None => NA::NA,
        }
    }
}

impl<T: Debug> Debug for NA<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NA::Value(v) => write!(f, "{:?}", v),
            NA::NA => write!(f, "NA"),
        }
    }
}

impl<T: Display> Display for NA<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NA::Value(v) => write!(f, "{}", v),
            NA::NA => write!(f, "NA"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_na_orders_first() {
        let mut values = vec![NA::Value(3), NA::NA, NA::Value(1)];
        values.sort();
        assert_eq!(values, vec![NA::NA, NA::Value(1), NA::Value(3)]);
    }

    #[test]
    fn test_option_conversion() {
        assert!(NA::<i32>::from(None).is_na());
        assert_eq!(NA::<i32>::from(Some(4)).into_option(), Some(4));
        assert_eq!(NA::Value(2).map(|v| v * 10), NA::Value(20));
    }
}
