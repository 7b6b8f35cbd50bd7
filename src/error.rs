use thiserror::Error;

/// Error type for grouping, aggregation and recombination
#[derive(Error, Debug)]
pub enum Error {
    /// A grouping was requested with inputs that do not fit together,
    /// such as a level key on a flat axis.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("length mismatch: expected {expected}, actual {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("column not found: {0}")]
    ColumnNotFound(String),

    /// A reduction does not apply to the data type it was given.
    ///
    /// Aggregation treats this as a signal to try a narrower strategy; it
    /// only reaches the caller when strict aggregation is enabled.
    #[error("cannot aggregate: {0}")]
    AggregationType(String),

    /// A user function produced output that does not line up with its group.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// A user function failed; wraps the caller's own error.
    #[error("apply function failed: {0}")]
    Apply(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("index error: {0}")]
    Index(String),

    #[error("invalid options: {0}")]
    ConfigParse(String),

    #[error("parallel execution error: {0}")]
    Parallel(String),
}

impl Error {
    /// Wrap an arbitrary error raised inside a user function
    pub fn apply<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Apply(Box::new(err))
    }

    /// Whether an aggregation fallback chain may recover from this error.
    ///
    /// Only type and shape incompatibilities qualify; anything else raised
    /// by a user function is a real failure and propagates.
    pub fn is_fallback_candidate(&self) -> bool {
        matches!(self, Error::AggregationType(_) | Error::ShapeMismatch(_))
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::ConfigParse(err.to_string())
    }
}

impl From<rayon::ThreadPoolBuildError> for Error {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        Error::Parallel(err.to_string())
    }
}

pub type PandRSError = Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_candidates() {
        assert!(Error::AggregationType("text".into()).is_fallback_candidate());
        assert!(Error::ShapeMismatch("rows".into()).is_fallback_candidate());
        assert!(!Error::Configuration("level".into()).is_fallback_candidate());
        assert!(!Error::apply(std::fmt::Error).is_fallback_candidate());
    }
}
