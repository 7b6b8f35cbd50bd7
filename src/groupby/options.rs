//! Group-by options
//!
//! Options are plain data with builder methods and can be read from TOML:
//!
//! ```toml
//! strict_aggregation = false
//! name = "result"
//!
//! [parallel]
//! min_groups = 64
//! max_threads = 4
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Configuration for parallel per-group evaluation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParallelConfig {
    /// Minimum number of groups before work is spread over threads
    pub min_groups: usize,
    /// Maximum number of threads to use (None for the global pool)
    pub max_threads: Option<usize>,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            min_groups: 64,
            max_threads: None,
        }
    }
}

impl ParallelConfig {
    /// Create a new parallel configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum number of groups
    pub fn with_min_groups(mut self, min_groups: usize) -> Self {
        self.min_groups = min_groups;
        self
    }

    /// Set the maximum number of threads
    pub fn with_max_threads(mut self, max_threads: usize) -> Self {
        self.max_threads = Some(max_threads);
        self
    }

    /// Get the number of threads to use
    pub fn threads(&self) -> usize {
        match self.max_threads {
            Some(n) => n.max(1),
            None => num_cpus::get(),
        }
    }

    /// Whether `ngroups` groups are worth evaluating in parallel
    pub fn should_parallelize(&self, ngroups: usize) -> bool {
        ngroups >= self.min_groups && self.threads() > 1
    }

    /// Run `op` on a pool sized by `max_threads`, or on the global pool
    pub(crate) fn install<R, OP>(&self, op: OP) -> Result<R>
    where
        R: Send,
        OP: FnOnce() -> R + Send,
    {
        match self.max_threads {
            Some(n) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(n.max(1))
                    .build()?;
                Ok(pool.install(op))
            }
            None => Ok(op()),
        }
    }
}

/// Options controlling a group-by
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupByOptions {
    pub parallel: ParallelConfig,
    /// Return the type error instead of dropping a column that no
    /// aggregation strategy could reduce
    pub strict_aggregation: bool,
    /// Name for scalar-valued results of a Series group-by
    pub name: Option<String>,
}

impl GroupByOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parallel(mut self, parallel: ParallelConfig) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_strict_aggregation(mut self, strict: bool) -> Self {
        self.strict_aggregation = strict;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Parse options from a TOML document; missing fields take defaults
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }
}
