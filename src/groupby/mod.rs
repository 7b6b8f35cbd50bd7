//! Split-apply-combine.
//!
//! Rows are split by one or more keys into groups, a reduction or user
//! function runs on every group, and the outputs are combined into a
//! Series or DataFrame indexed by group key.
//!
//! The split is sort based: every key is factorized into dense codes, rows
//! are stably sorted by their code tuple, and each group becomes a
//! contiguous range of the sorted buffer. Groups are visited in key order.
//!
//! ```ignore
//! let df = DataFrame::new()
//!     .with_column("city", vec!["Tokyo", "Osaka", "Tokyo"])?
//!     .with_column("sales", vec![10.0, 7.0, 5.0])?;
//! let totals = df.group_by("city")?.sum()?;
//! ```

mod combine;
mod frame;
mod grouper;
mod grouping;
mod hierarchical;
mod indexer;
mod kernels;
mod label_sort;
mod options;
mod series;
mod slicer;

pub use combine::{Applied, ApplyOutput, OutputKind};
pub use frame::DataFrameGroupBy;
pub use grouper::Grouper;
pub use grouping::{Grouping, KeyFn, KeySource};
pub use hierarchical::stacked_index;
pub use indexer::{group_space_size, lexsort, GroupIndexer};
pub use kernels::{group_aggregate, reduce, AggFunc};
pub use label_sort::{group_labels, sort_group_labels, GroupLabels};
pub use options::{GroupByOptions, ParallelConfig};
pub use series::SeriesGroupBy;
pub use slicer::{GroupCell, GroupSlicer};

use crate::error::Result;
use crate::index::DataFrameIndex;

/// Build a grouper over a bare axis.
///
/// Column keys need a DataFrame and fail here with `Configuration`.
pub fn group_by(axis: &DataFrameIndex, keys: Vec<KeySource>) -> Result<Grouper> {
    Grouper::from_keys(axis, keys, None).map(|(grouper, _)| grouper)
}
