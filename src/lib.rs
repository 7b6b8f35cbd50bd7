#![allow(clippy::needless_lifetimes)]
#![allow(clippy::too_many_arguments)]

pub mod column;
pub mod dataframe;
pub mod error;
pub mod groupby;
pub mod index;
pub mod na;
pub mod series;

// Re-export commonly used types
pub use column::{Column, ColumnType, ColumnView, Scalar};
pub use dataframe::{DataFrame, FrameView};
pub use error::{Error, PandRSError, Result};
pub use groupby::{
    AggFunc, Applied, ApplyOutput, DataFrameGroupBy, GroupByOptions, Grouper, Grouping, KeySource,
    OutputKind, ParallelConfig, SeriesGroupBy,
};
pub use index::{DataFrameIndex, Index, IndexView, Label, MultiIndex};
pub use na::NA;
pub use series::{Series, SeriesView};

// Export version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
