use rayon::prelude::*;
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, OnceLock};

use crate::column::{Column, ColumnView, Scalar};
use crate::dataframe::{DataFrame, FrameView};
use crate::error::{Error, Result};
use crate::groupby::combine::{self, Applied, ApplyOutput, Target, TransformFit};
use crate::groupby::grouper::Grouper;
use crate::groupby::grouping::KeySource;
use crate::groupby::kernels::{self, AggFunc};
use crate::groupby::options::GroupByOptions;
use crate::groupby::series::SeriesGroupBy;
use crate::groupby::slicer::GroupCell;
use crate::index::{DataFrameIndex, Label};
use crate::series::Series;

/// A DataFrame split into groups.
///
/// Columns used as keys are left out of the grouped data. When columns
/// are grouped the grouped object is the transposed frame, and frame
/// results are turned back so rows keep their original labels.
#[derive(Debug)]
pub struct DataFrameGroupBy<'a> {
    obj: Cow<'a, DataFrame>,
    grouper: Arc<Grouper>,
    exclusions: Vec<String>,
    options: GroupByOptions,
    sorted: OnceLock<DataFrame>,
    column_axis: Option<ColumnAxis>,
}

/// Row labels of a frame whose columns are grouped
#[derive(Debug)]
struct ColumnAxis {
    index_name: Option<String>,
    row_labels: HashMap<String, Label>,
}

fn group_view<'s>(grouper: &Grouper, sorted: &'s DataFrame, cell: &GroupCell) -> FrameView<'s> {
    sorted
        .view(cell.range.clone())
        .with_key(grouper.key(&cell.codes))
}

impl<'a> DataFrameGroupBy<'a> {
    /// Group `obj` with a grouper built over an axis of the same length
    pub fn from_grouper(
        obj: &'a DataFrame,
        grouper: Arc<Grouper>,
        options: GroupByOptions,
    ) -> Result<Self> {
        Self::new(Cow::Borrowed(obj), grouper, Vec::new(), options)
    }

    pub(crate) fn new(
        obj: Cow<'a, DataFrame>,
        grouper: Arc<Grouper>,
        exclusions: Vec<String>,
        options: GroupByOptions,
    ) -> Result<Self> {
        grouper.check_len(obj.row_count())?;
        Ok(DataFrameGroupBy {
            obj,
            grouper,
            exclusions,
            options,
            sorted: OnceLock::new(),
            column_axis: None,
        })
    }

    /// Whether columns rather than rows are grouped
    pub fn groups_columns(&self) -> bool {
        self.column_axis.is_some()
    }

    /// Turn a frame computed over grouped columns back around
    fn restore(&self, frame: DataFrame) -> DataFrame {
        match &self.column_axis {
            Some(axis) => frame.transpose_with(axis.index_name.clone(), |name| {
                axis.row_labels
                    .get(name)
                    .cloned()
                    .unwrap_or_else(|| Label::from(name))
            }),
            None => frame,
        }
    }

    pub fn grouper(&self) -> &Grouper {
        &self.grouper
    }

    pub fn options(&self) -> &GroupByOptions {
        &self.options
    }

    /// Key columns left out of the grouped data
    pub fn exclusions(&self) -> &[String] {
        &self.exclusions
    }

    pub fn ngroups(&self) -> usize {
        self.grouper.ngroups()
    }

    pub fn len(&self) -> usize {
        self.ngroups()
    }

    pub fn is_empty(&self) -> bool {
        self.ngroups() == 0
    }

    pub fn keys(&self) -> Vec<Label> {
        self.grouper.iter().map(|(key, _)| key).collect()
    }

    /// Group key to the row labels of its members
    pub fn groups(&self) -> BTreeMap<Label, Vec<Label>> {
        self.grouper
            .iter()
            .map(|(key, range)| {
                let labels = self
                    .grouper
                    .positions(range)
                    .iter()
                    .filter_map(|&pos| self.obj.index().get(pos))
                    .collect();
                (key, labels)
            })
            .collect()
    }

    /// Group key to the row positions of its members
    pub fn indices(&self) -> BTreeMap<Label, Vec<usize>> {
        self.grouper
            .iter()
            .map(|(key, range)| (key, self.grouper.positions(range).to_vec()))
            .collect()
    }

    pub fn size(&self) -> Result<Series<i64>> {
        let counts = self
            .grouper
            .cells()
            .iter()
            .map(|cell| cell.len() as i64)
            .collect();
        let index = self.grouper.result_index(&self.grouper.occupied_ids())?;
        Series::with_index(counts, index, Some("size".to_string()))
    }

    /// The grouped columns reordered so every group is contiguous
    pub fn sorted(&self) -> &DataFrame {
        self.sorted.get_or_init(|| {
            self.obj
                .drop_columns(&self.exclusions)
                .take(self.grouper.sort_order())
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (Label, FrameView<'_>)> + '_ {
        let sorted = self.sorted();
        self.grouper.cells().iter().map(move |cell| {
            let view = group_view(&self.grouper, sorted, cell);
            (self.grouper.key_label(view.name().to_vec()), view)
        })
    }

    /// Copy of one group's rows
    pub fn get_group(&self, key: impl Into<Label>) -> Result<DataFrame> {
        let key = key.into();
        let cell = self
            .grouper
            .find(&key)
            .ok_or_else(|| Error::Index(format!("group {} not found", key)))?;
        Ok(self.restore(self.sorted().view(cell.range.clone()).to_frame()))
    }

    /// Group one column by the same keys
    pub fn select(&self, column: &str) -> Result<SeriesGroupBy<'a, Scalar>> {
        let series = self.obj.column_series(column)?;
        SeriesGroupBy::new(Cow::Owned(series), self.grouper.clone(), self.options.clone())
    }

    fn result_frame(&self, ids: &[usize]) -> Result<DataFrame> {
        Ok(DataFrame::with_index(self.grouper.result_index(ids)?))
    }

    /// Reduce every column with a built-in reduction.
    ///
    /// Tries the vectorized kernel on all columns, then a per-group
    /// reduction of all columns, then each column on its own. Columns no
    /// strategy can reduce are dropped unless aggregation is strict.
    pub fn aggregate(&self, func: AggFunc) -> Result<DataFrame> {
        let frame = match self.aggregate_vectorized(func) {
            Ok(frame) => frame,
            Err(err) if err.is_fallback_candidate() => {
                log::debug!("{} kernel unavailable ({}), reducing per group", func, err);
                self.aggregate_chain(Some(func), |view| kernels::reduce(view, func))?
            }
            Err(err) => return Err(err),
        };
        Ok(self.restore(frame))
    }

    fn aggregate_vectorized(&self, func: AggFunc) -> Result<DataFrame> {
        let sorted = self.sorted();
        let mut frame = self.result_frame(&self.grouper.occupied_ids())?;
        for (name, column) in sorted.columns() {
            let (_, values) =
                combine::aggregate_vectorized(&self.grouper, column.view(0..column.len()), func)?;
            frame.add_column(name, Column::from_scalars(values))?;
        }
        Ok(frame)
    }

    /// Reduce every column of every group with `f`.
    ///
    /// Only `AggregationType` and `ShapeMismatch` errors from `f` lead to
    /// the column-by-column retry; any other error is returned.
    pub fn agg<F>(&self, f: F) -> Result<DataFrame>
    where
        F: Fn(ColumnView<'_>) -> Result<Scalar>,
    {
        Ok(self.restore(self.aggregate_chain(None, f)?))
    }

    fn aggregate_chain<F>(&self, func: Option<AggFunc>, f: F) -> Result<DataFrame>
    where
        F: Fn(ColumnView<'_>) -> Result<Scalar>,
    {
        let sorted = self.sorted();
        let whole = combine::aggregate_generic(&self.grouper, |cell| {
            sorted
                .columns()
                .map(|(_, column)| f(column.view(cell.range.clone())))
                .collect::<Result<Vec<Scalar>>>()
        });

        match whole {
            Ok((ids, rows)) => {
                let mut frame = self.result_frame(&ids)?;
                for (j, name) in sorted.column_names().iter().enumerate() {
                    let values = rows.iter().map(|row| row[j].clone()).collect();
                    frame.add_column(name.as_str(), Column::from_scalars(values))?;
                }
                Ok(frame)
            }
            Err(err) if err.is_fallback_candidate() => {
                log::debug!("aggregating columns one at a time: {}", err);
                self.aggregate_by_column(func, &f)
            }
            Err(err) => Err(err),
        }
    }

    fn aggregate_by_column<F>(&self, func: Option<AggFunc>, f: &F) -> Result<DataFrame>
    where
        F: Fn(ColumnView<'_>) -> Result<Scalar>,
    {
        let sorted = self.sorted();
        let mut frame = self.result_frame(&self.grouper.occupied_ids())?;

        for (name, column) in sorted.columns() {
            let view = column.view(0..column.len());
            let generic = || {
                combine::aggregate_generic(&self.grouper, |cell| f(view.slice(cell.range.clone())))
            };
            let attempt = match func {
                Some(func) => match combine::aggregate_vectorized(&self.grouper, view, func) {
                    Err(err) if err.is_fallback_candidate() => generic(),
                    other => other,
                },
                None => generic(),
            };

            match attempt {
                Ok((_, values)) => frame.add_column(name, Column::from_scalars(values))?,
                Err(err) if err.is_fallback_candidate() && !self.options.strict_aggregation => {
                    log::warn!("dropping column '{}' from aggregation: {}", name, err);
                }
                Err(err) => return Err(err),
            }
        }
        Ok(frame)
    }

    pub fn sum(&self) -> Result<DataFrame> {
        self.aggregate(AggFunc::Sum)
    }

    pub fn mean(&self) -> Result<DataFrame> {
        self.aggregate(AggFunc::Mean)
    }

    pub fn min(&self) -> Result<DataFrame> {
        self.aggregate(AggFunc::Min)
    }

    pub fn max(&self) -> Result<DataFrame> {
        self.aggregate(AggFunc::Max)
    }

    pub fn count(&self) -> Result<DataFrame> {
        self.aggregate(AggFunc::Count)
    }

    pub fn std(&self) -> Result<DataFrame> {
        self.aggregate(AggFunc::Std)
    }

    pub fn var(&self) -> Result<DataFrame> {
        self.aggregate(AggFunc::Var)
    }

    pub fn prod(&self) -> Result<DataFrame> {
        self.aggregate(AggFunc::Prod)
    }

    pub fn first(&self) -> Result<DataFrame> {
        self.aggregate(AggFunc::First)
    }

    pub fn last(&self) -> Result<DataFrame> {
        self.aggregate(AggFunc::Last)
    }

    /// A reduction per column. A column listed more than once gets one
    /// output column per reduction, named `{column}_{reduction}`.
    pub fn agg_columns(&self, plan: &[(&str, AggFunc)]) -> Result<DataFrame> {
        let mut frame = self.result_frame(&self.grouper.occupied_ids())?;
        for &(column, func) in plan {
            let repeated = plan.iter().filter(|(c, _)| *c == column).count() > 1;
            let name = if repeated {
                format!("{}_{}", column, func)
            } else {
                column.to_string()
            };
            let result = self.select(column)?.aggregate(func)?;
            if result.len() == self.ngroups() {
                frame.add_column(name, Column::from_scalars(result.into_values()))?;
            }
        }
        Ok(self.restore(frame))
    }

    /// Call `f` on every group and combine the outputs
    pub fn apply<O, F>(&self, f: F) -> Result<Applied>
    where
        O: Into<ApplyOutput>,
        F: Fn(&FrameView<'_>) -> O,
    {
        self.try_apply(|group| Ok::<O, Error>(f(group)))
    }

    /// Fallible `apply`; the first error aborts and is returned as is
    pub fn try_apply<O, E, F>(&self, f: F) -> std::result::Result<Applied, E>
    where
        O: Into<ApplyOutput>,
        E: From<Error>,
        F: Fn(&FrameView<'_>) -> std::result::Result<O, E>,
    {
        let sorted = self.sorted();
        let outputs = self
            .grouper
            .cells()
            .iter()
            .map(|cell| f(&group_view(&self.grouper, sorted, cell)).map(Into::into))
            .collect::<std::result::Result<Vec<ApplyOutput>, E>>()?;
        Ok(self.combine(outputs)?)
    }

    /// `apply` with groups evaluated concurrently; results keep group order
    pub fn par_apply<O, F>(&self, f: F) -> Result<Applied>
    where
        O: Into<ApplyOutput> + Send,
        F: Fn(&FrameView<'_>) -> O + Send + Sync,
    {
        let outputs = self.evaluate(|group| Into::<ApplyOutput>::into(f(group)))?;
        self.combine(outputs)
    }

    fn combine(&self, outputs: Vec<ApplyOutput>) -> Result<Applied> {
        let applied = combine::combine_apply(
            &self.grouper,
            self.sorted().index(),
            self.grouper.cells(),
            outputs,
            Target::Frame,
            self.options.name.clone(),
        )?;
        Ok(match applied {
            Applied::Frame(frame) => Applied::Frame(self.restore(frame)),
            series => series,
        })
    }

    fn evaluate<R, F>(&self, f: F) -> Result<Vec<R>>
    where
        R: Send,
        F: Fn(&FrameView<'_>) -> R + Send + Sync,
    {
        let sorted = self.sorted();
        let cells = self.grouper.cells();
        let grouper: &Grouper = &self.grouper;
        let parallel = &self.options.parallel;

        if !parallel.should_parallelize(cells.len()) {
            return Ok(cells
                .iter()
                .map(|cell| f(&group_view(grouper, sorted, cell)))
                .collect());
        }

        log::debug!(
            "evaluating {} groups on {} threads",
            cells.len(),
            parallel.threads()
        );
        parallel.install(|| {
            cells
                .par_iter()
                .map(|cell| f(&group_view(grouper, sorted, cell)))
                .collect()
        })
    }

    /// Call `f` on every group and scatter the outputs back to the rows
    /// of the group.
    ///
    /// Every output must have the same columns and either the group's
    /// labels or a single row to broadcast. Rows without a key keep their
    /// original values.
    pub fn transform<F>(&self, f: F) -> Result<DataFrame>
    where
        F: Fn(&FrameView<'_>) -> DataFrame,
    {
        self.try_transform(|group| Ok::<DataFrame, Error>(f(group)))
    }

    /// Fallible `transform`; the first error aborts and is returned as is
    pub fn try_transform<E, F>(&self, f: F) -> std::result::Result<DataFrame, E>
    where
        E: From<Error>,
        F: Fn(&FrameView<'_>) -> std::result::Result<DataFrame, E>,
    {
        let sorted = self.sorted();
        let outputs = self
            .grouper
            .cells()
            .iter()
            .map(|cell| f(&group_view(&self.grouper, sorted, cell)))
            .collect::<std::result::Result<Vec<_>, E>>()?;
        Ok(self.scatter(outputs)?)
    }

    /// `transform` with groups evaluated concurrently
    pub fn par_transform<F>(&self, f: F) -> Result<DataFrame>
    where
        F: Fn(&FrameView<'_>) -> DataFrame + Send + Sync,
    {
        let outputs = self.evaluate(f)?;
        self.scatter(outputs)
    }

    fn scatter(&self, outputs: Vec<DataFrame>) -> Result<DataFrame> {
        let sorted = self.sorted();
        let columns: Vec<String> = match outputs.first() {
            Some(first) => first.column_names().to_vec(),
            None => sorted.column_names().to_vec(),
        };

        let n = self.obj.row_count();
        let mut seeded: Vec<Vec<Scalar>> = columns
            .iter()
            .map(|name| match self.obj.column(name) {
                Ok(column) => column.to_scalars(),
                Err(_) => vec![Scalar::Null; n],
            })
            .collect();

        for (cell, output) in self.grouper.cells().iter().zip(&outputs) {
            if output.column_names() != columns.as_slice() {
                return Err(Error::ShapeMismatch(format!(
                    "transform returned columns {:?} after {:?}",
                    output.column_names(),
                    columns
                )));
            }

            let key = self.grouper.key_label(self.grouper.key(&cell.codes));
            let group_index = sorted.index().view(cell.range.clone());
            let fit = combine::transform_fit(&group_index, output.index(), &key)?;
            let positions = self.grouper.positions(cell.range.clone());

            for (target, name) in seeded.iter_mut().zip(&columns) {
                let column = output.column(name)?;
                for (i, &pos) in positions.iter().enumerate() {
                    let row = match fit {
                        TransformFit::Aligned => i,
                        TransformFit::Broadcast => 0,
                    };
                    target[pos] = column.get(row).unwrap_or(Scalar::Null);
                }
            }
        }

        let data = seeded.into_iter().map(Column::from_scalars).collect();
        let frame = DataFrame::from_parts(columns, data, self.obj.index().clone())?;
        Ok(self.restore(frame))
    }

    fn filter_rows<P>(&self, pick: P) -> DataFrame
    where
        P: Fn(usize) -> std::ops::Range<usize>,
    {
        let mut rows: Vec<usize> = self
            .grouper
            .cells()
            .iter()
            .flat_map(|cell| {
                let positions = self.grouper.positions(cell.range.clone());
                positions[pick(positions.len())].iter().copied()
            })
            .collect();
        rows.sort_unstable();
        self.restore(self.obj.take(&rows))
    }

    /// First `n` rows of each group, in original row order
    pub fn head(&self, n: usize) -> DataFrame {
        self.filter_rows(|len| 0..n.min(len))
    }

    /// Last `n` rows of each group, in original row order
    pub fn tail(&self, n: usize) -> DataFrame {
        self.filter_rows(|len| len.saturating_sub(n)..len)
    }
}

impl DataFrame {
    /// Group rows by a single key
    pub fn group_by(&self, key: impl Into<KeySource>) -> Result<DataFrameGroupBy<'_>> {
        self.group_by_with(vec![key.into()], GroupByOptions::default())
    }

    /// Group rows by several keys; the first is the outermost
    pub fn group_by_keys(&self, keys: Vec<KeySource>) -> Result<DataFrameGroupBy<'_>> {
        self.group_by_with(keys, GroupByOptions::default())
    }

    pub fn group_by_with(
        &self,
        keys: Vec<KeySource>,
        options: GroupByOptions,
    ) -> Result<DataFrameGroupBy<'_>> {
        let (grouper, exclusions) = Grouper::from_keys(self.index(), keys, Some(self))?;
        DataFrameGroupBy::new(Cow::Borrowed(self), Arc::new(grouper), exclusions, options)
    }

    /// Group columns by a single key over the column names
    pub fn group_by_columns(&self, key: impl Into<KeySource>) -> Result<DataFrameGroupBy<'_>> {
        self.group_by_columns_with(vec![key.into()], GroupByOptions::default())
    }

    /// Group columns instead of rows.
    ///
    /// Keys are resolved against the column names; column keys are not
    /// available. Frame results keep the original row labels and gain one
    /// column per group.
    pub fn group_by_columns_with(
        &self,
        keys: Vec<KeySource>,
        options: GroupByOptions,
    ) -> Result<DataFrameGroupBy<'_>> {
        let labels = self.index().labels();
        let row_labels: HashMap<String, Label> = labels
            .iter()
            .map(|label| (label.to_string(), label.clone()))
            .collect();
        if row_labels.len() != labels.len() {
            return Err(Error::Configuration(
                "grouping columns needs distinct row labels".into(),
            ));
        }
        let index_name = match self.index() {
            DataFrameIndex::Simple(idx) => idx.name().cloned(),
            DataFrameIndex::Multi(_) => None,
        };

        let transposed = self.transpose();
        let (grouper, _) = Grouper::from_keys(transposed.index(), keys, None)?;
        log::debug!(
            "grouping {} columns into {} groups",
            transposed.row_count(),
            grouper.ngroups()
        );
        let mut grouped =
            DataFrameGroupBy::new(Cow::Owned(transposed), Arc::new(grouper), Vec::new(), options)?;
        grouped.column_axis = Some(ColumnAxis {
            index_name,
            row_labels,
        });
        Ok(grouped)
    }
}
