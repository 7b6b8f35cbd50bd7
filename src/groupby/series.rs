use rayon::prelude::*;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::{Arc, OnceLock};

use crate::column::{Column, Scalar};
use crate::dataframe::DataFrame;
use crate::error::{Error, Result};
use crate::groupby::combine::{self, Applied, ApplyOutput, Target, TransformFit};
use crate::groupby::grouper::Grouper;
use crate::groupby::grouping::KeySource;
use crate::groupby::kernels::{self, AggFunc};
use crate::groupby::options::GroupByOptions;
use crate::groupby::slicer::GroupCell;
use crate::index::Label;
use crate::series::{Series, SeriesView};

/// A Series split into groups
#[derive(Debug)]
pub struct SeriesGroupBy<'a, T>
where
    T: Debug + Clone,
{
    obj: Cow<'a, Series<T>>,
    grouper: Arc<Grouper>,
    options: GroupByOptions,
    sorted: OnceLock<Series<T>>,
}

fn group_view<'s, T: Debug + Clone>(
    grouper: &Grouper,
    sorted: &'s Series<T>,
    cell: &GroupCell,
) -> SeriesView<'s, T> {
    sorted
        .view(cell.range.clone())
        .with_key(grouper.key(&cell.codes))
}

impl<'a, T> SeriesGroupBy<'a, T>
where
    T: Debug + Clone,
{
    /// Group `obj` with a grouper built over an axis of the same length
    pub fn from_grouper(
        obj: &'a Series<T>,
        grouper: Arc<Grouper>,
        options: GroupByOptions,
    ) -> Result<Self> {
        Self::new(Cow::Borrowed(obj), grouper, options)
    }

    pub(crate) fn new(
        obj: Cow<'a, Series<T>>,
        grouper: Arc<Grouper>,
        options: GroupByOptions,
    ) -> Result<Self> {
        grouper.check_len(obj.len())?;
        Ok(SeriesGroupBy {
            obj,
            grouper,
            options,
            sorted: OnceLock::new(),
        })
    }

    pub fn grouper(&self) -> &Grouper {
        &self.grouper
    }

    pub fn options(&self) -> &GroupByOptions {
        &self.options
    }

    /// Number of groups with at least one row
    pub fn ngroups(&self) -> usize {
        self.grouper.ngroups()
    }

    pub fn len(&self) -> usize {
        self.ngroups()
    }

    pub fn is_empty(&self) -> bool {
        self.ngroups() == 0
    }

    /// Group keys in iteration order
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

    /// Rows per group
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

    /// The grouped values reordered so every group is contiguous
    pub fn sorted(&self) -> &Series<T> {
        self.sorted
            .get_or_init(|| self.obj.take(self.grouper.sort_order()))
    }

    /// `(key, rows)` for every group, in key order
    pub fn iter(&self) -> impl Iterator<Item = (Label, SeriesView<'_, T>)> + '_ {
        let sorted = self.sorted();
        self.grouper.cells().iter().map(move |cell| {
            let view = group_view(&self.grouper, sorted, cell);
            (self.grouper.key_label(view.name().to_vec()), view)
        })
    }

    /// Copy of one group's rows
    pub fn get_group(&self, key: impl Into<Label>) -> Result<Series<T>> {
        let key = key.into();
        let cell = self
            .grouper
            .find(&key)
            .ok_or_else(|| Error::Index(format!("group {} not found", key)))?;
        Ok(self.sorted().view(cell.range.clone()).to_series())
    }

    fn result_name(&self) -> Option<String> {
        self.options
            .name
            .clone()
            .or_else(|| self.obj.name().cloned())
    }

    /// Reduce every group with `f`; results are indexed by group key
    pub fn agg<R, F>(&self, f: F) -> Result<Series<R>>
    where
        R: Debug + Clone,
        F: Fn(&SeriesView<'_, T>) -> R,
    {
        self.try_agg(|group| Ok::<R, Error>(f(group)))
    }

    /// Fallible `agg`; the first error aborts and is returned as is
    pub fn try_agg<R, E, F>(&self, f: F) -> std::result::Result<Series<R>, E>
    where
        R: Debug + Clone,
        E: From<Error>,
        F: Fn(&SeriesView<'_, T>) -> std::result::Result<R, E>,
    {
        let sorted = self.sorted();
        let (ids, values) = combine::aggregate_generic(&self.grouper, |cell| {
            f(&group_view(&self.grouper, sorted, cell))
        })?;
        let index = self.grouper.result_index(&ids)?;
        Ok(Series::with_index(values, index, self.result_name())?)
    }

    /// Call `f` on every group and combine the outputs
    pub fn apply<O, F>(&self, f: F) -> Result<Applied>
    where
        O: Into<ApplyOutput>,
        F: Fn(&SeriesView<'_, T>) -> O,
    {
        self.try_apply(|group| Ok::<O, Error>(f(group)))
    }

    /// Fallible `apply`; the first error aborts and is returned as is
    pub fn try_apply<O, E, F>(&self, f: F) -> std::result::Result<Applied, E>
    where
        O: Into<ApplyOutput>,
        E: From<Error>,
        F: Fn(&SeriesView<'_, T>) -> std::result::Result<O, E>,
    {
        let sorted = self.sorted();
        let cells = self.grouper.cells();
        let outputs = cells
            .iter()
            .map(|cell| f(&group_view(&self.grouper, sorted, cell)).map(Into::into))
            .collect::<std::result::Result<Vec<ApplyOutput>, E>>()?;
        Ok(self.combine(outputs)?)
    }

    fn combine(&self, outputs: Vec<ApplyOutput>) -> Result<Applied> {
        combine::combine_apply(
            &self.grouper,
            self.sorted().index(),
            self.grouper.cells(),
            outputs,
            Target::Series,
            self.result_name(),
        )
    }

    /// Call `f` on every group and scatter the outputs back to the rows
    /// of the group. Each output must carry the group's labels or be a
    /// single value to broadcast; rows without a key keep their value.
    pub fn transform<U, F>(&self, f: F) -> Result<Series<U>>
    where
        U: Debug + Clone + From<T>,
        F: Fn(&SeriesView<'_, T>) -> Series<U>,
    {
        self.try_transform(|group| Ok::<Series<U>, Error>(f(group)))
    }

    /// Fallible `transform`; the first error aborts and is returned as is
    pub fn try_transform<U, E, F>(&self, f: F) -> std::result::Result<Series<U>, E>
    where
        U: Debug + Clone + From<T>,
        E: From<Error>,
        F: Fn(&SeriesView<'_, T>) -> std::result::Result<Series<U>, E>,
    {
        let sorted = self.sorted();
        let outputs = self
            .grouper
            .cells()
            .iter()
            .map(|cell| f(&group_view(&self.grouper, sorted, cell)))
            .collect::<std::result::Result<Vec<_>, E>>()?;
        Ok(self.scatter(outputs, |v| U::from(v.clone()))?)
    }

    fn scatter<U, S>(&self, outputs: Vec<Series<U>>, seed: S) -> Result<Series<U>>
    where
        U: Debug + Clone,
        S: Fn(&T) -> U,
    {
        let sorted = self.sorted();
        let mut values: Vec<U> = self.obj.values().iter().map(seed).collect();

        for (cell, output) in self.grouper.cells().iter().zip(&outputs) {
            let group_index = sorted.index().view(cell.range.clone());
            let key = self.grouper.key_label(self.grouper.key(&cell.codes));
            let positions = self.grouper.positions(cell.range.clone());
            match combine::transform_fit(&group_index, output.index(), &key)? {
                TransformFit::Aligned => {
                    for (&pos, value) in positions.iter().zip(output.values()) {
                        values[pos] = value.clone();
                    }
                }
                TransformFit::Broadcast => {
                    for &pos in positions {
                        values[pos] = output.values()[0].clone();
                    }
                }
            }
        }

        Series::with_index(values, self.obj.index().clone(), self.obj.name().cloned())
    }

    /// Rows whose position within their group is in `pick(group_len)`,
    /// in original row order
    fn filter_rows<P>(&self, pick: P) -> Series<T>
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
        self.obj.take(&rows)
    }

    /// First `n` rows of each group
    pub fn head(&self, n: usize) -> Series<T> {
        self.filter_rows(|len| 0..n.min(len))
    }

    /// Last `n` rows of each group
    pub fn tail(&self, n: usize) -> Series<T> {
        self.filter_rows(|len| len.saturating_sub(n)..len)
    }
}

impl<'a, T> SeriesGroupBy<'a, T>
where
    T: Debug + Clone + Send + Sync,
{
    fn evaluate<R, F>(&self, f: F) -> Result<Vec<R>>
    where
        R: Send,
        F: Fn(&SeriesView<'_, T>) -> R + Send + Sync,
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

    /// `apply` with groups evaluated concurrently; results keep group order
    pub fn par_apply<O, F>(&self, f: F) -> Result<Applied>
    where
        O: Into<ApplyOutput> + Send,
        F: Fn(&SeriesView<'_, T>) -> O + Send + Sync,
    {
        let outputs = self.evaluate(|group| Into::<ApplyOutput>::into(f(group)))?;
        self.combine(outputs)
    }

    /// `transform` with groups evaluated concurrently
    pub fn par_transform<U, F>(&self, f: F) -> Result<Series<U>>
    where
        U: Debug + Clone + From<T> + Send,
        F: Fn(&SeriesView<'_, T>) -> Series<U> + Send + Sync,
    {
        let outputs = self.evaluate(f)?;
        self.scatter(outputs, |v| U::from(v.clone()))
    }
}

impl<'a, T> SeriesGroupBy<'a, T>
where
    T: Debug + Clone + Into<Scalar>,
{
    /// Reduce every group with a built-in reduction.
    ///
    /// The vectorized kernel runs first; data it cannot handle falls back
    /// to a per-group reduction. If that fails too the result is empty,
    /// or the error is returned under strict aggregation.
    pub fn aggregate(&self, func: AggFunc) -> Result<Series<Scalar>> {
        let buffer = Column::from_scalars(
            self.sorted()
                .values()
                .iter()
                .cloned()
                .map(Into::into)
                .collect(),
        );
        let view = buffer.view(0..buffer.len());

        let (ids, values) = match combine::aggregate_vectorized(&self.grouper, view, func) {
            Ok(result) => result,
            Err(err) if err.is_fallback_candidate() => {
                log::debug!("{} kernel unavailable ({}), reducing per group", func, err);
                match combine::aggregate_generic(&self.grouper, |cell| {
                    kernels::reduce(view.slice(cell.range.clone()), func)
                }) {
                    Ok(result) => result,
                    Err(err) if err.is_fallback_candidate() && !self.options.strict_aggregation => {
                        log::warn!(
                            "dropping series '{}' from {} aggregation: {}",
                            self.obj.name().map_or("", String::as_str),
                            func,
                            err
                        );
                        (Vec::new(), Vec::new())
                    }
                    Err(err) => return Err(err),
                }
            }
            Err(err) => return Err(err),
        };

        let index = self.grouper.result_index(&ids)?;
        Series::with_index(values, index, self.result_name())
    }

    pub fn sum(&self) -> Result<Series<Scalar>> {
        self.aggregate(AggFunc::Sum)
    }

    pub fn mean(&self) -> Result<Series<Scalar>> {
        self.aggregate(AggFunc::Mean)
    }

    pub fn min(&self) -> Result<Series<Scalar>> {
        self.aggregate(AggFunc::Min)
    }

    pub fn max(&self) -> Result<Series<Scalar>> {
        self.aggregate(AggFunc::Max)
    }

    pub fn count(&self) -> Result<Series<Scalar>> {
        self.aggregate(AggFunc::Count)
    }

    pub fn std(&self) -> Result<Series<Scalar>> {
        self.aggregate(AggFunc::Std)
    }

    pub fn var(&self) -> Result<Series<Scalar>> {
        self.aggregate(AggFunc::Var)
    }

    pub fn prod(&self) -> Result<Series<Scalar>> {
        self.aggregate(AggFunc::Prod)
    }

    pub fn first(&self) -> Result<Series<Scalar>> {
        self.aggregate(AggFunc::First)
    }

    pub fn last(&self) -> Result<Series<Scalar>> {
        self.aggregate(AggFunc::Last)
    }

    /// Several reductions at once, one column per reduction
    pub fn agg_many(&self, funcs: &[AggFunc]) -> Result<DataFrame> {
        let index = self.grouper.result_index(&self.grouper.occupied_ids())?;
        let mut frame = DataFrame::with_index(index);
        for &func in funcs {
            let result = self.aggregate(func)?;
            if result.len() == self.ngroups() {
                frame.add_column(func.name(), Column::from_scalars(result.into_values()))?;
            }
        }
        Ok(frame)
    }

    /// Several user reductions at once, one column per given name
    pub fn agg_named(
        &self,
        funcs: &[(&str, &dyn Fn(&SeriesView<'_, T>) -> Scalar)],
    ) -> Result<DataFrame> {
        let index = self.grouper.result_index(&self.grouper.occupied_ids())?;
        let mut frame = DataFrame::with_index(index);
        for (name, f) in funcs {
            let result = self.agg(|group| f(group))?;
            frame.add_column(*name, Column::from_scalars(result.into_values()))?;
        }
        Ok(frame)
    }

    /// Running sum within each group; NaN stays NaN and is skipped
    pub fn cumsum(&self) -> Result<Series<f64>> {
        let to_f64 = |v: &T| -> f64 {
            let scalar: Scalar = v.clone().into();
            scalar.as_f64().unwrap_or(f64::NAN)
        };
        let sorted = self.sorted();
        let outputs: Vec<Series<f64>> = self
            .grouper
            .cells()
            .iter()
            .map(|cell| {
                let mut total = 0.0;
                group_view(&self.grouper, sorted, cell).map(|v| {
                    let x = to_f64(v);
                    if x.is_nan() {
                        f64::NAN
                    } else {
                        total += x;
                        total
                    }
                })
            })
            .collect();
        self.scatter(outputs, to_f64)
    }
}

impl<T> Series<T>
where
    T: Debug + Clone,
{
    /// Group by a single key
    pub fn group_by(&self, key: impl Into<KeySource>) -> Result<SeriesGroupBy<'_, T>> {
        self.group_by_with(vec![key.into()], GroupByOptions::default())
    }

    /// Group by several keys; the first is the outermost
    pub fn group_by_keys(&self, keys: Vec<KeySource>) -> Result<SeriesGroupBy<'_, T>> {
        self.group_by_with(keys, GroupByOptions::default())
    }

    pub fn group_by_with(
        &self,
        keys: Vec<KeySource>,
        options: GroupByOptions,
    ) -> Result<SeriesGroupBy<'_, T>> {
        let (grouper, _) = Grouper::from_keys(self.index(), keys, None)?;
        SeriesGroupBy::new(Cow::Borrowed(self), Arc::new(grouper), options)
    }
}
