//! Reassembly of per-group results.
//!
//! Apply outputs are tagged by kind once per call, from the first group;
//! every later group must produce the same kind. Aggregations write into
//! dense buffers over the flat group-id range and mask out unoccupied ids.

use crate::column::{Column, ColumnView, Scalar};
use crate::dataframe::DataFrame;
use crate::error::{Error, Result};
use crate::groupby::grouper::Grouper;
use crate::groupby::hierarchical;
use crate::groupby::kernels::{self, AggFunc};
use crate::groupby::slicer::GroupCell;
use crate::index::{DataFrameIndex, IndexView, Label};
use crate::series::Series;

/// What a function passed to `apply` returned for one group
#[derive(Debug, Clone, PartialEq)]
pub enum ApplyOutput {
    Scalar(Scalar),
    Series(Series<Scalar>),
    Frame(DataFrame),
}

/// Tag of an [`ApplyOutput`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Scalar,
    Series,
    Frame,
}

impl std::fmt::Display for OutputKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            OutputKind::Scalar => "scalar",
            OutputKind::Series => "series",
            OutputKind::Frame => "frame",
        })
    }
}

impl ApplyOutput {
    pub fn kind(&self) -> OutputKind {
        match self {
            ApplyOutput::Scalar(_) => OutputKind::Scalar,
            ApplyOutput::Series(_) => OutputKind::Series,
            ApplyOutput::Frame(_) => OutputKind::Frame,
        }
    }
}

impl From<Scalar> for ApplyOutput {
    fn from(value: Scalar) -> Self {
        ApplyOutput::Scalar(value)
    }
}

impl From<f64> for ApplyOutput {
    fn from(value: f64) -> Self {
        ApplyOutput::Scalar(Scalar::Float64(value))
    }
}

impl From<i64> for ApplyOutput {
    fn from(value: i64) -> Self {
        ApplyOutput::Scalar(Scalar::Int64(value))
    }
}

impl From<usize> for ApplyOutput {
    fn from(value: usize) -> Self {
        ApplyOutput::Scalar(Scalar::Int64(value as i64))
    }
}

impl From<bool> for ApplyOutput {
    fn from(value: bool) -> Self {
        ApplyOutput::Scalar(Scalar::Boolean(value))
    }
}

impl From<String> for ApplyOutput {
    fn from(value: String) -> Self {
        ApplyOutput::Scalar(Scalar::String(value))
    }
}

impl From<Series<Scalar>> for ApplyOutput {
    fn from(series: Series<Scalar>) -> Self {
        ApplyOutput::Series(series)
    }
}

impl From<Series<f64>> for ApplyOutput {
    fn from(series: Series<f64>) -> Self {
        ApplyOutput::Series(series.map(|&v| Scalar::Float64(v)))
    }
}

impl From<Series<i64>> for ApplyOutput {
    fn from(series: Series<i64>) -> Self {
        ApplyOutput::Series(series.map(|&v| Scalar::Int64(v)))
    }
}

impl From<DataFrame> for ApplyOutput {
    fn from(frame: DataFrame) -> Self {
        ApplyOutput::Frame(frame)
    }
}

/// Combined result of `apply`
#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    Series(Series<Scalar>),
    Frame(DataFrame),
}

impl Applied {
    pub fn is_frame(&self) -> bool {
        matches!(self, Applied::Frame(_))
    }

    pub fn as_series(&self) -> Option<&Series<Scalar>> {
        match self {
            Applied::Series(s) => Some(s),
            Applied::Frame(_) => None,
        }
    }

    pub fn as_frame(&self) -> Option<&DataFrame> {
        match self {
            Applied::Frame(df) => Some(df),
            Applied::Series(_) => None,
        }
    }

    pub fn into_series(self) -> Result<Series<Scalar>> {
        match self {
            Applied::Series(s) => Ok(s),
            Applied::Frame(_) => Err(Error::ShapeMismatch(
                "apply produced a DataFrame, not a Series".into(),
            )),
        }
    }

    pub fn into_frame(self) -> Result<DataFrame> {
        match self {
            Applied::Frame(df) => Ok(df),
            Applied::Series(_) => Err(Error::ShapeMismatch(
                "apply produced a Series, not a DataFrame".into(),
            )),
        }
    }
}

/// Kind of object that was grouped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Target {
    Series,
    Frame,
}

/// Combine one output per occupied cell.
///
/// `sorted_index` is the index of the sorted buffer the cells refer to.
pub(crate) fn combine_apply(
    grouper: &Grouper,
    sorted_index: &DataFrameIndex,
    cells: &[GroupCell],
    outputs: Vec<ApplyOutput>,
    target: Target,
    name: Option<String>,
) -> Result<Applied> {
    let first_kind = match outputs.first() {
        Some(first) => first.kind(),
        None => {
            let index = grouper.result_index(&[])?;
            return Ok(Applied::Series(Series::with_index(Vec::new(), index, name)?));
        }
    };

    if let Some((cell, out)) = cells
        .iter()
        .zip(&outputs)
        .find(|(_, out)| out.kind() != first_kind)
    {
        return Err(Error::ShapeMismatch(format!(
            "group {} returned a {} where earlier groups returned a {}",
            grouper.key_label(grouper.key(&cell.codes)),
            out.kind(),
            first_kind
        )));
    }

    match first_kind {
        OutputKind::Scalar => {
            let values = outputs
                .into_iter()
                .filter_map(|out| match out {
                    ApplyOutput::Scalar(v) => Some(v),
                    _ => None,
                })
                .collect();
            let flat: Vec<usize> = cells
                .iter()
                .map(|cell| grouper.indexer().ravel(&cell.codes))
                .collect();
            let index = grouper.result_index(&flat)?;
            Ok(Applied::Series(Series::with_index(values, index, name)?))
        }
        OutputKind::Series => {
            let series: Vec<Series<Scalar>> = outputs
                .into_iter()
                .filter_map(|out| match out {
                    ApplyOutput::Series(s) => Some(s),
                    _ => None,
                })
                .collect();
            combine_series(grouper, sorted_index, cells, series, target, name)
        }
        OutputKind::Frame => {
            let frames: Vec<DataFrame> = outputs
                .into_iter()
                .filter_map(|out| match out {
                    ApplyOutput::Frame(df) => Some(df),
                    _ => None,
                })
                .collect();
            combine_frames(grouper, sorted_index, cells, frames)
        }
    }
}

/// Whether every output carries exactly the labels of its group
fn indexed_same(
    sorted_index: &DataFrameIndex,
    cells: &[GroupCell],
    indexes: &[DataFrameIndex],
) -> bool {
    cells.len() == indexes.len()
        && cells
            .iter()
            .zip(indexes)
            .all(|(cell, index)| sorted_index.view(cell.range.clone()).equals_index(index))
}

/// Permutation that puts concatenated group pieces back in original row order
fn row_order(grouper: &Grouper, cells: &[GroupCell]) -> Vec<usize> {
    let positions: Vec<usize> = cells
        .iter()
        .flat_map(|cell| grouper.positions(cell.range.clone()).iter().copied())
        .collect();
    let mut order: Vec<usize> = (0..positions.len()).collect();
    order.sort_by_key(|&i| positions[i]);
    order
}

fn group_keys(grouper: &Grouper, cells: &[GroupCell]) -> Vec<Vec<Label>> {
    cells.iter().map(|cell| grouper.key(&cell.codes)).collect()
}

fn combine_series(
    grouper: &Grouper,
    sorted_index: &DataFrameIndex,
    cells: &[GroupCell],
    series: Vec<Series<Scalar>>,
    target: Target,
    name: Option<String>,
) -> Result<Applied> {
    let indexes: Vec<DataFrameIndex> = series.iter().map(|s| s.index().clone()).collect();
    let name = name.or_else(|| series[0].name().cloned());

    if indexed_same(sorted_index, cells, &indexes) {
        let values: Vec<Scalar> = series.into_iter().flat_map(Series::into_values).collect();
        let index = DataFrameIndex::concat(&indexes)?;
        let combined = Series::with_index(values, index, name)?;
        return Ok(Applied::Series(combined.take(&row_order(grouper, cells))));
    }

    if target == Target::Frame && indexes.iter().all(|idx| idx.equals(&indexes[0])) {
        // one row per group, one column per label of the shared index
        let flat: Vec<usize> = cells
            .iter()
            .map(|cell| grouper.indexer().ravel(&cell.codes))
            .collect();
        let mut frame = DataFrame::with_index(grouper.result_index(&flat)?);
        for (j, label) in indexes[0].labels().into_iter().enumerate() {
            let column: Vec<Scalar> = series.iter().map(|s| s.values()[j].clone()).collect();
            frame.add_column(label.to_string(), Column::from_scalars(column))?;
        }
        return Ok(Applied::Frame(frame));
    }

    let index = hierarchical::stacked_index(
        grouper.groupings(),
        &group_keys(grouper, cells),
        &indexes,
    )?;
    let values = series.into_iter().flat_map(Series::into_values).collect();
    Ok(Applied::Series(Series::with_index(values, index, name)?))
}

fn combine_frames(
    grouper: &Grouper,
    sorted_index: &DataFrameIndex,
    cells: &[GroupCell],
    frames: Vec<DataFrame>,
) -> Result<Applied> {
    let indexes: Vec<DataFrameIndex> = frames.iter().map(|df| df.index().clone()).collect();

    if indexed_same(sorted_index, cells, &indexes) {
        let index = DataFrameIndex::concat(&indexes)?;
        let combined = concat_frames(&frames, index)?;
        return Ok(Applied::Frame(combined.take(&row_order(grouper, cells))));
    }

    let index = hierarchical::stacked_index(
        grouper.groupings(),
        &group_keys(grouper, cells),
        &indexes,
    )?;
    Ok(Applied::Frame(concat_frames(&frames, index)?))
}

/// Stack frames with identical columns under a prepared index
fn concat_frames(frames: &[DataFrame], index: DataFrameIndex) -> Result<DataFrame> {
    let columns = frames[0].column_names().to_vec();
    if let Some(other) = frames.iter().find(|df| df.column_names() != columns.as_slice()) {
        return Err(Error::ShapeMismatch(format!(
            "apply returned frames with columns {:?} and {:?}",
            columns,
            other.column_names()
        )));
    }

    let mut data = Vec::with_capacity(columns.len());
    for name in &columns {
        let parts = frames
            .iter()
            .map(|df| df.column(name).map(|c| c.view(0..c.len())))
            .collect::<Result<Vec<ColumnView<'_>>>>()?;
        data.push(Column::concat(&parts));
    }
    DataFrame::from_parts(columns, data, index)
}

/// How a transform output lines up with its group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TransformFit {
    /// Same labels as the group, element for element
    Aligned,
    /// A single row repeated over the group
    Broadcast,
}

pub(crate) fn transform_fit(
    group_index: &IndexView<'_>,
    output_index: &DataFrameIndex,
    key: &Label,
) -> Result<TransformFit> {
    if group_index.equals_index(output_index) {
        Ok(TransformFit::Aligned)
    } else if output_index.len() == 1 {
        Ok(TransformFit::Broadcast)
    } else {
        Err(Error::ShapeMismatch(format!(
            "transform of group {} returned {} rows not indexed like its {} input rows",
            key,
            output_index.len(),
            group_index.len()
        )))
    }
}

/// Vectorized aggregation of a sorted buffer: flat ids of the occupied
/// groups and one result per group.
///
/// The float kernel only sees float data for `Min`, `Max`, `First` and
/// `Last`; other buffers pick their cells per group so integers and
/// booleans come back unchanged.
pub(crate) fn aggregate_vectorized(
    grouper: &Grouper,
    sorted: ColumnView<'_>,
    func: AggFunc,
) -> Result<(Vec<usize>, Vec<Scalar>)> {
    if func.picks_cell() && !matches!(sorted, ColumnView::Float64(_)) {
        return aggregate_generic(grouper, |cell| {
            kernels::reduce(sorted.slice(cell.range.clone()), func)
        });
    }

    let values = sorted.to_f64()?;
    let (result, counts) = kernels::group_aggregate(
        &values,
        grouper.sorted_group_ids(),
        grouper.indexer().space_size(),
        func,
    );

    Ok(result
        .into_iter()
        .zip(counts)
        .enumerate()
        .filter(|(_, (_, count))| *count > 0)
        .map(|(id, (value, _))| {
            let value = if func == AggFunc::Count {
                Scalar::Int64(value as i64)
            } else {
                Scalar::Float64(value)
            };
            (id, value)
        })
        .unzip())
}

/// Generic aggregation: walk every cell of the group space, call `f` on
/// the occupied ones and mask the rest
pub(crate) fn aggregate_generic<R, E, F>(
    grouper: &Grouper,
    mut f: F,
) -> std::result::Result<(Vec<usize>, Vec<R>), E>
where
    F: FnMut(&GroupCell) -> std::result::Result<R, E>,
{
    let space = grouper.indexer().space_size();
    let mut buffer: Vec<Option<R>> = (0..space).map(|_| None).collect();
    let mut counts = vec![0usize; space];

    for cell in grouper.slicer(false) {
        let flat = grouper.indexer().ravel(&cell.codes);
        counts[flat] = cell.len();
        if !cell.is_empty() {
            buffer[flat] = Some(f(&cell)?);
        }
    }

    Ok(buffer
        .into_iter()
        .zip(counts)
        .enumerate()
        .filter(|(_, (_, count))| *count > 0)
        .filter_map(|(id, (value, _))| value.map(|v| (id, v)))
        .unzip())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::groupby::grouping::Grouping;
    use crate::na::NA;

    fn grouper(keys: &[&str]) -> Grouper {
        Grouper::new(vec![Grouping::new(
            keys.iter().map(|&k| NA::Value(Label::from(k))).collect(),
            None,
        )])
        .unwrap()
    }

    #[test]
    fn test_mixed_kinds_rejected() {
        let grouper = grouper(&["a", "b"]);
        let index = DataFrameIndex::default_with_len(2);
        let outputs = vec![
            ApplyOutput::from(1.0),
            ApplyOutput::from(Series::new(vec![1.0, 2.0], None)),
        ];
        let err = combine_apply(
            &grouper,
            &index,
            grouper.cells(),
            outputs,
            Target::Series,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch(_)));
    }

    #[test]
    fn test_no_groups_is_empty_series() {
        let grouper = Grouper::new(vec![Grouping::new(vec![NA::NA], None)]).unwrap();
        let index = DataFrameIndex::default_with_len(1);
        let applied =
            combine_apply(&grouper, &index, grouper.cells(), Vec::new(), Target::Series, None)
                .unwrap();
        assert!(applied.into_series().unwrap().is_empty());
    }

    #[test]
    fn test_generic_matches_vectorized() {
        let grouper = grouper(&["b", "a", "b", "c"]);
        let sorted = Column::Float64(grouper.indexer().reorder(&[1.0, 2.0, 3.0, 4.0]));

        let (ids, fast) = aggregate_vectorized(&grouper, sorted.view(0..4), AggFunc::Sum).unwrap();
        let (generic_ids, slow) = aggregate_generic(&grouper, |cell| {
            kernels::reduce(sorted.view(cell.range.clone()), AggFunc::Sum)
        })
        .unwrap();

        assert_eq!(ids, generic_ids);
        assert_eq!(fast, slow);
        assert_eq!(fast, vec![Scalar::Float64(2.0), Scalar::Float64(4.0), Scalar::Float64(4.0)]);
    }

    #[test]
    fn test_cell_reductions_keep_integers() {
        let grouper = grouper(&["a", "b"]);
        let big = (1i64 << 53) + 1;
        let sorted = Column::Int64(grouper.indexer().reorder(&[big, 7]));

        for func in [AggFunc::First, AggFunc::Last, AggFunc::Min, AggFunc::Max] {
            let (_, values) = aggregate_vectorized(&grouper, sorted.view(0..2), func).unwrap();
            assert_eq!(values, vec![Scalar::Int64(big), Scalar::Int64(7)]);
        }

        let (_, counts) = aggregate_vectorized(&grouper, sorted.view(0..2), AggFunc::Count).unwrap();
        assert_eq!(counts, vec![Scalar::Int64(1), Scalar::Int64(1)]);
    }

    #[test]
    fn test_transform_fit() {
        let group = DataFrameIndex::from_labels(vec![Label::Int(0), Label::Int(2)]);
        let view = group.view(0..2);
        assert_eq!(
            transform_fit(&view, &group, &Label::from("a")).unwrap(),
            TransformFit::Aligned
        );
        let one = DataFrameIndex::default_with_len(1);
        assert_eq!(
            transform_fit(&view, &one, &Label::from("a")).unwrap(),
            TransformFit::Broadcast
        );
        let three = DataFrameIndex::default_with_len(3);
        assert!(transform_fit(&view, &three, &Label::from("a")).is_err());
    }
}
