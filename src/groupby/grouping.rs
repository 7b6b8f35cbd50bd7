use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::dataframe::DataFrame;
use crate::error::{Error, Result};
use crate::groupby::label_sort::{self, GroupLabels};
use crate::index::{DataFrameIndex, Label};
use crate::na::NA;
use crate::series::Series;

/// Per-label key function
pub type KeyFn = Arc<dyn Fn(&Label) -> NA<Label> + Send + Sync>;

/// Where the key value of each row comes from
#[derive(Clone)]
pub enum KeySource {
    /// One key per row, in row order
    Values(Vec<NA<Label>>),
    /// Axis label to key; labels missing from the map have no group
    Mapping(HashMap<Label, Label>),
    /// Called once per axis label
    Function(KeyFn),
    /// Keys aligned to the axis by label
    Series(Series<Label>),
    /// A level of a hierarchical axis
    Level(usize),
    /// A column of the grouped DataFrame
    Column(String),
}

impl KeySource {
    pub fn function<F>(f: F) -> Self
    where
        F: Fn(&Label) -> NA<Label> + Send + Sync + 'static,
    {
        KeySource::Function(Arc::new(f))
    }

    pub fn column(name: impl Into<String>) -> Self {
        KeySource::Column(name.into())
    }

    pub fn level(level: usize) -> Self {
        KeySource::Level(level)
    }
}

impl fmt::Debug for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySource::Values(v) => f.debug_tuple("Values").field(&v.len()).finish(),
            KeySource::Mapping(m) => f.debug_tuple("Mapping").field(&m.len()).finish(),
            KeySource::Function(_) => f.write_str("Function"),
            KeySource::Series(s) => f.debug_tuple("Series").field(&s.name()).finish(),
            KeySource::Level(l) => f.debug_tuple("Level").field(l).finish(),
            KeySource::Column(c) => f.debug_tuple("Column").field(c).finish(),
        }
    }
}

impl From<Vec<NA<Label>>> for KeySource {
    fn from(values: Vec<NA<Label>>) -> Self {
        KeySource::Values(values)
    }
}

impl From<Vec<Label>> for KeySource {
    fn from(values: Vec<Label>) -> Self {
        KeySource::Values(values.into_iter().map(NA::Value).collect())
    }
}

impl From<Vec<&str>> for KeySource {
    fn from(values: Vec<&str>) -> Self {
        KeySource::Values(values.into_iter().map(|v| NA::Value(Label::from(v))).collect())
    }
}

impl From<Vec<i64>> for KeySource {
    fn from(values: Vec<i64>) -> Self {
        KeySource::Values(values.into_iter().map(|v| NA::Value(Label::Int(v))).collect())
    }
}

impl From<HashMap<Label, Label>> for KeySource {
    fn from(mapping: HashMap<Label, Label>) -> Self {
        KeySource::Mapping(mapping)
    }
}

impl From<Series<Label>> for KeySource {
    fn from(series: Series<Label>) -> Self {
        KeySource::Series(series)
    }
}

impl From<&str> for KeySource {
    fn from(column: &str) -> Self {
        KeySource::Column(column.to_string())
    }
}

impl From<String> for KeySource {
    fn from(column: String) -> Self {
        KeySource::Column(column)
    }
}

/// A key source evaluated against an axis
#[derive(Debug)]
pub(crate) struct ResolvedKey {
    pub values: Vec<NA<Label>>,
    pub name: Option<String>,
    /// Column to leave out of the grouped data
    pub exclusion: Option<String>,
}

impl KeySource {
    /// Produce one key value per axis label
    pub(crate) fn resolve(
        self,
        axis: &DataFrameIndex,
        frame: Option<&DataFrame>,
    ) -> Result<ResolvedKey> {
        let n = axis.len();
        let mut name = None;
        let mut exclusion = None;

        let values: Vec<NA<Label>> = match self {
            KeySource::Values(values) => {
                if values.len() != n {
                    return Err(Error::LengthMismatch {
                        expected: n,
                        actual: values.len(),
                    });
                }
                values
            }
            KeySource::Mapping(mapping) => axis
                .labels()
                .iter()
                .map(|label| NA::from(mapping.get(label).cloned()))
                .collect(),
            KeySource::Function(f) => axis.labels().iter().map(|label| f(label)).collect(),
            KeySource::Series(series) => {
                name = series.name().cloned();
                align_series(&series, axis)
            }
            KeySource::Level(level) => {
                let multi = match axis {
                    DataFrameIndex::Multi(multi) => multi,
                    DataFrameIndex::Simple(_) => {
                        return Err(Error::Configuration(format!(
                            "level {} requested on a flat axis",
                            level
                        )));
                    }
                };
                if level >= multi.n_levels() {
                    return Err(Error::Configuration(format!(
                        "level {} out of range for an axis with {} levels",
                        level,
                        multi.n_levels()
                    )));
                }
                name = multi.names()[level].clone();
                multi
                    .get_level_values(level)?
                    .into_iter()
                    .map(NA::Value)
                    .collect()
            }
            KeySource::Column(column) => {
                let frame = frame.ok_or_else(|| {
                    Error::Configuration(format!(
                        "column key '{}' needs a DataFrame to group",
                        column
                    ))
                })?;
                let values = frame.column(&column)?.to_labels();
                name = Some(column.clone());
                exclusion = Some(column);
                values
            }
        };

        Ok(ResolvedKey {
            values,
            name,
            exclusion,
        })
    }
}

fn align_series(series: &Series<Label>, axis: &DataFrameIndex) -> Vec<NA<Label>> {
    if series.index().equals(axis) {
        return series.values().iter().cloned().map(NA::Value).collect();
    }

    let mut by_label: HashMap<Label, usize> = HashMap::new();
    for (pos, label) in series.index().labels().into_iter().enumerate() {
        by_label.entry(label).or_insert(pos);
    }

    axis.labels()
        .iter()
        .map(|label| NA::from(by_label.get(label).map(|&pos| series.values()[pos].clone())))
        .collect()
}

/// One grouping key evaluated over an axis.
///
/// Codes are computed on first use and cached; a grouping is never
/// mutated afterwards, so data changes require a new grouping.
#[derive(Debug)]
pub struct Grouping {
    name: Option<String>,
    grouper: Vec<NA<Label>>,
    codes: OnceLock<GroupLabels>,
    positions: OnceLock<Vec<Vec<usize>>>,
}

impl Grouping {
    pub fn new(grouper: Vec<NA<Label>>, name: Option<String>) -> Self {
        Grouping {
            name,
            grouper,
            codes: OnceLock::new(),
            positions: OnceLock::new(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = Some(name);
    }

    /// Key value of every row
    pub fn grouper(&self) -> &[NA<Label>] {
        &self.grouper
    }

    pub fn len(&self) -> usize {
        self.grouper.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grouper.is_empty()
    }

    fn codes(&self) -> &GroupLabels {
        self.codes.get_or_init(|| {
            let sorted = label_sort::sort_group_labels(label_sort::group_labels(&self.grouper));
            log::debug!(
                "grouping '{}': {} groups over {} rows, {} without a key",
                self.name.as_deref().unwrap_or("key"),
                sorted.ngroups(),
                self.grouper.len(),
                sorted.missing()
            );
            sorted
        })
    }

    /// Group code of every row, -1 when the key is missing
    pub fn labels(&self) -> &[i64] {
        &self.codes().labels
    }

    /// Distinct key values in ascending order; position is the code
    pub fn ids(&self) -> &[Label] {
        &self.codes().ids
    }

    /// Rows per code
    pub fn counts(&self) -> &[usize] {
        &self.codes().counts
    }

    pub fn ngroups(&self) -> usize {
        self.codes().ngroups()
    }

    /// Code of a key value, the inverse of `ids`
    pub fn reverse_id(&self, key: &Label) -> Option<usize> {
        self.ids().binary_search(key).ok()
    }

    /// Row positions of every code
    pub fn positions(&self) -> &[Vec<usize>] {
        self.positions.get_or_init(|| {
            let mut positions: Vec<Vec<usize>> = self
                .counts()
                .iter()
                .map(|&count| Vec::with_capacity(count))
                .collect();
            for (row, &code) in self.labels().iter().enumerate() {
                if code >= 0 {
                    positions[code as usize].push(row);
                }
            }
            positions
        })
    }

    /// Key value to row positions
    pub fn indices(&self) -> BTreeMap<Label, Vec<usize>> {
        self.ids()
            .iter()
            .cloned()
            .zip(self.positions().iter().cloned())
            .collect()
    }

    /// Single-level index of the distinct keys
    pub fn group_index(&self) -> DataFrameIndex {
        crate::index::Index::with_name(self.ids().to_vec(), self.name.clone()).into()
    }
}
