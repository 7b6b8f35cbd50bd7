use crate::error::{Error, Result};
use crate::index::Label;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::Range;

/// Hierarchical row labels.
///
/// Stored factorized: for every level a list of distinct labels (`levels`)
/// and one integer code per row pointing into it (`codes`). Grouped results
/// put the group keys in the outer levels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiIndex {
    levels: Vec<Vec<Label>>,
    codes: Vec<Vec<i32>>,
    names: Vec<Option<String>>,
}

impl MultiIndex {
    /// Build from factorized levels and codes
    ///
    /// # Arguments
    /// * `levels` - distinct labels per level
    /// * `codes` - per level, one position into `levels[level]` per row
    /// * `names` - optional level names
    pub fn new(
        levels: Vec<Vec<Label>>,
        codes: Vec<Vec<i32>>,
        names: Option<Vec<Option<String>>>,
    ) -> Result<Self> {
        if levels.is_empty() {
            return Err(Error::Index("at least one level is required".into()));
        }

        if levels.len() != codes.len() {
            return Err(Error::Index(format!(
                "{} levels but {} code arrays",
                levels.len(),
                codes.len()
            )));
        }

        let n_rows = codes[0].len();
        for (level_idx, level_codes) in codes.iter().enumerate() {
            if level_codes.len() != n_rows {
                return Err(Error::Index(
                    "all levels must have the same number of rows".into(),
                ));
            }
            let n_values = levels[level_idx].len() as i32;
            if let Some(&bad) = level_codes.iter().find(|&&c| c < 0 || c >= n_values) {
                return Err(Error::Index(format!(
                    "code {} out of range for level {}",
                    bad, level_idx
                )));
            }
        }

        let names = match names {
            Some(n) if n.len() != levels.len() => {
                return Err(Error::Index(format!(
                    "{} names for {} levels",
                    n.len(),
                    levels.len()
                )));
            }
            Some(n) => n,
            None => vec![None; levels.len()],
        };

        Ok(MultiIndex {
            levels,
            codes,
            names,
        })
    }

    /// Build from one label array per level, factorizing each array
    pub fn from_arrays(
        arrays: Vec<Vec<Label>>,
        names: Option<Vec<Option<String>>>,
    ) -> Result<Self> {
        let mut levels = Vec::with_capacity(arrays.len());
        let mut codes = Vec::with_capacity(arrays.len());

        for array in arrays {
            let mut uniques: Vec<Label> = Vec::new();
            let mut seen: HashMap<Label, i32> = HashMap::new();
            let mut level_codes = Vec::with_capacity(array.len());
            for value in array {
                let code = match seen.get(&value) {
                    Some(&code) => code,
                    None => {
                        let code = uniques.len() as i32;
                        uniques.push(value.clone());
                        seen.insert(value, code);
                        code
                    }
                };
                level_codes.push(code);
            }
            levels.push(uniques);
            codes.push(level_codes);
        }

        MultiIndex::new(levels, codes, names)
    }

    /// Build from row tuples, like `pandas.MultiIndex.from_tuples`
    pub fn from_tuples(
        tuples: Vec<Vec<Label>>,
        names: Option<Vec<Option<String>>>,
    ) -> Result<Self> {
        let n_levels = match tuples.first() {
            Some(first) => first.len(),
            None => return Err(Error::Index("empty tuple list".into())),
        };

        if let Some((i, tuple)) = tuples
            .iter()
            .enumerate()
            .find(|(_, t)| t.len() != n_levels)
        {
            return Err(Error::Index(format!(
                "tuple {} has length {}, expected {}",
                i,
                tuple.len(),
                n_levels
            )));
        }

        let mut arrays: Vec<Vec<Label>> = vec![Vec::with_capacity(tuples.len()); n_levels];
        for tuple in tuples {
            for (level, value) in tuple.into_iter().enumerate() {
                arrays[level].push(value);
            }
        }

        MultiIndex::from_arrays(arrays, names)
    }

    pub fn get_tuple(&self, pos: usize) -> Option<Vec<Label>> {
        if pos >= self.len() {
            return None;
        }
        Some(
            self.codes
                .iter()
                .zip(&self.levels)
                .map(|(codes, level)| level[codes[pos] as usize].clone())
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.codes.first().map_or(0, |c| c.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn n_levels(&self) -> usize {
        self.levels.len()
    }

    pub fn levels(&self) -> &[Vec<Label>] {
        &self.levels
    }

    pub fn codes(&self) -> &[Vec<i32>] {
        &self.codes
    }

    pub fn names(&self) -> &[Option<String>] {
        &self.names
    }

    /// Labels of one level, one per row
    pub fn get_level_values(&self, level: usize) -> Result<Vec<Label>> {
        if level >= self.levels.len() {
            return Err(Error::Index(format!(
                "level {} out of range for an index with {} levels",
                level,
                self.levels.len()
            )));
        }
        Ok(self.level_labels(level))
    }

    pub(crate) fn level_labels(&self, level: usize) -> Vec<Label> {
        self.codes[level]
            .iter()
            .map(|&c| self.levels[level][c as usize].clone())
            .collect()
    }

    pub(crate) fn take(&self, indexer: &[usize]) -> Self {
        MultiIndex {
            levels: self.levels.clone(),
            codes: self
                .codes
                .iter()
                .map(|codes| indexer.iter().map(|&i| codes[i]).collect())
                .collect(),
            names: self.names.clone(),
        }
    }

    pub(crate) fn slice(&self, range: Range<usize>) -> Self {
        MultiIndex {
            levels: self.levels.clone(),
            codes: self.codes.iter().map(|c| c[range.clone()].to_vec()).collect(),
            names: self.names.clone(),
        }
    }
}
