//! Stacked result indexes: group keys as outer levels above each group's
//! own result labels.

use crate::error::{Error, Result};
use crate::groupby::grouping::Grouping;
use crate::index::{DataFrameIndex, Label, MultiIndex};

/// Build the index of stacked per-group results.
///
/// `keys[g]` holds one label per grouping for group `g` and
/// `result_indexes[g]` is the index of that group's result. When every
/// result index is identical the outer codes come straight from the
/// groupings' sorted ids and the shared index is factorized once;
/// otherwise every key is repeated per result row and the result indexes
/// are concatenated.
pub fn stacked_index(
    groupings: &[Grouping],
    keys: &[Vec<Label>],
    result_indexes: &[DataFrameIndex],
) -> Result<DataFrameIndex> {
    if keys.len() != result_indexes.len() {
        return Err(Error::LengthMismatch {
            expected: keys.len(),
            actual: result_indexes.len(),
        });
    }

    let mut names: Vec<Option<String>> =
        groupings.iter().map(|g| g.name().map(String::from)).collect();

    let first = match result_indexes.first() {
        Some(first) => first,
        None => {
            names.push(None);
            let arrays = vec![Vec::new(); names.len()];
            return Ok(MultiIndex::from_arrays(arrays, Some(names))?.into());
        }
    };
    names.extend(first.names());

    let index = if result_indexes.iter().all(|idx| idx.equals(first)) {
        shared_index(groupings, keys, first, names)?
    } else {
        repeated_index(groupings, keys, result_indexes, names)?
    };
    Ok(index.into())
}

fn shared_index(
    groupings: &[Grouping],
    keys: &[Vec<Label>],
    shared: &DataFrameIndex,
    names: Vec<Option<String>>,
) -> Result<MultiIndex> {
    let n = shared.len();
    let mut levels = Vec::with_capacity(names.len());
    let mut codes = Vec::with_capacity(names.len());

    for (level, grouping) in groupings.iter().enumerate() {
        let mut level_codes = Vec::with_capacity(keys.len() * n);
        for key in keys {
            let rank = grouping.reverse_id(&key[level]).ok_or_else(|| {
                Error::Index(format!("'{}' is not a key of level {}", key[level], level))
            })?;
            level_codes.extend(std::iter::repeat(rank as i32).take(n));
        }
        levels.push(grouping.ids().to_vec());
        codes.push(level_codes);
    }

    let inner = MultiIndex::from_arrays(shared.level_arrays(), None)?;
    for (inner_levels, inner_codes) in inner.levels().iter().zip(inner.codes()) {
        levels.push(inner_levels.clone());
        codes.push(
            inner_codes
                .iter()
                .copied()
                .cycle()
                .take(keys.len() * n)
                .collect(),
        );
    }

    MultiIndex::new(levels, codes, Some(names))
}

fn repeated_index(
    groupings: &[Grouping],
    keys: &[Vec<Label>],
    result_indexes: &[DataFrameIndex],
    names: Vec<Option<String>>,
) -> Result<MultiIndex> {
    let mut arrays: Vec<Vec<Label>> = (0..groupings.len())
        .map(|level| {
            keys.iter()
                .zip(result_indexes)
                .flat_map(|(key, idx)| std::iter::repeat(key[level].clone()).take(idx.len()))
                .collect()
        })
        .collect();

    let inner = DataFrameIndex::concat(result_indexes)?;
    arrays.extend(inner.level_arrays());

    MultiIndex::from_arrays(arrays, Some(names))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::na::NA;

    fn grouping(keys: &[&str]) -> Grouping {
        Grouping::new(
            keys.iter().map(|&k| NA::Value(Label::from(k))).collect(),
            Some("k".into()),
        )
    }

    fn labels(values: &[&str]) -> DataFrameIndex {
        DataFrameIndex::from_labels(values.iter().map(|&v| Label::from(v)).collect())
    }

    #[test]
    fn test_shared_fast_path() {
        let groupings = [grouping(&["b", "a", "b"])];
        let keys = vec![vec![Label::from("a")], vec![Label::from("b")]];
        let shared = labels(&["min", "max"]);
        let index =
            stacked_index(&groupings, &keys, &[shared.clone(), shared]).unwrap();

        assert_eq!(index.len(), 4);
        assert_eq!(index.names(), vec![Some("k".to_string()), None]);
        assert_eq!(
            index.get(3),
            Some(Label::Tuple(vec![Label::from("b"), Label::from("max")]))
        );
        match index {
            DataFrameIndex::Multi(multi) => assert_eq!(multi.codes()[0], vec![0, 0, 1, 1]),
            other => panic!("expected a hierarchical index, got {:?}", other),
        }
    }

    #[test]
    fn test_heterogeneous_slow_path() {
        let groupings = [grouping(&["a", "b"])];
        let keys = vec![vec![Label::from("a")], vec![Label::from("b")]];
        let parts = [labels(&["r0"]), labels(&["r1", "r2"])];
        let index = stacked_index(&groupings, &keys, &parts).unwrap();

        let expected: Vec<Label> = vec![("a", "r0"), ("b", "r1"), ("b", "r2")]
            .into_iter()
            .map(|(k, r)| Label::Tuple(vec![Label::from(k), Label::from(r)]))
            .collect();
        assert_eq!(index.labels(), expected);
    }

    #[test]
    fn test_fast_and_slow_agree() {
        let groupings = [grouping(&["a", "b"])];
        let keys = vec![vec![Label::from("a")], vec![Label::from("b")]];
        let shared = labels(&["x", "y"]);
        let fast = stacked_index(&groupings, &keys, &[shared.clone(), shared.clone()]).unwrap();
        let slow = repeated_index(
            &groupings,
            &keys,
            &[shared.clone(), shared],
            vec![Some("k".into()), None],
        )
        .unwrap();
        assert_eq!(fast, DataFrameIndex::from(slow));
    }
}
