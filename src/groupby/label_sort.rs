//! Factorization of key values into dense group codes, and the
//! canonical renumbering of those codes into sorted key order.

use std::collections::HashMap;

use crate::index::Label;
use crate::na::NA;

/// Codes, distinct key values and per-code row counts of one key
#[derive(Debug, Clone, PartialEq)]
pub struct GroupLabels {
    /// Key value of each code
    pub ids: Vec<Label>,
    /// Code of each row, -1 for a missing key
    pub labels: Vec<i64>,
    /// Rows per code
    pub counts: Vec<usize>,
}

impl GroupLabels {
    pub fn ngroups(&self) -> usize {
        self.ids.len()
    }

    /// Rows that belong to no group
    pub fn missing(&self) -> usize {
        self.labels.iter().filter(|&&c| c < 0).count()
    }
}

/// Assign codes in order of first occurrence.
///
/// Missing keys get -1 and are not counted.
pub fn group_labels(values: &[NA<Label>]) -> GroupLabels {
    let mut ids: Vec<Label> = Vec::new();
    let mut seen: HashMap<&Label, i64> = HashMap::new();
    let mut counts: Vec<usize> = Vec::new();
    let mut labels = Vec::with_capacity(values.len());

    for value in values {
        let code = match value {
            NA::NA => -1,
            NA::Value(key) => *seen.entry(key).or_insert_with(|| {
                ids.push(key.clone());
                counts.push(0);
                (ids.len() - 1) as i64
            }),
        };
        if code >= 0 {
            counts[code as usize] += 1;
        }
        labels.push(code);
    }

    GroupLabels {
        ids,
        labels,
        counts,
    }
}

/// Renumber codes so that iterating `0..k` yields key values in ascending
/// order; labels are remapped through the old-to-new translation.
pub fn sort_group_labels(unsorted: GroupLabels) -> GroupLabels {
    let GroupLabels {
        ids,
        labels,
        counts,
    } = unsorted;

    let mut order: Vec<usize> = (0..ids.len()).collect();
    order.sort_by(|&a, &b| ids[a].cmp(&ids[b]));

    // reverse[old] = new
    let mut reverse = vec![0i64; ids.len()];
    for (new, &old) in order.iter().enumerate() {
        reverse[old] = new as i64;
    }

    GroupLabels {
        labels: labels
            .iter()
            .map(|&c| if c < 0 { -1 } else { reverse[c as usize] })
            .collect(),
        counts: order.iter().map(|&old| counts[old]).collect(),
        ids: order.iter().map(|&old| ids[old].clone()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(values: &[Option<&str>]) -> Vec<NA<Label>> {
        values
            .iter()
            .map(|v| NA::<Label>::from(v.map(Label::from)))
            .collect()
    }

    #[test]
    fn test_first_occurrence() {
        let grouped = group_labels(&keys(&[Some("b"), Some("a"), None, Some("b")]));
        assert_eq!(grouped.ids, vec![Label::from("b"), Label::from("a")]);
        assert_eq!(grouped.labels, vec![0, 1, -1, 0]);
        assert_eq!(grouped.counts, vec![2, 1]);
        assert_eq!(grouped.missing(), 1);
    }

    #[test]
    fn test_sorted_codes() {
        let sorted = sort_group_labels(group_labels(&keys(&[
            Some("c"),
            Some("a"),
            None,
            Some("b"),
            Some("a"),
        ])));
        assert_eq!(
            sorted.ids,
            vec![Label::from("a"), Label::from("b"), Label::from("c")]
        );
        assert_eq!(sorted.labels, vec![2, 0, -1, 1, 0]);
        assert_eq!(sorted.counts, vec![2, 1, 1]);
    }

    #[test]
    fn test_all_missing() {
        let sorted = sort_group_labels(group_labels(&keys(&[None, None])));
        assert_eq!(sorted.ngroups(), 0);
        assert_eq!(sorted.labels, vec![-1, -1]);
    }

    #[test]
    fn test_order_independent() {
        let a = sort_group_labels(group_labels(&keys(&[Some("x"), Some("y"), Some("x")])));
        let b = sort_group_labels(group_labels(&keys(&[Some("y"), Some("x"), Some("x")])));
        assert_eq!(a.ids, b.ids);
        assert_eq!(a.counts, b.counts);
    }
}
