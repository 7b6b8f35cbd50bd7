//! Per-group reduction kernels.
//!
//! `group_aggregate` is the vectorized path: one pass over a numeric
//! buffer, accumulating into dense arrays indexed by flat group id.
//! `reduce` is the generic path over a single group's cells and also
//! handles non-numeric data for the reductions where that makes sense.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::column::{ColumnView, Scalar};
use crate::error::{Error, Result};
use crate::series::stats;

/// Built-in reductions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggFunc {
    Sum,
    Mean,
    Min,
    Max,
    Count,
    Std,
    Var,
    Prod,
    First,
    Last,
}

impl AggFunc {
    pub fn name(&self) -> &'static str {
        match self {
            AggFunc::Sum => "sum",
            AggFunc::Mean => "mean",
            AggFunc::Min => "min",
            AggFunc::Max => "max",
            AggFunc::Count => "count",
            AggFunc::Std => "std",
            AggFunc::Var => "var",
            AggFunc::Prod => "prod",
            AggFunc::First => "first",
            AggFunc::Last => "last",
        }
    }

    /// Reductions whose result is one of the group's own cells
    pub fn picks_cell(&self) -> bool {
        matches!(
            self,
            AggFunc::Min | AggFunc::Max | AggFunc::First | AggFunc::Last
        )
    }

    /// Reductions that only make sense for numbers
    pub fn is_numeric_only(&self) -> bool {
        matches!(
            self,
            AggFunc::Sum | AggFunc::Mean | AggFunc::Std | AggFunc::Var | AggFunc::Prod
        )
    }
}

impl fmt::Display for AggFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AggFunc {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sum" => Ok(AggFunc::Sum),
            "mean" => Ok(AggFunc::Mean),
            "min" => Ok(AggFunc::Min),
            "max" => Ok(AggFunc::Max),
            "count" => Ok(AggFunc::Count),
            "std" => Ok(AggFunc::Std),
            "var" => Ok(AggFunc::Var),
            "prod" => Ok(AggFunc::Prod),
            "first" => Ok(AggFunc::First),
            "last" => Ok(AggFunc::Last),
            other => Err(Error::Configuration(format!(
                "unknown aggregation '{}'",
                other
            ))),
        }
    }
}

/// Reduce `values` per group.
///
/// `ids[i]` is the flat group id of `values[i]` (-1 to skip the row) and
/// `ngroups` the size of the flat id range. Returns one result and one
/// row count per flat id; ids without rows have count 0 and are left for
/// the caller to mask. NaN values are skipped by every reduction, groups
/// with no non-NaN value yield NaN, except `Count` and `Sum` (0) and
/// `Prod` (1).
pub fn group_aggregate(
    values: &[f64],
    ids: &[i64],
    ngroups: usize,
    func: AggFunc,
) -> (Vec<f64>, Vec<usize>) {
    let mut counts = vec![0usize; ngroups];
    let mut nobs = vec![0usize; ngroups];
    let mut result = vec![f64::NAN; ngroups];

    let rows = values
        .iter()
        .zip(ids)
        .filter(|&(_, &id)| id >= 0)
        .map(|(&v, &id)| (v, id as usize));

    match func {
        AggFunc::Std | AggFunc::Var => {
            // Welford
            let mut mean = vec![0.0; ngroups];
            let mut m2 = vec![0.0; ngroups];
            for (v, g) in rows {
                counts[g] += 1;
                if v.is_nan() {
                    continue;
                }
                nobs[g] += 1;
                let delta = v - mean[g];
                mean[g] += delta / nobs[g] as f64;
                m2[g] += delta * (v - mean[g]);
            }
            for g in 0..ngroups {
                if nobs[g] > 1 {
                    let var = m2[g] / (nobs[g] - 1) as f64;
                    result[g] = if func == AggFunc::Std { var.sqrt() } else { var };
                }
            }
        }
        _ => {
            for (v, g) in rows {
                counts[g] += 1;
                if v.is_nan() {
                    continue;
                }
                nobs[g] += 1;
                let acc = &mut result[g];
                *acc = match func {
                    AggFunc::Sum | AggFunc::Mean => {
                        if acc.is_nan() { v } else { *acc + v }
                    }
                    AggFunc::Prod => {
                        if acc.is_nan() { v } else { *acc * v }
                    }
                    AggFunc::Min => acc.min(v),
                    AggFunc::Max => acc.max(v),
                    AggFunc::First => {
                        if nobs[g] == 1 { v } else { *acc }
                    }
                    AggFunc::Last => v,
                    AggFunc::Count | AggFunc::Std | AggFunc::Var => *acc,
                };
            }
            for g in 0..ngroups {
                match func {
                    AggFunc::Mean if nobs[g] > 0 => result[g] /= nobs[g] as f64,
                    AggFunc::Count => result[g] = nobs[g] as f64,
                    AggFunc::Sum if nobs[g] == 0 => result[g] = 0.0,
                    AggFunc::Prod if nobs[g] == 0 => result[g] = 1.0,
                    _ => {}
                }
            }
        }
    }

    (result, counts)
}

/// Reduce one group's cells.
///
/// Numeric-only reductions fail with `AggregationType` on text; `Min` and
/// `Max` also accept text as long as the cells are mutually comparable.
pub fn reduce(view: ColumnView<'_>, func: AggFunc) -> Result<Scalar> {
    if func.is_numeric_only() {
        let values = view.to_f64()?;
        return Ok(Scalar::Float64(match func {
            AggFunc::Sum => stats::sum(&values),
            AggFunc::Mean => stats::mean(&values),
            AggFunc::Std => stats::std(&values),
            AggFunc::Var => stats::var(&values),
            _ => values.iter().filter(|v| !v.is_nan()).product(),
        }));
    }

    let mut cells = view.iter().filter(|s| !s.is_null());
    match func {
        AggFunc::Count => Ok(Scalar::Int64(cells.count() as i64)),
        AggFunc::First => Ok(cells.next().unwrap_or(Scalar::Null)),
        AggFunc::Last => Ok(cells.last().unwrap_or(Scalar::Null)),
        _ => {
            let want = if func == AggFunc::Min {
                std::cmp::Ordering::Less
            } else {
                std::cmp::Ordering::Greater
            };
            let mut best: Option<Scalar> = None;
            for cell in cells {
                best = match best {
                    None => Some(cell),
                    Some(current) => match cell.compare(&current) {
                        Some(ord) if ord == want => Some(cell),
                        Some(_) => Some(current),
                        None => {
                            return Err(Error::AggregationType(format!(
                                "cannot compare '{}' with '{}'",
                                cell, current
                            )))
                        }
                    },
                };
            }
            Ok(best.unwrap_or(Scalar::Null))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::Column;

    #[test]
    fn test_sum_masks_empty_groups() {
        let (result, counts) =
            group_aggregate(&[1.0, 2.0, 3.0], &[0, 1, 0], 4, AggFunc::Sum);
        assert_eq!(&result[..2], &[4.0, 2.0]);
        assert_eq!(counts, vec![2, 1, 0, 0]);
    }

    #[test]
    fn test_skips_nan_and_missing_ids() {
        let values = [1.0, f64::NAN, 5.0, 100.0];
        let ids = [0, 0, 0, -1];
        let (mean, counts) = group_aggregate(&values, &ids, 1, AggFunc::Mean);
        assert_eq!(mean, vec![3.0]);
        assert_eq!(counts, vec![3]);

        let (count, _) = group_aggregate(&values, &ids, 1, AggFunc::Count);
        assert_eq!(count, vec![2.0]);

        let (first, _) = group_aggregate(&[f64::NAN, 2.0, 3.0], &[0, 0, 0], 1, AggFunc::First);
        assert_eq!(first, vec![2.0]);
    }

    #[test]
    fn test_welford_matches_two_pass() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let ids = [0; 8];
        let (var, _) = group_aggregate(&values, &ids, 1, AggFunc::Var);
        assert!((var[0] - stats::var(&values)).abs() < 1e-12);

        let (std, _) = group_aggregate(&[1.0], &[0], 1, AggFunc::Std);
        assert!(std[0].is_nan());
    }

    #[test]
    fn test_reduce_text() {
        let col = Column::from(vec!["pear", "apple", "fig"]);
        let view = col.view(0..3);
        assert_eq!(reduce(view, AggFunc::Min).unwrap(), Scalar::from("apple"));
        assert_eq!(reduce(view, AggFunc::Last).unwrap(), Scalar::from("fig"));
        assert_eq!(reduce(view, AggFunc::Count).unwrap(), Scalar::Int64(3));

        let err = reduce(view, AggFunc::Sum).unwrap_err();
        assert!(err.is_fallback_candidate());
    }

    #[test]
    fn test_reduce_mixed_objects() {
        let col = Column::Object(vec![Scalar::Int64(1), Scalar::from("a")]);
        assert!(reduce(col.view(0..2), AggFunc::Max).is_err());
        assert_eq!(
            reduce(col.view(0..2), AggFunc::First).unwrap(),
            Scalar::Int64(1)
        );
    }

    #[test]
    fn test_parse() {
        assert_eq!("std".parse::<AggFunc>().unwrap(), AggFunc::Std);
        assert!("median".parse::<AggFunc>().is_err());
    }
}
