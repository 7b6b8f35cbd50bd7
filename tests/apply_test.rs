use pandrs_groupby::{
    ApplyOutput, DataFrame, DataFrameIndex, Error, GroupByOptions, Label, ParallelConfig, Scalar,
    Series,
};

fn sample() -> Series<f64> {
    Series::new(vec![1.0, 2.0, 3.0, 4.0, 5.0], Some("v".to_string()))
}

const KEYS: [&str; 5] = ["a", "b", "a", "b", "a"];

#[test]
fn test_apply_scalar_per_group() {
    let values = sample();
    let grouped = values.group_by(KEYS.to_vec()).unwrap();

    let applied = grouped.apply(|g| g.len()).unwrap();
    assert!(!applied.is_frame());
    assert!(applied.as_frame().is_none());
    assert_eq!(applied.as_series().map(|s| s.len()), Some(2));
    let series = applied.into_series().unwrap();
    assert_eq!(series.values(), &[Scalar::Int64(3), Scalar::Int64(2)]);
    assert_eq!(series.index().labels(), vec![Label::from("a"), Label::from("b")]);
    assert_eq!(series.name(), Some(&"v".to_string()));
}

#[test]
fn test_apply_mixed_kinds_is_rejected() {
    // a scalar for one group and a longer series for another must not be truncated
    let values = sample();
    let grouped = values.group_by(KEYS.to_vec()).unwrap();

    let result = grouped.apply(|g| {
        if g.name()[0] == Label::from("a") {
            ApplyOutput::from(g.sum())
        } else {
            ApplyOutput::from(g.map(|v| v * 2.0))
        }
    });
    assert!(matches!(result, Err(Error::ShapeMismatch(_))));
}

#[test]
fn test_apply_ragged_series_are_stacked() {
    let values = sample();
    let grouped = values.group_by(KEYS.to_vec()).unwrap();

    // "a" keeps two rows, "b" keeps one: nothing is dropped or padded
    let applied = grouped
        .apply(|g| {
            let n = if g.len() > 2 { 2 } else { 1 };
            Series::new(g.values()[..n].to_vec(), None)
        })
        .unwrap()
        .into_series()
        .unwrap();

    assert_eq!(applied.len(), 3);
    assert_eq!(
        applied.values(),
        &[Scalar::Float64(1.0), Scalar::Float64(3.0), Scalar::Float64(2.0)]
    );
    assert_eq!(
        applied.index().get(2),
        Some(Label::Tuple(vec![Label::from("b"), Label::from(0usize)]))
    );
}

#[test]
fn test_apply_like_indexed_restores_row_order() {
    let values = sample();
    let grouped = values.group_by(KEYS.to_vec()).unwrap();

    let applied = grouped
        .apply(|g| g.map(|v| v * 10.0))
        .unwrap()
        .into_series()
        .unwrap();

    assert_eq!(applied.index(), values.index());
    let expected: Vec<Scalar> = [10.0, 20.0, 30.0, 40.0, 50.0]
        .iter()
        .map(|&v| Scalar::Float64(v))
        .collect();
    assert_eq!(applied.values(), expected.as_slice());
}

#[test]
fn test_frame_apply_shared_labels_become_columns() {
    let df = DataFrame::new()
        .with_column("k", vec!["x", "y", "x"])
        .unwrap()
        .with_column("v", vec![1.0, 2.0, 3.0])
        .unwrap();
    let grouped = df.group_by("k").unwrap();

    let applied = grouped
        .apply(|g| {
            let v = g.column("v").unwrap();
            let n = v.len() as f64;
            let total: f64 = v.iter().filter_map(|s| s.as_f64()).sum();
            Series::with_index(
                vec![total, n],
                DataFrameIndex::from_labels(vec![Label::from("total"), Label::from("n")]),
                None,
            )
            .unwrap()
        })
        .unwrap();

    let frame = applied.into_frame().unwrap();
    assert_eq!(frame.column_names(), &["total".to_string(), "n".to_string()]);
    assert_eq!(frame.get(0, "total").unwrap(), Scalar::Float64(4.0));
    assert_eq!(frame.get(1, "n").unwrap(), Scalar::Float64(1.0));
}

#[test]
fn test_frame_apply_frames_with_different_columns() {
    let df = DataFrame::new()
        .with_column("k", vec!["x", "y"])
        .unwrap()
        .with_column("v", vec![1.0, 2.0])
        .unwrap();
    let grouped = df.group_by("k").unwrap();

    let result = grouped.apply(|g| {
        let name = if g.name()[0] == Label::from("x") { "left" } else { "right" };
        DataFrame::new().with_column(name, vec![1.0]).unwrap()
    });
    assert!(matches!(result, Err(Error::ShapeMismatch(_))));
}

#[test]
fn test_try_apply_propagates_user_error() {
    #[derive(Debug)]
    struct Rejected(Label);

    impl From<Error> for Rejected {
        fn from(err: Error) -> Self {
            Rejected(Label::from(err.to_string()))
        }
    }

    let values = sample();
    let grouped = values.group_by(KEYS.to_vec()).unwrap();
    let result = grouped.try_apply(|g| {
        if g.name()[0] == Label::from("b") {
            Err(Rejected(g.name()[0].clone()))
        } else {
            Ok(g.sum())
        }
    });

    match result {
        Err(Rejected(key)) => assert_eq!(key, Label::from("b")),
        other => panic!("expected the user error, got {:?}", other),
    }
}

#[test]
fn test_par_apply_matches_serial() {
    let values = Series::new((0..200).map(|v| v as f64).collect(), None);
    let keys: Vec<i64> = (0..200).map(|v| v % 17).collect();
    let options = GroupByOptions::new()
        .with_parallel(ParallelConfig::new().with_min_groups(1).with_max_threads(4));
    let grouped = values
        .group_by_with(vec![keys.into()], options)
        .unwrap();

    let serial = grouped.apply(|g| g.sum()).unwrap();
    let parallel = grouped.par_apply(|g| g.sum()).unwrap();
    assert_eq!(serial, parallel);
}
