use pandrs_groupby::{Column, DataFrame, Error, Label, Scalar, Series, NA};

#[test]
fn test_standardize_within_group() {
    // (g - mean(g)) / std(g) on [1, 2, 3] is [-1, 0, 1] whatever the other group holds
    let values = Series::new(vec![1.0, 100.0, 2.0, 250.0, 3.0], Some("x".to_string()));
    let grouped = values.group_by(vec!["a", "b", "a", "b", "a"]).unwrap();

    let standardized = grouped
        .transform(|g| {
            let mean = g.mean();
            let std = g.std();
            g.map(|v| (v - mean) / std)
        })
        .unwrap();

    let a: Vec<f64> = [0, 2, 4].iter().map(|&i| standardized.values()[i]).collect();
    assert_eq!(a, vec![-1.0, 0.0, 1.0]);
    assert!(a.iter().sum::<f64>().abs() < 1e-12);
    assert_eq!(standardized.index(), values.index());
    assert_eq!(standardized.name(), Some(&"x".to_string()));
}

#[test]
fn test_identity_transform() {
    let values = Series::new(vec![4.0, 1.0, 3.0, 2.0], None);
    let grouped = values.group_by(vec![2i64, 1, 2, 1]).unwrap();

    let same = grouped.transform(|g| g.to_series()).unwrap();
    assert_eq!(same, values);
}

#[test]
fn test_broadcast_group_value() {
    let values = Series::new(vec![1.0, 2.0, 3.0, 4.0], None);
    let grouped = values.group_by(vec!["a", "b", "a", "b"]).unwrap();

    let sums = grouped
        .transform(|g| Series::new(vec![g.sum()], None))
        .unwrap();
    assert_eq!(sums.values(), &[4.0, 6.0, 4.0, 6.0]);
}

#[test]
fn test_misaligned_output_rejected() {
    let values = Series::new(vec![1.0, 2.0, 3.0], None);
    let grouped = values.group_by(vec!["a", "a", "a"]).unwrap();

    let result = grouped.transform(|g| Series::new(g.values()[..2].to_vec(), None));
    assert!(matches!(result, Err(Error::ShapeMismatch(_))));
}

#[test]
fn test_missing_key_rows_keep_values() {
    let values = Series::new(vec![1.0, 2.0, 3.0], None);
    let keys: Vec<NA<Label>> = vec![Label::from("a").into(), NA::NA, Label::from("a").into()];
    let grouped = values.group_by(keys).unwrap();

    let doubled = grouped.transform(|g| g.map(|v| v * 2.0)).unwrap();
    assert_eq!(doubled.values(), &[2.0, 2.0, 6.0]);
}

#[test]
fn test_cumsum() {
    let values = Series::new(vec![1.0, 10.0, 2.0, f64::NAN, 3.0], None);
    let grouped = values.group_by(vec!["a", "b", "a", "a", "a"]).unwrap();

    let running = grouped.cumsum().unwrap();
    assert_eq!(running.values()[0], 1.0);
    assert_eq!(running.values()[1], 10.0);
    assert_eq!(running.values()[2], 3.0);
    assert!(running.values()[3].is_nan());
    assert_eq!(running.values()[4], 6.0);
}

#[test]
fn test_par_transform_matches_serial() {
    let values = Series::new((0..120).map(|v| v as f64).collect(), None);
    let keys: Vec<i64> = (0..120).map(|v| v % 7).collect();
    let grouped = values.group_by(keys).unwrap();

    let serial = grouped.transform(|g| g.map(|v| v - g.mean())).unwrap();
    let parallel = grouped.par_transform(|g| g.map(|v| v - g.mean())).unwrap();
    assert_eq!(serial, parallel);
}

#[test]
fn test_frame_transform() {
    let df = DataFrame::new()
        .with_column("k", vec!["a", "b", "a"])
        .unwrap()
        .with_column("v", vec![1.0, 5.0, 3.0])
        .unwrap();
    let grouped = df.group_by("k").unwrap();

    let centered = grouped
        .transform(|g| {
            g.map_columns(|_, col| {
                let data = col.to_f64()?;
                let mean = data.iter().sum::<f64>() / data.len() as f64;
                Ok(Column::from(data.iter().map(|v| v - mean).collect::<Vec<f64>>()))
            })
            .unwrap()
        })
        .unwrap();

    assert_eq!(centered.column_names(), &["v".to_string()]);
    assert_eq!(centered.index(), df.index());
    assert_eq!(
        centered.column("v").unwrap().to_scalars(),
        vec![Scalar::Float64(-1.0), Scalar::Float64(0.0), Scalar::Float64(1.0)]
    );
}

#[test]
fn test_frame_transform_broadcast() {
    let df = DataFrame::new()
        .with_column("k", vec!["a", "b", "a"])
        .unwrap()
        .with_column("v", vec![1.0, 5.0, 3.0])
        .unwrap();
    let grouped = df.group_by("k").unwrap();

    let totals = grouped
        .transform(|g| {
            let total: f64 = g.column("v").unwrap().iter().filter_map(|s| s.as_f64()).sum();
            DataFrame::new().with_column("v_total", vec![total]).unwrap()
        })
        .unwrap();

    assert_eq!(totals.column_names(), &["v_total".to_string()]);
    assert_eq!(
        totals.column("v_total").unwrap().to_scalars(),
        vec![Scalar::Float64(4.0), Scalar::Float64(5.0), Scalar::Float64(4.0)]
    );
}
