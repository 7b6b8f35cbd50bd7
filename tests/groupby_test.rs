use pandrs_groupby::{DataFrame, Error, KeySource, Label, Scalar, Series, NA};

fn labels(values: &[&str]) -> Vec<Label> {
    values.iter().map(|&v| Label::from(v)).collect()
}

#[test]
fn test_groupby_creation() {
    let values = Series::new(vec![10.0, 20.0, 30.0, 40.0, 50.0], Some("values".to_string()));
    let grouped = values.group_by(vec!["A", "B", "A", "B", "C"]).unwrap();

    assert_eq!(grouped.ngroups(), 3);
    assert_eq!(grouped.keys(), labels(&["A", "B", "C"]));
}

#[test]
fn test_groupby_size() {
    let values = Series::new(vec![10.0, 20.0, 30.0, 40.0, 50.0], Some("values".to_string()));
    let grouped = values.group_by(vec!["A", "B", "A", "B", "C"]).unwrap();

    let sizes = grouped.size().unwrap();
    assert_eq!(sizes.values(), &[2, 2, 1]);
    assert_eq!(sizes.index().labels(), labels(&["A", "B", "C"]));
    assert_eq!(sizes.name(), Some(&"size".to_string()));
}

#[test]
fn test_groups_split_by_first_element() {
    // rows ("a",1) ("b",2) ("a",3) grouped by the first element
    let values = Series::new(vec![1i64, 2, 3], Some("n".to_string()));
    let grouped = values.group_by(vec!["a", "b", "a"]).unwrap();

    let groups: Vec<(Label, Vec<i64>)> = grouped
        .iter()
        .map(|(key, view)| (key, view.values().to_vec()))
        .collect();
    assert_eq!(
        groups,
        vec![(Label::from("a"), vec![1, 3]), (Label::from("b"), vec![2])]
    );

    let sums = grouped.sum().unwrap();
    assert_eq!(sums.values(), &[Scalar::Float64(4.0), Scalar::Float64(2.0)]);
    assert_eq!(sums.name(), Some(&"n".to_string()));
}

#[test]
fn test_groupby_numeric_keys() {
    let values = Series::new(vec![1.0, 2.0, 3.0, 4.0], None);
    let grouped = values.group_by(vec![3i64, 1, 3, 2]).unwrap();

    assert_eq!(
        grouped.keys(),
        vec![Label::from(1i64), Label::from(2i64), Label::from(3i64)]
    );
    let means = grouped.mean().unwrap();
    assert_eq!(
        means.values(),
        &[Scalar::Float64(2.0), Scalar::Float64(4.0), Scalar::Float64(2.0)]
    );
}

#[test]
fn test_groups_and_indices() {
    let values = Series::new(vec![1.0, 2.0, 3.0], None);
    let grouped = values.group_by(vec!["y", "x", "y"]).unwrap();

    let groups = grouped.groups();
    assert_eq!(groups[&Label::from("y")], vec![Label::from(0usize), Label::from(2usize)]);
    let indices = grouped.indices();
    assert_eq!(indices[&Label::from("x")], vec![1]);
}

#[test]
fn test_get_group() {
    let values = Series::new(vec![1.0, 2.0, 3.0], None);
    let grouped = values.group_by(vec!["y", "x", "y"]).unwrap();

    let y = grouped.get_group("y").unwrap();
    assert_eq!(y.values(), &[1.0, 3.0]);
    assert_eq!(y.index().labels(), vec![Label::from(0usize), Label::from(2usize)]);

    assert!(matches!(grouped.get_group("z"), Err(Error::Index(_))));
}

#[test]
fn test_missing_keys_excluded() {
    let values = Series::new(vec![1.0, 2.0, 3.0, 4.0], None);
    let keys: Vec<pandrs_groupby::NA<Label>> = vec![
        Label::from("a").into(),
        pandrs_groupby::NA::NA,
        Label::from("a").into(),
        Label::from("b").into(),
    ];
    let grouped = values.group_by(keys).unwrap();

    assert_eq!(grouped.ngroups(), 2);
    let counts = grouped.count().unwrap();
    assert_eq!(counts.values(), &[Scalar::Int64(2), Scalar::Int64(1)]);
    let total: usize = grouped.indices().values().map(Vec::len).sum();
    assert_eq!(total, 3);
}

#[test]
fn test_permutation_invariance() {
    let keys = ["b", "a", "c", "a", "b", "c", "a"];
    let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
    let forward = Series::new(values.to_vec(), None);
    let expected = forward.group_by(keys.to_vec()).unwrap().sum().unwrap();

    let order = [6, 2, 4, 0, 5, 1, 3];
    let shuffled = Series::new(order.iter().map(|&i| values[i]).collect(), None);
    let shuffled_keys: Vec<&str> = order.iter().map(|&i| keys[i]).collect();
    let result = shuffled.group_by(shuffled_keys).unwrap().sum().unwrap();

    assert_eq!(result.values(), expected.values());
    assert_eq!(result.index().labels(), expected.index().labels());
}

#[test]
fn test_dataframe_group_by_column() {
    let df = DataFrame::new()
        .with_column("city", vec!["Tokyo", "Osaka", "Tokyo", "Nagoya"])
        .unwrap()
        .with_column("sales", vec![10.0, 7.0, 5.0, 2.0])
        .unwrap();

    let grouped = df.group_by("city").unwrap();
    let totals = grouped.sum().unwrap();

    assert_eq!(totals.column_names(), &["sales".to_string()]);
    assert_eq!(totals.index().labels(), labels(&["Nagoya", "Osaka", "Tokyo"]));
    assert_eq!(totals.index().names(), vec![Some("city".to_string())]);
    assert_eq!(totals.get(2, "sales").unwrap(), Scalar::Float64(15.0));
}

#[test]
fn test_select_shares_partition() {
    let df = DataFrame::new()
        .with_column("k", vec!["a", "b", "a"])
        .unwrap()
        .with_column("x", vec![1i64, 2, 3])
        .unwrap();

    let grouped = df.group_by("k").unwrap();
    let x = grouped.select("x").unwrap();
    assert!(std::ptr::eq(grouped.grouper(), x.grouper()));
    assert_eq!(
        x.max().unwrap().values(),
        &[Scalar::Int64(3), Scalar::Int64(2)]
    );

    assert!(matches!(
        grouped.select("missing"),
        Err(Error::ColumnNotFound(_))
    ));
}

#[test]
fn test_head_and_tail() {
    let df = DataFrame::new()
        .with_column("k", vec!["a", "b", "a", "a", "b"])
        .unwrap()
        .with_column("x", vec![1i64, 2, 3, 4, 5])
        .unwrap();
    let grouped = df.group_by(KeySource::column("k")).unwrap();

    let head = grouped.head(1);
    assert_eq!(head.column("x").unwrap().to_scalars(), vec![Scalar::Int64(1), Scalar::Int64(2)]);

    let tail = grouped.tail(1);
    assert_eq!(tail.column("x").unwrap().to_scalars(), vec![Scalar::Int64(4), Scalar::Int64(5)]);
}

#[test]
fn test_all_missing_keys_keep_index_name() {
    let df = DataFrame::new()
        .with_column("key", vec![f64::NAN, f64::NAN])
        .unwrap()
        .with_column("x", vec![1.0, 2.0])
        .unwrap();
    let grouped = df.group_by("key").unwrap();
    assert_eq!(grouped.ngroups(), 0);

    let sums = grouped.sum().unwrap();
    assert_eq!(sums.row_count(), 0);
    assert_eq!(sums.column_names(), &["x".to_string()]);
    assert_eq!(sums.index().names(), vec![Some("key".to_string())]);

    let firsts = grouped.first().unwrap();
    assert_eq!(firsts.index().names(), vec![Some("key".to_string())]);
}

fn quarters() -> DataFrame {
    DataFrame::new()
        .with_column("q1", vec![1i64, 10])
        .unwrap()
        .with_column("q2", vec![2i64, 20])
        .unwrap()
        .with_column("h2", vec![5i64, 50])
        .unwrap()
}

#[test]
fn test_group_columns() {
    let df = quarters();
    let grouped = df.group_by_columns(vec!["first", "first", "second"]).unwrap();
    assert!(grouped.groups_columns());
    assert_eq!(grouped.ngroups(), 2);

    let groups = grouped.groups();
    assert_eq!(groups[&Label::from("first")], labels(&["q1", "q2"]));
    assert_eq!(groups[&Label::from("second")], labels(&["h2"]));

    let sums = grouped.sum().unwrap();
    assert_eq!(sums.column_names(), &["first".to_string(), "second".to_string()]);
    assert_eq!(sums.index().labels(), vec![Label::from(0i64), Label::from(1i64)]);
    assert_eq!(sums.get(1, "first").unwrap(), Scalar::Float64(30.0));
    assert_eq!(sums.get(0, "second").unwrap(), Scalar::Float64(5.0));

    let maxes = grouped.max().unwrap();
    assert_eq!(maxes.get(0, "first").unwrap(), Scalar::Int64(2));
}

#[test]
fn test_group_columns_by_function() {
    let df = quarters();
    let grouped = df
        .group_by_columns(KeySource::function(|label: &Label| {
            NA::Value(Label::from(label.to_string().starts_with('q')))
        }))
        .unwrap();

    let heads = grouped.head(1);
    assert_eq!(heads.column_names(), &["q1".to_string(), "h2".to_string()]);
    assert_eq!(heads.index().labels(), df.index().labels());
}

#[test]
fn test_group_columns_transform_keeps_shape() {
    let df = quarters();
    let grouped = df.group_by_columns(vec!["first", "first", "second"]).unwrap();

    let same = grouped.transform(|group| group.to_frame()).unwrap();
    assert_eq!(same, df);
}

#[test]
fn test_group_columns_rejects_column_keys() {
    let df = quarters();
    let err = df.group_by_columns(KeySource::column("q1")).unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
}
