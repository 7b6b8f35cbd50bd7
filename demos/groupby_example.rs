use pandrs_groupby::{AggFunc, DataFrame, KeySource, PandRSError, Series};

fn main() -> Result<(), PandRSError> {
    println!("=== Group-by sample ===");

    // Prepare data
    let values = Series::new(vec![10.0, 20.0, 15.0, 30.0, 25.0, 15.0], Some("values".to_string()));
    let keys = vec!["A", "B", "A", "C", "B", "A"];

    let grouped = values.group_by(keys)?;
    println!("Number of groups: {}", grouped.ngroups());

    println!("\n--- Group sizes ---");
    for (key, size) in grouped.size()?.iter() {
        println!("group '{}': {} rows", key, size);
    }

    println!("\n--- Sum per group ---");
    for (key, sum) in grouped.sum()?.iter() {
        println!("group '{}' sum: {}", key, sum);
    }

    println!("\n--- Deviation from the group mean ---");
    let deviation = grouped.transform(|g| {
        let mean = g.mean();
        g.map(|v| v - mean)
    })?;
    for (label, value) in deviation.iter() {
        println!("row {}: {:+.2}", label, value);
    }

    // Frame grouped by two columns
    println!("\n--- Sales by region and year ---");
    let df = DataFrame::new()
        .with_column("region", vec!["east", "west", "east", "west", "east"])?
        .with_column("year", vec![2023i64, 2023, 2024, 2024, 2023])?
        .with_column("sales", vec![120.0, 80.0, 150.0, 95.0, 60.0])?
        .with_column("rep", vec!["Sato", "Kim", "Ito", "Lee", "Mori"])?;

    let by_region_year = df.group_by_keys(vec![
        KeySource::column("region"),
        KeySource::column("year"),
    ])?;
    let totals = by_region_year.agg_columns(&[
        ("sales", AggFunc::Sum),
        ("sales", AggFunc::Mean),
        ("rep", AggFunc::First),
    ])?;
    for row in 0..totals.row_count() {
        let key = totals.index().get(row).map(|l| l.to_string()).unwrap_or_default();
        println!(
            "{}: total {}, mean {}, first rep {}",
            key,
            totals.get(row, "sales_sum")?,
            totals.get(row, "sales_mean")?,
            totals.get(row, "rep")?
        );
    }

    // Text columns are dropped from numeric reductions
    let means = df.group_by("region")?.mean()?;
    println!("\nMean columns by region: {:?}", means.column_names());

    Ok(())
}
