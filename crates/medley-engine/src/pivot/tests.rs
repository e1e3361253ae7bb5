use super::*;
use medley_model::{Aggregator, PivotSpec, Scalar, Table};
use pretty_assertions::assert_eq;

fn table(headers: &[&str], rows: Vec<Vec<Scalar>>) -> Table {
    Table::new(headers.iter().map(|s| s.to_string()).collect(), rows).unwrap()
}

fn spec(rows: &[&str], values: &[&str], agg: Aggregator) -> PivotSpec {
    PivotSpec::new(
        rows.iter().map(|s| s.to_string()).collect(),
        values.iter().map(|s| s.to_string()).collect(),
        agg,
    )
}

fn media_table() -> Table {
    table(
        &["Channel", "Campaign", "Clicks"],
        vec![
            vec![
                Scalar::text("search"),
                Scalar::text("brand"),
                Scalar::number(10.0),
            ],
            vec![
                Scalar::text("search"),
                Scalar::text("generic"),
                Scalar::number(30.0),
            ],
            vec![
                Scalar::text("social"),
                Scalar::text("brand"),
                Scalar::number(5.0),
            ],
        ],
    )
}

fn cell(pivot: &Pivot, row: usize, col: usize) -> f64 {
    pivot.rows[row].cells[col].as_number().unwrap()
}

#[test]
fn guidance_when_no_grouping_columns() {
    let outcome = build_pivot(&media_table(), &spec(&[], &["Clicks"], Aggregator::Sum));
    assert!(outcome.pivot.is_none());
    assert!(outcome.message.contains("rows or for columns"));
}

#[test]
fn guidance_when_no_metric_columns() {
    let outcome = build_pivot(&media_table(), &spec(&["Channel"], &[], Aggregator::Sum));
    assert!(outcome.pivot.is_none());
    assert!(outcome.message.contains("metric"));
}

#[test]
fn guidance_when_column_is_unknown() {
    let outcome = build_pivot(&media_table(), &spec(&["Nope"], &["Clicks"], Aggregator::Sum));
    assert!(outcome.pivot.is_none());
    assert!(outcome.message.contains("Nope"));
}

#[test]
fn single_level_pivot_appends_total_row() {
    let outcome = build_pivot(&media_table(), &spec(&["Channel"], &["Clicks"], Aggregator::Sum));
    let pivot = outcome.pivot.unwrap();
    assert_eq!(outcome.message, "");
    assert_eq!(pivot.row_levels, vec!["Channel".to_string()]);
    assert_eq!(pivot.flattened_columns(), vec!["Clicks".to_string()]);
    // Sorted keys: search, social, then Total.
    assert_eq!(pivot.rows.len(), 3);
    assert_eq!(pivot.rows[0].key.0, vec![Scalar::text("search")]);
    assert_eq!(cell(&pivot, 0, 0), 40.0);
    assert_eq!(pivot.rows[1].key.0, vec![Scalar::text("social")]);
    assert_eq!(cell(&pivot, 1, 0), 5.0);
    assert_eq!(pivot.rows[2].kind, RowKind::Total);
    assert_eq!(pivot.rows[2].key.0, vec![Scalar::text("Total")]);
    assert_eq!(cell(&pivot, 2, 0), 45.0);
}

#[test]
fn total_row_sums_even_under_mean() {
    let outcome = build_pivot(&media_table(), &spec(&["Channel"], &["Clicks"], Aggregator::Mean));
    let pivot = outcome.pivot.unwrap();
    // Body is a mean (search = 20), but the Total row is still a sum of the
    // body rows, by business rule: 20 + 5.
    assert_eq!(cell(&pivot, 0, 0), 20.0);
    assert_eq!(cell(&pivot, 2, 0), 25.0);
}

#[test]
fn two_level_pivot_inserts_subtotals_and_excludes_them_from_total() {
    let outcome = build_pivot(
        &media_table(),
        &spec(&["Channel", "Campaign"], &["Clicks"], Aggregator::Sum),
    );
    let pivot = outcome.pivot.unwrap();
    let kinds: Vec<RowKind> = pivot.rows.iter().map(|r| r.kind).collect();
    assert_eq!(
        kinds,
        vec![
            RowKind::Leaf,
            RowKind::Leaf,
            RowKind::Subtotal,
            RowKind::Leaf,
            RowKind::Subtotal,
            RowKind::Total,
        ]
    );
    // search subtotal after its two campaigns.
    assert_eq!(
        pivot.rows[2].key.0,
        vec![Scalar::text("search"), Scalar::text("Subtotal")]
    );
    assert_eq!(cell(&pivot, 2, 0), 40.0);
    assert_eq!(
        pivot.rows[4].key.0,
        vec![Scalar::text("social"), Scalar::text("Subtotal")]
    );
    assert_eq!(cell(&pivot, 4, 0), 5.0);
    // Grand total is the sum over leaves only (45), not leaves + subtotals.
    assert_eq!(
        pivot.rows[5].key.0,
        vec![Scalar::text("Total"), Scalar::text("")]
    );
    assert_eq!(cell(&pivot, 5, 0), 45.0);
}

#[test]
fn no_subtotals_when_column_grouping_is_present() {
    let outcome = build_pivot(
        &media_table(),
        &PivotSpec {
            row_fields: vec!["Channel".to_string(), "Campaign".to_string()],
            column_fields: vec!["Campaign".to_string()],
            value_fields: vec!["Clicks".to_string()],
            aggregator: Aggregator::Sum,
        },
    );
    let pivot = outcome.pivot.unwrap();
    assert!(pivot.rows.iter().all(|r| r.kind != RowKind::Subtotal));
}

#[test]
fn column_grouping_cross_joins_metrics_and_fills_absent_cells_with_zero() {
    let outcome = build_pivot(
        &media_table(),
        &PivotSpec {
            row_fields: vec!["Channel".to_string()],
            column_fields: vec!["Campaign".to_string()],
            value_fields: vec!["Clicks".to_string()],
            aggregator: Aggregator::Sum,
        },
    );
    let pivot = outcome.pivot.unwrap();
    assert_eq!(
        pivot.flattened_columns(),
        vec!["Clicks | brand".to_string(), "Clicks | generic".to_string()]
    );
    assert!(pivot.columns[0].is_hierarchical());
    // social has no generic campaign: absent combination renders as 0.
    assert_eq!(pivot.rows[1].key.0, vec![Scalar::text("social")]);
    assert_eq!(cell(&pivot, 1, 0), 5.0);
    assert_eq!(cell(&pivot, 1, 1), 0.0);
}

#[test]
fn skips_blanks_inside_aggregation_but_fills_cells_with_zero() {
    let t = table(
        &["Channel", "Spend"],
        vec![
            vec![Scalar::text("search"), Scalar::number(10.0)],
            vec![Scalar::text("search"), Scalar::Blank],
            vec![Scalar::text("search"), Scalar::number(20.0)],
        ],
    );
    let outcome = build_pivot(&t, &spec(&["Channel"], &["Spend"], Aggregator::Mean));
    let pivot = outcome.pivot.unwrap();
    // Blank is excluded from the mean, not treated as zero: (10+20)/2.
    assert_eq!(cell(&pivot, 0, 0), 15.0);
}

#[test]
fn drops_rows_with_all_cells_missing() {
    let t = table(
        &["Channel", "Spend"],
        vec![
            vec![Scalar::text("search"), Scalar::number(10.0)],
            vec![Scalar::text("social"), Scalar::text("n/a")],
        ],
    );
    let outcome = build_pivot(&t, &spec(&["Channel"], &["Spend"], Aggregator::Sum));
    let pivot = outcome.pivot.unwrap();
    // social aggregated to nothing at all, so the row disappears instead of
    // rendering as a zero row.
    let keys: Vec<_> = pivot.rows.iter().map(|r| r.key.0.clone()).collect();
    assert_eq!(
        keys,
        vec![vec![Scalar::text("search")], vec![Scalar::text("Total")]]
    );
}

#[test]
fn metric_text_is_normalized_for_arithmetic_aggregators() {
    let t = table(
        &["Channel", "Spend"],
        vec![
            vec![Scalar::text("search"), Scalar::text("1 234,50")],
            vec![Scalar::text("search"), Scalar::text("765,50")],
        ],
    );
    let outcome = build_pivot(&t, &spec(&["Channel"], &["Spend"], Aggregator::Sum));
    let pivot = outcome.pivot.unwrap();
    assert_eq!(cell(&pivot, 0, 0), 2000.0);
}

#[test]
fn count_tallies_non_blank_values_without_coercion() {
    let t = table(
        &["Channel", "Spend"],
        vec![
            vec![Scalar::text("search"), Scalar::text("n/a")],
            vec![Scalar::text("search"), Scalar::number(3.0)],
            vec![Scalar::text("search"), Scalar::Blank],
        ],
    );
    let outcome = build_pivot(&t, &spec(&["Channel"], &["Spend"], Aggregator::Count));
    let pivot = outcome.pivot.unwrap();
    // Text still counts; only blanks are excluded.
    assert_eq!(cell(&pivot, 0, 0), 2.0);
}

#[test]
fn blank_and_nan_keys_form_their_own_groups() {
    let t = table(
        &["Bucket", "Clicks"],
        vec![
            vec![Scalar::number(f64::NAN), Scalar::number(1.0)],
            vec![Scalar::number(f64::NAN), Scalar::number(2.0)],
            vec![Scalar::Blank, Scalar::number(4.0)],
            vec![Scalar::number(1.0), Scalar::number(8.0)],
        ],
    );
    let outcome = build_pivot(&t, &spec(&["Bucket"], &["Clicks"], Aggregator::Sum));
    let pivot = outcome.pivot.unwrap();
    // Sorted: 1.0, NaN (numbers last among numbers via total order), Blank, Total.
    assert_eq!(pivot.rows.len(), 4);
    assert_eq!(cell(&pivot, 0, 0), 8.0);
    assert_eq!(cell(&pivot, 1, 0), 3.0);
    assert_eq!(cell(&pivot, 2, 0), 4.0);
    assert_eq!(pivot.rows[3].kind, RowKind::Total);
    assert_eq!(cell(&pivot, 3, 0), 15.0);
}

#[test]
fn min_and_max_aggregators() {
    let outcome = build_pivot(&media_table(), &spec(&["Channel"], &["Clicks"], Aggregator::Max));
    let pivot = outcome.pivot.unwrap();
    assert_eq!(cell(&pivot, 0, 0), 30.0);
    let outcome = build_pivot(&media_table(), &spec(&["Channel"], &["Clicks"], Aggregator::Min));
    let pivot = outcome.pivot.unwrap();
    assert_eq!(cell(&pivot, 0, 0), 10.0);
}

#[test]
fn median_interpolates_even_counts() {
    let t = table(
        &["Channel", "Clicks"],
        vec![
            vec![Scalar::text("search"), Scalar::number(1.0)],
            vec![Scalar::text("search"), Scalar::number(2.0)],
            vec![Scalar::text("search"), Scalar::number(10.0)],
            vec![Scalar::text("search"), Scalar::number(20.0)],
        ],
    );
    let outcome = build_pivot(&t, &spec(&["Channel"], &["Clicks"], Aggregator::Median));
    let pivot = outcome.pivot.unwrap();
    assert_eq!(cell(&pivot, 0, 0), 6.0);
}
