//! Algebraic properties of the pivot builder that must hold for arbitrary
//! tables: the Total row is always the column-wise sum of leaf rows no
//! matter which aggregator shaped the body, and two-level subtotals sum
//! exactly their own group without double-counting into the grand total.

use medley_engine::pivot::{build_pivot, RowKind};
use medley_model::{Aggregator, PivotSpec, Scalar, Table};
use proptest::prelude::*;

const TOLERANCE: f64 = 1e-6;

fn aggregator() -> impl Strategy<Value = Aggregator> {
    prop_oneof![
        Just(Aggregator::Sum),
        Just(Aggregator::Mean),
        Just(Aggregator::Count),
        Just(Aggregator::Median),
        Just(Aggregator::Min),
        Just(Aggregator::Max),
    ]
}

fn metric_cell() -> impl Strategy<Value = Scalar> {
    prop_oneof![
        4 => (-1000.0..1000.0f64).prop_map(Scalar::number),
        1 => Just(Scalar::Blank),
    ]
}

fn source_rows() -> impl Strategy<Value = Vec<(u8, u8, Scalar)>> {
    proptest::collection::vec((0u8..3, 0u8..3, metric_cell()), 1..40)
}

fn table_from(rows: &[(u8, u8, Scalar)]) -> Table {
    let data = rows
        .iter()
        .map(|(a, b, metric)| {
            vec![
                Scalar::text(format!("group-{a}")),
                Scalar::text(format!("sub-{b}")),
                metric.clone(),
            ]
        })
        .collect();
    Table::new(
        vec!["Level1".to_string(), "Level2".to_string(), "Metric".to_string()],
        data,
    )
    .unwrap()
}

fn cells_sum(rows: &[&medley_engine::pivot::PivotRow], col: usize) -> f64 {
    rows.iter()
        .filter_map(|r| r.cells[col].as_number())
        .sum()
}

proptest! {
    #[test]
    fn total_row_is_column_wise_sum_of_leaves(
        rows in source_rows(),
        agg in aggregator(),
    ) {
        let table = table_from(&rows);
        let spec = PivotSpec::new(
            vec!["Level1".to_string()],
            vec!["Metric".to_string()],
            agg,
        );
        let pivot = build_pivot(&table, &spec).pivot.unwrap();

        let leaves: Vec<_> = pivot
            .rows
            .iter()
            .filter(|r| r.kind == RowKind::Leaf)
            .collect();
        let total = pivot
            .rows
            .iter()
            .find(|r| r.kind == RowKind::Total)
            .unwrap();
        for col in 0..pivot.columns.len() {
            let expected = cells_sum(&leaves, col);
            let actual = total.cells[col].as_number().unwrap();
            prop_assert!((expected - actual).abs() <= TOLERANCE);
        }
    }

    #[test]
    fn subtotals_sum_their_group_and_total_excludes_them(
        rows in source_rows(),
        agg in aggregator(),
    ) {
        let table = table_from(&rows);
        let spec = PivotSpec::new(
            vec!["Level1".to_string(), "Level2".to_string()],
            vec!["Metric".to_string()],
            agg,
        );
        let pivot = build_pivot(&table, &spec).pivot.unwrap();

        let leaves: Vec<_> = pivot
            .rows
            .iter()
            .filter(|r| r.kind == RowKind::Leaf)
            .collect();
        let total = pivot
            .rows
            .iter()
            .find(|r| r.kind == RowKind::Total)
            .unwrap();

        // Grand total over leaves only, never inflated by subtotal rows.
        for col in 0..pivot.columns.len() {
            let expected = cells_sum(&leaves, col);
            let actual = total.cells[col].as_number().unwrap();
            prop_assert!((expected - actual).abs() <= TOLERANCE);
        }

        for subtotal in pivot.rows.iter().filter(|r| r.kind == RowKind::Subtotal) {
            let group = subtotal.key.0[0].clone();
            prop_assert_eq!(&subtotal.key.0[1], &Scalar::text("Subtotal"));
            let members: Vec<_> = leaves
                .iter()
                .copied()
                .filter(|r| r.key.0[0] == group)
                .collect();
            prop_assert!(!members.is_empty());
            for col in 0..pivot.columns.len() {
                let expected = cells_sum(&members, col);
                let actual = subtotal.cells[col].as_number().unwrap();
                prop_assert!((expected - actual).abs() <= TOLERANCE);
            }
        }
    }

    #[test]
    fn every_leaf_key_appears_exactly_once(rows in source_rows()) {
        let table = table_from(&rows);
        let spec = PivotSpec::new(
            vec!["Level1".to_string(), "Level2".to_string()],
            vec!["Metric".to_string()],
            Aggregator::Sum,
        );
        let pivot = build_pivot(&table, &spec).pivot.unwrap();
        let mut seen = std::collections::HashSet::new();
        for row in pivot.rows.iter().filter(|r| r.kind == RowKind::Leaf) {
            prop_assert!(seen.insert(row.key.clone()));
        }
    }
}
