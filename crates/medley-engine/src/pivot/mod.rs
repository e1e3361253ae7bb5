//! Pivot builder.
//!
//! Groups a flat table by row/column key tuples, aggregates metric columns
//! within each group, and renders an ordered table with an always-sum Total
//! row and, for two-level row grouping without column grouping, per-group
//! Subtotal rows.
//!
//! Two missing-data policies coexist here and must not be conflated:
//! - inside aggregation, blank values are skipped (a `mean` over blanks is
//!   undefined, not zero);
//! - across the cross-tab, a cell with no aggregable value fills with `0`,
//!   unless the entire row came up empty, in which case the row is dropped.

use std::collections::BTreeMap;

use medley_model::numbers::normalize_column;
use medley_model::{Aggregator, PivotSpec, RowKey, Scalar, Table};
use serde::{Deserialize, Serialize};

/// Label written out of each first-level group's synthetic sum row.
pub const SUBTOTAL_LABEL: &str = "Subtotal";
/// Label keying the synthetic grand-total row.
pub const TOTAL_LABEL: &str = "Total";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RowKind {
    Leaf,
    Subtotal,
    Total,
}

/// Possibly multi-level column label. Single level when there is no column
/// grouping; metric name first, then column-group values, otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnLabel(pub Vec<String>);

impl ColumnLabel {
    /// Joins the levels with the fixed `" | "` separator, preserving level
    /// order. The payload serializer and CSV export both rely on this.
    pub fn flattened(&self) -> String {
        self.0.join(" | ")
    }

    pub fn is_hierarchical(&self) -> bool {
        self.0.len() > 1
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PivotRow {
    pub key: RowKey,
    pub kind: RowKind,
    pub cells: Vec<Scalar>,
}

/// Aggregated cross-tabulation of a flat table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pivot {
    /// Names of the row-key levels, in grouping order.
    pub row_levels: Vec<String>,
    pub columns: Vec<ColumnLabel>,
    pub rows: Vec<PivotRow>,
}

impl Pivot {
    pub fn flattened_columns(&self) -> Vec<String> {
        self.columns.iter().map(ColumnLabel::flattened).collect()
    }

    pub fn leaf_rows(&self) -> impl Iterator<Item = &PivotRow> {
        self.rows.iter().filter(|r| r.kind == RowKind::Leaf)
    }
}

/// Result of a pivot build. Configuration problems produce `pivot: None`
/// plus human-readable guidance rather than an error, so a caller can keep
/// the session alive and render the message.
#[derive(Debug, Clone, PartialEq)]
pub struct PivotOutcome {
    pub pivot: Option<Pivot>,
    pub message: String,
}

impl PivotOutcome {
    fn guidance(message: impl Into<String>) -> Self {
        Self {
            pivot: None,
            message: message.into(),
        }
    }

    fn built(pivot: Pivot) -> Self {
        Self {
            pivot: Some(pivot),
            message: String::new(),
        }
    }
}

#[derive(Debug, Clone)]
struct Accumulator {
    count: u64,
    count_numbers: u64,
    sum: f64,
    min: f64,
    max: f64,
    values: Vec<f64>,
}

impl Accumulator {
    fn new() -> Self {
        Self {
            count: 0,
            count_numbers: 0,
            sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            values: Vec::new(),
        }
    }

    fn update(&mut self, value: &Scalar) {
        if !value.is_blank() {
            self.count += 1;
        }
        if let Some(x) = value.as_number() {
            self.count_numbers += 1;
            self.sum += x;
            if x < self.min {
                self.min = x;
            }
            if x > self.max {
                self.max = x;
            }
            self.values.push(x);
        }
    }

    fn median(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        let mut sorted = self.values.clone();
        sorted.sort_by(f64::total_cmp);
        let mid = sorted.len() / 2;
        if sorted.len() % 2 == 1 {
            Some(sorted[mid])
        } else {
            Some((sorted[mid - 1] + sorted[mid]) / 2.0)
        }
    }

    /// `None` means "no aggregable value"; the caller decides between the
    /// fill-0 and drop-row policies.
    fn finalize(&self, agg: Aggregator) -> Option<f64> {
        match agg {
            Aggregator::Count => Some(self.count as f64),
            Aggregator::Sum => {
                if self.count_numbers == 0 {
                    None
                } else {
                    Some(self.sum)
                }
            }
            Aggregator::Mean => {
                if self.count_numbers == 0 {
                    None
                } else {
                    Some(self.sum / self.count_numbers as f64)
                }
            }
            Aggregator::Median => self.median(),
            Aggregator::Min => {
                if self.count_numbers == 0 {
                    None
                } else {
                    Some(self.min)
                }
            }
            Aggregator::Max => {
                if self.count_numbers == 0 {
                    None
                } else {
                    Some(self.max)
                }
            }
        }
    }
}

fn column_wise_sum(rows: &[&PivotRow], width: usize) -> Vec<Scalar> {
    let mut sums = vec![0.0f64; width];
    for row in rows {
        for (idx, cell) in row.cells.iter().enumerate() {
            if let Some(x) = cell.as_number() {
                sums[idx] += x;
            }
        }
    }
    sums.into_iter().map(Scalar::number).collect()
}

fn total_key(levels: usize) -> RowKey {
    let mut parts = Vec::with_capacity(levels);
    if levels > 0 {
        parts.push(Scalar::text(TOTAL_LABEL));
        for _ in 1..levels {
            parts.push(Scalar::text(""));
        }
    }
    RowKey(parts)
}

/// Builds a pivot from a [`PivotSpec`]. See [`PivotOutcome`] for the
/// configuration-message contract.
pub fn build_pivot(table: &Table, spec: &PivotSpec) -> PivotOutcome {
    if spec.row_fields.is_empty() && spec.column_fields.is_empty() {
        return PivotOutcome::guidance(
            "Choose at least one column for rows or for columns before pivoting.",
        );
    }
    if spec.value_fields.is_empty() {
        return PivotOutcome::guidance("Choose at least one metric column to aggregate.");
    }
    for name in spec
        .row_fields
        .iter()
        .chain(&spec.column_fields)
        .chain(&spec.value_fields)
    {
        if table.column_index(name).is_none() {
            return PivotOutcome::guidance(format!(
                "Column \"{name}\" does not exist in the loaded table."
            ));
        }
    }

    // Metric columns, coerced up front when the aggregator is arithmetic.
    let metric_columns: Vec<Vec<Scalar>> = spec
        .value_fields
        .iter()
        .map(|name| {
            let raw: Vec<Scalar> = table
                .column(name)
                .unwrap_or_default()
                .into_iter()
                .cloned()
                .collect();
            if spec.aggregator.requires_numeric() {
                normalize_column(&raw)
            } else {
                raw
            }
        })
        .collect();

    let row_indices: Vec<usize> = spec
        .row_fields
        .iter()
        .filter_map(|f| table.column_index(f))
        .collect();
    let col_indices: Vec<usize> = spec
        .column_fields
        .iter()
        .filter_map(|f| table.column_index(f))
        .collect();

    // cube[row_key][col_key][metric]. BTreeMaps give the deterministic,
    // sorted key order the output contract requires.
    let mut cube: BTreeMap<RowKey, BTreeMap<RowKey, Vec<Accumulator>>> = BTreeMap::new();
    let mut col_keys: std::collections::BTreeSet<RowKey> = std::collections::BTreeSet::new();

    for (row_idx, row) in table.rows().iter().enumerate() {
        let row_key = RowKey(row_indices.iter().map(|&i| row[i].clone()).collect());
        let col_key = RowKey(col_indices.iter().map(|&i| row[i].clone()).collect());
        col_keys.insert(col_key.clone());

        let cell = cube
            .entry(row_key)
            .or_default()
            .entry(col_key)
            .or_insert_with(|| {
                (0..spec.value_fields.len())
                    .map(|_| Accumulator::new())
                    .collect()
            });
        for (m, column) in metric_columns.iter().enumerate() {
            cell[m].update(&column[row_idx]);
        }
    }

    if col_keys.is_empty() {
        col_keys.insert(RowKey(Vec::new()));
    }
    let col_keys: Vec<RowKey> = col_keys.into_iter().collect();

    let columns: Vec<ColumnLabel> = col_keys
        .iter()
        .flat_map(|col_key| {
            spec.value_fields.iter().map(move |metric| {
                let mut levels = vec![metric.clone()];
                levels.extend(col_key.display_strings());
                ColumnLabel(levels)
            })
        })
        .collect();

    // Leaf rows: fill absent combinations with 0, drop all-missing rows.
    let mut leaves: Vec<PivotRow> = Vec::with_capacity(cube.len());
    for (row_key, by_col) in &cube {
        let mut cells: Vec<Option<f64>> = Vec::with_capacity(columns.len());
        for col_key in &col_keys {
            let accs = by_col.get(col_key);
            for m in 0..spec.value_fields.len() {
                cells.push(accs.and_then(|a| a[m].finalize(spec.aggregator)));
            }
        }
        if cells.iter().all(Option::is_none) {
            continue;
        }
        leaves.push(PivotRow {
            key: row_key.clone(),
            kind: RowKind::Leaf,
            cells: cells
                .into_iter()
                .map(|c| Scalar::number(c.unwrap_or(0.0)))
                .collect(),
        });
    }

    let width = columns.len();
    let total = PivotRow {
        key: total_key(spec.row_fields.len()),
        kind: RowKind::Total,
        cells: column_wise_sum(&leaves.iter().collect::<Vec<_>>(), width),
    };

    let with_subtotals = spec.row_fields.len() == 2 && spec.column_fields.is_empty();
    let mut rows: Vec<PivotRow> = Vec::with_capacity(leaves.len() + 2);
    if with_subtotals {
        let mut group: Vec<PivotRow> = Vec::new();
        let mut group_value: Option<Scalar> = None;
        let flush =
            |group: &mut Vec<PivotRow>, group_value: &Option<Scalar>, rows: &mut Vec<PivotRow>| {
                if group.is_empty() {
                    return;
                }
                let sub_cells = column_wise_sum(&group.iter().collect::<Vec<_>>(), width);
                let value = group_value.clone().unwrap_or(Scalar::Blank);
                rows.append(group);
                rows.push(PivotRow {
                    key: RowKey(vec![value, Scalar::text(SUBTOTAL_LABEL)]),
                    kind: RowKind::Subtotal,
                    cells: sub_cells,
                });
            };
        for leaf in leaves {
            let first = leaf.key.0.first().cloned().unwrap_or(Scalar::Blank);
            if group_value.as_ref() != Some(&first) {
                flush(&mut group, &group_value, &mut rows);
                group_value = Some(first);
            }
            group.push(leaf);
        }
        flush(&mut group, &group_value, &mut rows);
    } else {
        rows.extend(leaves);
    }
    rows.push(total);

    PivotOutcome::built(Pivot {
        row_levels: spec.row_fields.clone(),
        columns,
        rows,
    })
}

#[cfg(test)]
mod tests;
