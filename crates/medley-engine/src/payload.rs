//! Analysis payload: the flattened, size-bounded, serializable view of a
//! pivot handed to the analysis engine and narrative generators.
//!
//! Hierarchical column labels are joined with `" | "`, the row key is
//! demoted into ordinary named columns, and rows are truncated to a
//! deterministic prefix of at most `max_rows`.

use std::collections::BTreeMap;

use medley_model::numbers::parse_locale_number;
use medley_model::Scalar;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::pivot::Pivot;

/// Default row ceiling for payloads.
pub const DEFAULT_MAX_ROWS: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shape {
    pub rows: usize,
    pub cols: usize,
}

/// Per-column summary over the truncated rows. Only columns with at least
/// one numeric value and no text get an entry, so every statistic here is
/// defined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSummary {
    pub sum: f64,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub non_null: u64,
}

/// Self-contained flat view of a pivot. Created fresh per pivot and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payload {
    pub shape: Shape,
    pub columns: Vec<String>,
    pub numeric_summary: BTreeMap<String, ColumnSummary>,
    pub rows: Vec<serde_json::Map<String, Value>>,
}

fn scalar_to_json(value: &Scalar) -> Value {
    match value {
        Scalar::Blank => Value::Null,
        Scalar::Text(s) => Value::String(s.clone()),
        Scalar::Number(n) => serde_json::Number::from_f64(n.0)
            .map(Value::Number)
            .unwrap_or(Value::Null),
    }
}

/// Numeric reading of a payload cell: JSON numbers directly, numeric-looking
/// strings through locale normalization, everything else `None`.
pub fn json_as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_locale_number(s),
        _ => None,
    }
}

impl Payload {
    pub fn from_pivot(pivot: &Pivot, max_rows: usize) -> Self {
        let mut columns: Vec<String> = pivot.row_levels.clone();
        columns.extend(pivot.flattened_columns());

        // Demote the row key into leading cells, then truncate.
        let grid: Vec<Vec<Scalar>> = pivot
            .rows
            .iter()
            .take(max_rows)
            .map(|row| {
                let mut cells = row.key.0.clone();
                cells.extend(row.cells.iter().cloned());
                cells
            })
            .collect();

        let mut numeric_summary = BTreeMap::new();
        for (idx, name) in columns.iter().enumerate() {
            let mut values: Vec<f64> = Vec::new();
            let mut saw_text = false;
            for row in &grid {
                match &row[idx] {
                    Scalar::Number(n) if !n.0.is_nan() => values.push(n.0),
                    Scalar::Text(_) => saw_text = true,
                    _ => {}
                }
            }
            // A column counts as numeric only when nothing textual sits in
            // it; a mixed key column (e.g. numeric buckets plus "Total")
            // stays out of the summary.
            if saw_text || values.is_empty() {
                continue;
            }
            let sum: f64 = values.iter().sum();
            numeric_summary.insert(
                name.clone(),
                ColumnSummary {
                    sum,
                    mean: sum / values.len() as f64,
                    min: values.iter().copied().fold(f64::INFINITY, f64::min),
                    max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                    non_null: values.len() as u64,
                },
            );
        }

        let rows: Vec<serde_json::Map<String, Value>> = grid
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .zip(row)
                    .map(|(name, cell)| (name.clone(), scalar_to_json(cell)))
                    .collect()
            })
            .collect();

        Payload {
            shape: Shape {
                rows: rows.len(),
                cols: columns.len(),
            },
            columns,
            numeric_summary,
            rows,
        }
    }

    /// Numeric values of one column, one entry per row (`None` where the
    /// cell is missing or non-numeric).
    pub fn column_numbers(&self, name: &str) -> Vec<Option<f64>> {
        self.rows
            .iter()
            .map(|row| row.get(name).and_then(json_as_number))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pivot::{build_pivot, ColumnLabel};
    use medley_model::{Aggregator, PivotSpec, Scalar, Table};
    use pretty_assertions::assert_eq;

    fn sample_pivot(column_fields: Vec<String>) -> Pivot {
        let table = Table::new(
            vec![
                "Channel".to_string(),
                "Device".to_string(),
                "Clicks".to_string(),
            ],
            vec![
                vec![
                    Scalar::text("search"),
                    Scalar::text("mobile"),
                    Scalar::number(10.0),
                ],
                vec![
                    Scalar::text("search"),
                    Scalar::text("desktop"),
                    Scalar::number(30.0),
                ],
                vec![
                    Scalar::text("social"),
                    Scalar::text("mobile"),
                    Scalar::number(5.0),
                ],
            ],
        )
        .unwrap();
        build_pivot(
            &table,
            &PivotSpec {
                row_fields: vec!["Channel".to_string()],
                column_fields,
                value_fields: vec!["Clicks".to_string()],
                aggregator: Aggregator::Sum,
            },
        )
        .pivot
        .unwrap()
    }

    #[test]
    fn flat_pivot_payload_has_key_column_and_summary() {
        let payload = Payload::from_pivot(&sample_pivot(Vec::new()), DEFAULT_MAX_ROWS);
        assert_eq!(payload.columns, vec!["Channel".to_string(), "Clicks".to_string()]);
        assert_eq!(payload.shape, Shape { rows: 3, cols: 2 });
        let summary = &payload.numeric_summary["Clicks"];
        // 40 + 5 + Total 45.
        assert_eq!(summary.sum, 90.0);
        assert_eq!(summary.non_null, 3);
        assert_eq!(summary.min, 5.0);
        assert_eq!(summary.max, 45.0);
        // Key column holds text, so it never enters the numeric summary.
        assert!(!payload.numeric_summary.contains_key("Channel"));
        assert_eq!(
            payload.rows[2].get("Channel"),
            Some(&Value::String("Total".to_string()))
        );
    }

    #[test]
    fn hierarchical_columns_flatten_and_round_trip() {
        let pivot = sample_pivot(vec!["Device".to_string()]);
        let payload = Payload::from_pivot(&pivot, DEFAULT_MAX_ROWS);
        assert_eq!(
            payload.columns,
            vec![
                "Channel".to_string(),
                "Clicks | desktop".to_string(),
                "Clicks | mobile".to_string(),
            ]
        );
        // Splitting the joined names back on the separator recovers the
        // original label levels.
        let recovered: Vec<ColumnLabel> = payload.columns[1..]
            .iter()
            .map(|name| ColumnLabel(name.split(" | ").map(str::to_string).collect()))
            .collect();
        assert_eq!(recovered, pivot.columns);
    }

    #[test]
    fn truncation_is_a_deterministic_prefix() {
        let pivot = sample_pivot(Vec::new());
        let payload = Payload::from_pivot(&pivot, 2);
        assert_eq!(payload.shape.rows, 2);
        assert_eq!(
            payload.rows[0].get("Channel"),
            Some(&Value::String("search".to_string()))
        );
        assert_eq!(
            payload.rows[1].get("Channel"),
            Some(&Value::String("social".to_string()))
        );
        // Summary is computed after truncation: Total row no longer counted.
        assert_eq!(payload.numeric_summary["Clicks"].sum, 45.0);
    }

    #[test]
    fn payload_serializes_to_camel_case_json() {
        let payload = Payload::from_pivot(&sample_pivot(Vec::new()), DEFAULT_MAX_ROWS);
        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("numericSummary").is_some());
        assert_eq!(json["shape"]["rows"], serde_json::json!(3));
    }

    #[test]
    fn column_numbers_reads_numbers_and_numeric_strings() {
        let mut payload = Payload::from_pivot(&sample_pivot(Vec::new()), DEFAULT_MAX_ROWS);
        payload.rows[0].insert(
            "Clicks".to_string(),
            Value::String("1 234,5".to_string()),
        );
        let values = payload.column_numbers("Clicks");
        assert_eq!(values, vec![Some(1234.5), Some(5.0), Some(45.0)]);
    }
}
