//! Core data model for Medley: scalar values, flat tables, and the
//! grouping/metric specifications consumed by the pivot engine.

pub mod numbers;
mod table;
mod value;

pub use table::{Table, TableError};
pub use value::{RowKey, Scalar};

use serde::{Deserialize, Serialize};

/// Reduction applied to grouped metric values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Aggregator {
    Sum,
    Mean,
    Count,
    Median,
    Min,
    Max,
}

impl Aggregator {
    /// Whether metric columns must be coerced to numbers before aggregating.
    ///
    /// `Count` tallies non-blank cells of any type, so it skips coercion.
    pub fn requires_numeric(&self) -> bool {
        !matches!(self, Aggregator::Count)
    }
}

/// Specification of a pivot: which columns group rows, which (optional)
/// columns become cross-tab columns, which metric columns are aggregated,
/// and with which aggregator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PivotSpec {
    pub row_fields: Vec<String>,
    #[serde(default)]
    pub column_fields: Vec<String>,
    pub value_fields: Vec<String>,
    pub aggregator: Aggregator,
}

impl PivotSpec {
    pub fn new(
        row_fields: Vec<String>,
        value_fields: Vec<String>,
        aggregator: Aggregator,
    ) -> Self {
        Self {
            row_fields,
            column_fields: Vec::new(),
            value_fields,
            aggregator,
        }
    }
}
