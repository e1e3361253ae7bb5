//! Medley's computation core: pivot building, payload serialization, and
//! the analysis engine that grounds generated commentary in real numbers.
//!
//! Data flow: [`medley_model::Table`] → [`pivot::build_pivot`] →
//! [`payload::Payload::from_pivot`] → [`analysis::analyze`].

pub mod analysis;
pub mod payload;
pub mod pivot;

pub use analysis::{analyze, Analysis};
pub use payload::Payload;
pub use pivot::{build_pivot, ColumnLabel, Pivot, PivotOutcome, PivotRow, RowKind};
