//! Per-invocation context. Each step (load, pivot) replaces the whole
//! session rather than mutating it in place, so a later step can never see
//! a half-updated state.

use medley_engine::Pivot;
use medley_format::NumberStyle;
use medley_model::Table;

#[derive(Debug, Clone, Copy, Default)]
pub struct DisplayOptions {
    pub number_style: NumberStyle,
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    pub table: Option<Table>,
    pub pivot: Option<Pivot>,
    pub display: DisplayOptions,
}

impl Session {
    pub fn new(display: DisplayOptions) -> Self {
        Self {
            table: None,
            pivot: None,
            display,
        }
    }

    /// A fresh session holding the loaded table. Any previously built pivot
    /// is dropped with the old session.
    pub fn with_table(&self, table: Table) -> Self {
        Self {
            table: Some(table),
            pivot: None,
            display: self.display,
        }
    }

    pub fn with_pivot(&self, pivot: Pivot) -> Self {
        Self {
            table: self.table.clone(),
            pivot: Some(pivot),
            display: self.display,
        }
    }
}
