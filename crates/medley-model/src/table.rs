use std::collections::HashMap;

use thiserror::Error;

use crate::Scalar;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("duplicate column header: {0}")]
    DuplicateHeader(String),
    #[error("row {row} has {got} cells but table has {want} columns")]
    RowWidthMismatch { row: usize, got: usize, want: usize },
}

/// Flat rectangular table: ordered named columns over row-major cells.
///
/// Invariant: headers are unique (order-preserving) and every row has
/// exactly one cell per header.
#[derive(Clone, Debug, PartialEq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<Scalar>>,
    header_index: HashMap<String, usize>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Scalar>>) -> Result<Self, TableError> {
        let mut header_index: HashMap<String, usize> = HashMap::with_capacity(headers.len());
        for (idx, header) in headers.iter().enumerate() {
            if header_index.insert(header.clone(), idx).is_some() {
                return Err(TableError::DuplicateHeader(header.clone()));
            }
        }
        for (row_idx, row) in rows.iter().enumerate() {
            if row.len() != headers.len() {
                return Err(TableError::RowWidthMismatch {
                    row: row_idx,
                    got: row.len(),
                    want: headers.len(),
                });
            }
        }
        Ok(Self {
            headers,
            rows,
            header_index,
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Scalar>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    pub fn column_index(&self, header: &str) -> Option<usize> {
        self.header_index.get(header).copied()
    }

    /// Cells of one column, top to bottom.
    pub fn column(&self, header: &str) -> Option<Vec<&Scalar>> {
        let idx = self.column_index(header)?;
        Some(self.rows.iter().map(|row| &row[idx]).collect())
    }

    pub fn cell(&self, row: usize, header: &str) -> Option<&Scalar> {
        let idx = self.column_index(header)?;
        self.rows.get(row)?.get(idx)
    }
}
