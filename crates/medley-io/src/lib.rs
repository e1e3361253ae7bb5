//! Table ingestion and export.
//!
//! Ingestion accepts delimited text of unknown provenance: it sniffs the
//! delimiter among `,` `;` tab `|`, decodes UTF-8 with a Windows-1252
//! fallback, rejects spreadsheet binaries renamed to `.csv`, and cleans
//! synthetic "Unnamed" columns and fully-empty rows. Export writes a pivot
//! back out as CSV with flattened column labels.

mod export;
mod ingest;

pub use export::write_pivot_csv;
pub use ingest::{read_delimited, IngestError};
