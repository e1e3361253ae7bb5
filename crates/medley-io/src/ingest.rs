use csv::ReaderBuilder;
use encoding_rs::WINDOWS_1252;
use medley_model::{Scalar, Table, TableError};
use thiserror::Error;

/// How many leading characters the delimiter sniffer inspects.
const SNIFF_WINDOW: usize = 5000;
const CANDIDATE_DELIMITERS: [u8; 4] = [b';', b',', b'\t', b'|'];

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("the file is empty")]
    Empty,
    #[error("this looks like a spreadsheet workbook renamed to .csv; export a real CSV instead")]
    RenamedSpreadsheet,
    #[error("could not determine the delimiter (use , or ;)")]
    UnknownDelimiter,
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Table(#[from] TableError),
}

fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        // Windows-1252 decodes any byte sequence, so this never fails.
        Err(_) => WINDOWS_1252.decode(bytes).0.into_owned(),
    }
}

/// Picks the candidate occurring most often in the sniff window. Ties go
/// to the earlier candidate, so `;` beats `,`.
fn sniff_delimiter(text: &str) -> u8 {
    let window = &text.as_bytes()[..text.len().min(SNIFF_WINDOW)];
    let mut best = CANDIDATE_DELIMITERS[0];
    let mut best_count = 0usize;
    for candidate in CANDIDATE_DELIMITERS {
        let count = window.iter().filter(|b| **b == candidate).count();
        if count > best_count {
            best = candidate;
            best_count = count;
        }
    }
    best
}

fn parse_records(text: &str, delimiter: u8) -> Result<Vec<Vec<String>>, csv::Error> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());
    let mut records = Vec::new();
    for record in reader.records() {
        let record = record?;
        records.push(record.iter().map(str::to_string).collect());
    }
    Ok(records)
}

/// Normalizes header captions into non-empty, unique (case-insensitive)
/// column names: collided captions get `" (2)"`, `" (3)"`, ... suffixes.
fn normalize_headers(headers: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(headers.len());
    let mut used: std::collections::HashSet<String> = Default::default();
    for header in headers {
        let base = header.trim().to_string();
        let mut name = base.clone();
        if used.contains(&name.to_lowercase()) {
            let mut suffix = 2usize;
            loop {
                name = format!("{base} ({suffix})");
                if !used.contains(&name.to_lowercase()) {
                    break;
                }
                suffix += 1;
            }
        }
        used.insert(name.to_lowercase());
        out.push(name);
    }
    out
}

fn is_synthetic_header(header: &str) -> bool {
    let trimmed = header.trim();
    trimmed.is_empty() || trimmed.starts_with("Unnamed")
}

fn build_table(records: &[Vec<String>]) -> Result<Table, IngestError> {
    let header_row = records.first().ok_or(IngestError::Empty)?;

    // Keep only real columns; pandas-style "Unnamed: n" artifacts and blank
    // captions are synthetic.
    let kept: Vec<usize> = (0..header_row.len())
        .filter(|idx| !is_synthetic_header(&header_row[*idx]))
        .collect();
    if kept.is_empty() {
        return Err(IngestError::Empty);
    }
    let headers = normalize_headers(
        &kept
            .iter()
            .map(|&idx| header_row[idx].clone())
            .collect::<Vec<_>>(),
    );

    let mut raw_rows: Vec<Vec<String>> = Vec::new();
    for record in &records[1..] {
        let cells: Vec<String> = kept
            .iter()
            .map(|&idx| record.get(idx).cloned().unwrap_or_default())
            .collect();
        if cells.iter().all(|c| c.trim().is_empty()) {
            continue;
        }
        raw_rows.push(cells);
    }

    // Whole-column typing: a column is numeric only when every non-empty
    // cell parses as a plain number.
    let numeric_column: Vec<bool> = (0..headers.len())
        .map(|col| {
            let mut any = false;
            for row in &raw_rows {
                let cell = row[col].trim();
                if cell.is_empty() {
                    continue;
                }
                if cell.parse::<f64>().is_err() {
                    return false;
                }
                any = true;
            }
            any
        })
        .collect();

    let rows: Vec<Vec<Scalar>> = raw_rows
        .iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .map(|(col, cell)| {
                    let cell = cell.trim();
                    if cell.is_empty() {
                        Scalar::Blank
                    } else if numeric_column[col] {
                        match cell.parse::<f64>() {
                            Ok(n) => Scalar::number(n),
                            Err(_) => Scalar::Blank,
                        }
                    } else {
                        Scalar::text(cell)
                    }
                })
                .collect()
        })
        .collect();

    Ok(Table::new(headers, rows)?)
}

/// Reads delimited text into a [`Table`].
///
/// Rejects empty input and spreadsheet binaries (ZIP containers start with
/// `PK`) regardless of file name; sniffs the delimiter and retries the
/// alternate guess once when the first parse collapses to a single column.
pub fn read_delimited(bytes: &[u8]) -> Result<Table, IngestError> {
    if bytes.is_empty() {
        return Err(IngestError::Empty);
    }
    if bytes.starts_with(b"PK") {
        return Err(IngestError::RenamedSpreadsheet);
    }

    let text = decode_text(bytes);
    let delimiter = sniff_delimiter(&text);
    let mut records = parse_records(&text, delimiter)?;

    if records.first().map_or(0, Vec::len) == 1 {
        let alternate = if delimiter == b';' { b',' } else { b';' };
        records = parse_records(&text, alternate)?;
        if records.first().map_or(0, Vec::len) == 1 {
            return Err(IngestError::UnknownDelimiter);
        }
    }

    build_table(&records)
}
