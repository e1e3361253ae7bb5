use medley_engine::pivot::Pivot;

/// Serializes a pivot to CSV text.
///
/// Hierarchical column labels flatten with the same `" | "` separator the
/// payload serializer uses, row keys become leading columns, and numbers
/// print with Rust's shortest round-trip formatting so no precision is lost.
pub fn write_pivot_csv(pivot: &Pivot) -> Result<String, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header: Vec<String> = pivot.row_levels.clone();
    header.extend(pivot.flattened_columns());
    writer.write_record(&header)?;

    for row in &pivot.rows {
        let mut record = row.key.display_strings();
        record.extend(row.cells.iter().map(|c| c.display_string()));
        writer.write_record(&record)?;
    }

    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    // The writer only ever received UTF-8 strings.
    Ok(String::from_utf8(bytes).expect("csv writer output is UTF-8"))
}
