//! CSV reading via the `csv` crate, with per-column type inference.

use std::path::Path;

use gridmerge_shared::{GridMergeError, Result, Table, Value};

use crate::header_names;

/// Read a CSV file into a [`Table`], skipping `header_offset` records before the header.
///
/// A column whose non-empty cells all parse as numbers becomes numeric;
/// any other column keeps its cells as text.
pub(crate) fn read_csv(path: &Path, header_offset: usize) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| csv_error(path, e))?;

    let mut records = reader.records().skip(header_offset);

    let header = match records.next() {
        Some(record) => record.map_err(|e| csv_error(path, e))?,
        None => return Ok(Table::default()),
    };
    let columns = header_names(header.iter().map(str::to_string));

    let mut raw: Vec<Vec<String>> = Vec::new();
    for record in records {
        let record = record.map_err(|e| csv_error(path, e))?;
        raw.push(record.iter().map(str::to_string).collect());
    }

    let numeric: Vec<bool> = (0..columns.len())
        .map(|col| {
            raw.iter()
                .filter_map(|row| row.get(col))
                .map(|cell| cell.trim())
                .filter(|cell| !cell.is_empty())
                .all(|cell| cell.parse::<f64>().is_ok())
        })
        .collect();

    let rows = raw
        .into_iter()
        .map(|row| {
            row.into_iter()
                .zip(&numeric)
                .map(|(cell, &is_numeric)| typed_cell(cell, is_numeric))
                .collect()
        })
        .collect();

    Ok(Table::new(columns, rows))
}

fn typed_cell(cell: String, numeric: bool) -> Value {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return Value::Missing;
    }
    if numeric {
        if let Ok(n) = trimmed.parse::<f64>() {
            return Value::Number(n);
        }
    }
    Value::Text(cell)
}

fn csv_error(path: &Path, err: csv::Error) -> GridMergeError {
    if err.is_io_error() {
        match err.into_kind() {
            csv::ErrorKind::Io(source) => GridMergeError::io(path, source),
            other => GridMergeError::parse(format!("{}: {other:?}", path.display())),
        }
    } else {
        GridMergeError::parse(format!("{}: {err}", path.display()))
    }
}
