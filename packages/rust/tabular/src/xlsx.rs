//! Workbook reading via `calamine`.

use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto};
use tracing::debug;

use gridmerge_shared::{GridMergeError, Result, SheetSelector, Table, Value};

use crate::header_names;

/// Read one worksheet into a [`Table`].
///
/// `header_offset` counts absolute sheet rows, so leading blank rows that
/// `calamine` trims from the used range still count toward the offset.
pub(crate) fn read_sheet(path: &Path, sheet: &SheetSelector, header_offset: usize) -> Result<Table> {
    if !path.exists() {
        return Err(GridMergeError::io(
            path,
            std::io::Error::new(std::io::ErrorKind::NotFound, "workbook not found"),
        ));
    }

    let mut workbook = open_workbook_auto(path)
        .map_err(|e| GridMergeError::parse(format!("{}: {e}", path.display())))?;

    let sheet_names = workbook.sheet_names();
    let name = match sheet {
        SheetSelector::Name(name) => name.clone(),
        SheetSelector::Index(i) => sheet_names.get(*i).cloned().ok_or_else(|| {
            GridMergeError::parse(format!(
                "{}: sheet index {i} out of range ({} sheets)",
                path.display(),
                sheet_names.len()
            ))
        })?,
    };

    let range = workbook
        .worksheet_range(&name)
        .map_err(|e| GridMergeError::parse(format!("{}: sheet '{name}': {e}", path.display())))?;

    let first_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);
    debug!(sheet = %name, first_row, header_offset, "reading worksheet");

    let mut rows = range
        .rows()
        .enumerate()
        .filter(|(i, _)| first_row + i >= header_offset)
        .map(|(_, row)| row);

    let Some(header) = rows.next() else {
        return Ok(Table::default());
    };

    let columns = header_names(header.iter().map(header_text));
    let body = rows
        .map(|row| row.iter().map(cell_value).collect())
        .collect();

    Ok(Table::new(columns, body))
}

fn header_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::Float(f) => Value::Number(*f).to_string(),
        other => other.to_string(),
    }
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Int(i) => Value::Number(*i as f64),
        Data::Float(f) => Value::Number(*f),
        Data::String(s) if s.is_empty() => Value::Missing,
        Data::String(s) => Value::Text(s.clone()),
        Data::Bool(b) => Value::Bool(*b),
        Data::Empty | Data::Error(_) => Value::Missing,
        other => Value::Text(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use rust_xlsxwriter::Workbook;

    use super::*;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("gm-xlsx-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    /// Workbook shaped like the eGRID release: a title row above the header.
    fn write_egrid_like(path: &Path) {
        let mut workbook = Workbook::new();

        let notes = workbook.add_worksheet();
        notes.set_name("Notes").unwrap();
        notes.write_string(0, 0, "eGRID2021 notes").unwrap();

        let sheet = workbook.add_worksheet();
        sheet.set_name("SRL21").unwrap();
        sheet.write_string(0, 0, "eGRID2021 subregion file").unwrap();
        for (col, name) in ["SEQSRL21", "SUBRGN", "SRNAME", "SRCO2EQA", "SRC2ERTA"]
            .iter()
            .enumerate()
        {
            sheet.write_string(1, col as u16, *name).unwrap();
        }
        sheet.write_number(2, 0, 1.0).unwrap();
        sheet.write_string(2, 1, "AKGD").unwrap();
        sheet.write_string(2, 2, "ASCC Alaska Grid").unwrap();
        sheet.write_number(2, 3, 2_546_153.25).unwrap();
        sheet.write_number(2, 4, 1_052.5).unwrap();

        sheet.write_number(3, 0, 2.0).unwrap();
        sheet.write_string(3, 1, "AKMS").unwrap();
        sheet.write_string(3, 2, "ASCC Miscellaneous").unwrap();
        sheet.write_number(3, 3, 310_822.0).unwrap();

        workbook.save(path).unwrap();
    }

    #[test]
    fn reads_named_sheet_after_title_row() {
        let tmp = temp_dir();
        let path = tmp.join("egrid.xlsx");
        write_egrid_like(&path);

        let table = read_sheet(&path, &SheetSelector::Name("SRL21".into()), 1).unwrap();

        assert_eq!(
            table.columns,
            vec!["SEQSRL21", "SUBRGN", "SRNAME", "SRCO2EQA", "SRC2ERTA"]
        );
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0][1], Value::Text("AKGD".into()));
        assert_eq!(table.rows[0][3], Value::Number(2_546_153.25));
        assert!(table.rows[1][4].is_missing());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn reads_sheet_by_index() {
        let tmp = temp_dir();
        let path = tmp.join("egrid.xlsx");
        write_egrid_like(&path);

        let table = read_sheet(&path, &SheetSelector::Index(1), 1).unwrap();
        assert!(table.has_column("SUBRGN"));

        let err = read_sheet(&path, &SheetSelector::Index(9), 1).unwrap_err();
        assert!(err.to_string().contains("out of range"));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn zero_offset_uses_title_row_as_header() {
        let tmp = temp_dir();
        let path = tmp.join("egrid.xlsx");
        write_egrid_like(&path);

        let table = read_sheet(&path, &SheetSelector::Name("SRL21".into()), 0).unwrap();
        assert_eq!(table.columns[0], "eGRID2021 subregion file");
        assert_eq!(table.rows[0][1], Value::Text("SUBRGN".into()));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn missing_workbook_is_io_error() {
        let err = read_sheet(Path::new("/nonexistent/egrid.xlsx"), &SheetSelector::default(), 1)
            .unwrap_err();
        assert!(matches!(err, GridMergeError::Io { .. }));
    }
}
