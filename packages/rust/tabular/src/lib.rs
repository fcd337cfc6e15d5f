//! Tabular loader: spreadsheet and CSV reading with column projection and rename.
//!
//! The loader turns a source file into a [`Table`] in three passes:
//! 1. Read the sheet (via `calamine`) or delimited file (via `csv`)
//! 2. Project onto the requested columns, if any
//! 3. Rename one column so it matches the downstream join key
//!
//! Malformed rename requests are reported and skipped; only an unsupported
//! format or an unreadable file aborts the load.

mod delimited;
mod xlsx;

use std::path::PathBuf;

use tracing::{debug, error, info, instrument};

use gridmerge_shared::{ColumnSelection, DataFormat, Result, SheetSelector, Table};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Everything needed to load one tabular source.
#[derive(Debug, Clone)]
pub struct LoadRequest {
    /// Source file path.
    pub path: PathBuf,
    /// Source format.
    pub format: DataFormat,
    /// Worksheet to read (ignored for CSV).
    pub sheet: SheetSelector,
    /// Rows to skip before the header row. `None` uses the format default.
    pub header_offset: Option<usize>,
    /// Column projection.
    pub columns: ColumnSelection,
    /// Optional `[old, new]` rename pair.
    pub rename: Option<Vec<String>>,
}

impl LoadRequest {
    /// Start a request from a path and a format indicator string.
    ///
    /// An unrecognized format is reported and returned as
    /// [`GridMergeError::UnsupportedFormat`](gridmerge_shared::GridMergeError::UnsupportedFormat).
    pub fn new(path: impl Into<PathBuf>, format: &str) -> Result<Self> {
        let format = format.parse::<DataFormat>().inspect_err(|_| {
            error!(format, "file type must be xlsx or csv, returning without reading");
        })?;

        Ok(Self {
            path: path.into(),
            format,
            sheet: SheetSelector::default(),
            header_offset: None,
            columns: ColumnSelection::All,
            rename: None,
        })
    }

    pub fn with_sheet(mut self, sheet: SheetSelector) -> Self {
        self.sheet = sheet;
        self
    }

    pub fn with_header_offset(mut self, offset: Option<usize>) -> Self {
        self.header_offset = offset;
        self
    }

    pub fn with_columns(mut self, columns: ColumnSelection) -> Self {
        self.columns = columns;
        self
    }

    pub fn with_rename(mut self, rename: Option<Vec<String>>) -> Self {
        self.rename = rename;
        self
    }

    fn effective_header_offset(&self) -> usize {
        self.header_offset
            .unwrap_or_else(|| self.format.default_header_offset())
    }
}

// ---------------------------------------------------------------------------
// Loader
// ---------------------------------------------------------------------------

/// Load a table according to `request`.
#[instrument(skip_all, fields(path = %request.path.display(), format = %request.format))]
pub fn load_table(request: &LoadRequest) -> Result<Table> {
    let offset = request.effective_header_offset();

    let table = match request.format {
        DataFormat::Xlsx => xlsx::read_sheet(&request.path, &request.sheet, offset)?,
        DataFormat::Csv => delimited::read_csv(&request.path, offset)?,
    };

    debug!(
        columns = table.columns.len(),
        rows = table.len(),
        "source read"
    );

    let mut table = match &request.columns {
        ColumnSelection::All => table,
        ColumnSelection::Only(wanted) => project(table, wanted),
    };

    if let Some(rename) = &request.rename {
        apply_rename(&mut table, rename);
    }

    info!(
        columns = table.columns.len(),
        rows = table.len(),
        "tabular source loaded"
    );

    Ok(table)
}

/// Keep the requested columns that exist in the source, in source order.
pub fn project(table: Table, wanted: &[String]) -> Table {
    for name in wanted.iter().filter(|w| !table.has_column(w)) {
        debug!(column = %name, "requested column not present in source");
    }
    table.select_columns(wanted)
}

/// Apply an `[old, new]` rename pair in place.
///
/// Returns `true` if a column was renamed. A pair of the wrong length or an
/// unknown source column is reported and leaves the table untouched.
pub fn apply_rename(table: &mut Table, rename: &[String]) -> bool {
    let [old, new] = rename else {
        error!(
            len = rename.len(),
            "column rename must be a list with two elements, no renaming performed"
        );
        return false;
    };

    if !table.rename_column(old, new) {
        error!(
            column = %old,
            "first element of column rename must be one of the data columns, no renaming performed"
        );
        return false;
    }

    debug!(from = %old, to = %new, "column renamed");
    true
}

/// Turn raw header cells into unique column names.
///
/// Blank headers become `Unnamed: <i>`; repeated names get `.1`, `.2`, ...
pub(crate) fn header_names<I>(cells: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut names: Vec<String> = Vec::new();
    for (i, cell) in cells.into_iter().enumerate() {
        let base = match cell.trim() {
            "" => format!("Unnamed: {i}"),
            trimmed => trimmed.to_string(),
        };

        let mut name = base.clone();
        let mut n = 1;
        while names.contains(&name) {
            name = format!("{base}.{n}");
            n += 1;
        }
        names.push(name);
    }
    names
}
