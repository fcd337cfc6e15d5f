//! Core domain types for GridMerge tables.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GridMergeError;

/// Sentinel accepted in place of a column list to keep every column.
pub const ALL_COLUMNS: &str = "all";

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// A single cell value in a table or attribute record.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    Number(f64),
    Text(String),
    Bool(bool),
    /// Empty cell, or no match on the right side of a join.
    #[default]
    Missing,
}

impl Value {
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    /// Canonical text used to compare join keys across sources.
    ///
    /// Whole numbers compare as integer literals so that `7.0` read from a
    /// spreadsheet matches `7` read from an attribute table. Missing values
    /// never produce a key.
    pub fn join_key(&self) -> Option<String> {
        match self {
            Self::Missing => None,
            Self::Text(s) => Some(s.clone()),
            Self::Bool(b) => Some(b.to_string()),
            Self::Number(n) => Some(format_number(*n)),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => f.write_str(&format_number(*n)),
            Self::Text(s) => f.write_str(s),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Missing => Ok(()),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// An in-memory tabular record set: ordered columns and rows aligned with them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    /// Column names in source order.
    pub columns: Vec<String>,
    /// Rows, each exactly `columns.len()` values long.
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    /// Build a table, padding or truncating rows to the column count.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Value::Missing);
                row
            })
            .collect();
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Keep only the requested columns that exist, in source-column order.
    pub fn select_columns(self, wanted: &[String]) -> Table {
        let keep: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| wanted.contains(c))
            .map(|(i, _)| i)
            .collect();

        let columns = keep.iter().map(|&i| self.columns[i].clone()).collect();
        let rows = self
            .rows
            .into_iter()
            .map(|row| keep.iter().map(|&i| row[i].clone()).collect())
            .collect();

        Table { columns, rows }
    }

    /// Rename the first column called `old`. Returns `false` if there is none.
    pub fn rename_column(&mut self, old: &str, new: &str) -> bool {
        match self.column_index(old) {
            Some(idx) => {
                self.columns[idx] = new.to_string();
                true
            }
            None => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Load parameters
// ---------------------------------------------------------------------------

/// Tabular source format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    /// Excel workbook.
    Xlsx,
    /// Comma-delimited text with a header record.
    Csv,
}

impl DataFormat {
    /// Rows skipped before the header row when no offset is configured.
    pub fn default_header_offset(self) -> usize {
        match self {
            Self::Xlsx => 1,
            Self::Csv => 0,
        }
    }
}

impl FromStr for DataFormat {
    type Err = GridMergeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "xlsx" => Ok(Self::Xlsx),
            "csv" => Ok(Self::Csv),
            _ => Err(GridMergeError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Xlsx => f.write_str("xlsx"),
            Self::Csv => f.write_str("csv"),
        }
    }
}

/// Which worksheet to read from a workbook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SheetSelector {
    /// Zero-based sheet position.
    Index(usize),
    /// Sheet name.
    Name(String),
}

impl Default for SheetSelector {
    fn default() -> Self {
        Self::Index(0)
    }
}

impl fmt::Display for SheetSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "#{i}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

/// Column projection: either every column or an explicit subset.
///
/// In TOML this is either the string `"all"` or a list of names.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "RawSelection", into = "RawSelection")]
pub enum ColumnSelection {
    #[default]
    All,
    Only(Vec<String>),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawSelection {
    Keyword(String),
    List(Vec<String>),
}

impl TryFrom<RawSelection> for ColumnSelection {
    type Error = String;

    fn try_from(raw: RawSelection) -> std::result::Result<Self, Self::Error> {
        match raw {
            RawSelection::Keyword(k) if k == ALL_COLUMNS => Ok(Self::All),
            RawSelection::Keyword(k) => Err(format!(
                "columns must be \"{ALL_COLUMNS}\" or a list of names, got \"{k}\""
            )),
            RawSelection::List(names) => Ok(Self::Only(names)),
        }
    }
}

impl From<ColumnSelection> for RawSelection {
    fn from(sel: ColumnSelection) -> Self {
        match sel {
            ColumnSelection::All => Self::Keyword(ALL_COLUMNS.to_string()),
            ColumnSelection::Only(names) => Self::List(names),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::new(
            vec!["SUBRGN".into(), "SRNAME".into(), "SRCO2EQA".into()],
            vec![
                vec![
                    Value::Text("AKGD".into()),
                    Value::Text("ASCC Alaska Grid".into()),
                    Value::Number(3_245_117.5),
                ],
                vec![Value::Text("CAMX".into()), Value::Text("WECC California".into())],
            ],
        )
    }

    #[test]
    fn new_pads_short_rows() {
        let table = sample();
        assert_eq!(table.rows[1].len(), 3);
        assert!(table.rows[1][2].is_missing());
    }

    #[test]
    fn select_keeps_source_order() {
        let table = sample().select_columns(&["SRCO2EQA".into(), "SUBRGN".into(), "NOPE".into()]);
        assert_eq!(table.columns, vec!["SUBRGN", "SRCO2EQA"]);
        assert_eq!(table.rows[0][1], Value::Number(3_245_117.5));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn rename_only_touches_one_column() {
        let mut table = sample();
        let before = table.rows.clone();
        assert!(table.rename_column("SUBRGN", "ZipSubregi"));
        assert_eq!(table.columns, vec!["ZipSubregi", "SRNAME", "SRCO2EQA"]);
        assert_eq!(table.rows, before);

        assert!(!table.rename_column("SUBRGN", "Other"));
    }

    #[test]
    fn join_keys_normalize_whole_numbers() {
        assert_eq!(Value::Number(7.0).join_key().as_deref(), Some("7"));
        assert_eq!(Value::Number(7.25).join_key().as_deref(), Some("7.25"));
        assert_eq!(Value::Text("AKGD".into()).join_key().as_deref(), Some("AKGD"));
        assert_eq!(Value::Missing.join_key(), None);
    }

    #[test]
    fn data_format_parsing() {
        assert_eq!("xlsx".parse::<DataFormat>().unwrap(), DataFormat::Xlsx);
        assert_eq!("CSV".parse::<DataFormat>().unwrap(), DataFormat::Csv);
        let err = "json".parse::<DataFormat>().unwrap_err();
        assert!(matches!(err, GridMergeError::UnsupportedFormat(f) if f == "json"));
    }

    #[test]
    fn column_selection_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            columns: ColumnSelection,
            sheet: SheetSelector,
        }

        let all: Wrapper = toml::from_str("columns = \"all\"\nsheet = 2").expect("parse");
        assert_eq!(all.columns, ColumnSelection::All);
        assert_eq!(all.sheet, SheetSelector::Index(2));

        let only: Wrapper =
            toml::from_str("columns = [\"SUBRGN\"]\nsheet = \"SRL21\"").expect("parse");
        assert_eq!(only.columns, ColumnSelection::Only(vec!["SUBRGN".into()]));
        assert_eq!(only.sheet, SheetSelector::Name("SRL21".into()));

        assert!(toml::from_str::<Wrapper>("columns = \"some\"\nsheet = 0").is_err());
    }
}
