//! Application configuration for GridMerge.
//!
//! User config lives at `~/.gridmerge/gridmerge.toml`. Every field has a
//! default matching the eGRID 2021 subregion dataset, so a missing file is
//! a valid configuration. Relative paths are resolved against the root
//! directory passed to [`PipelineConfig::resolve`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{GridMergeError, Result};
use crate::types::{ColumnSelection, SheetSelector};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "gridmerge.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".gridmerge";

// ---------------------------------------------------------------------------
// Config structs (matching gridmerge.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Tabular source settings.
    #[serde(default)]
    pub tabular: TabularConfig,

    /// Boundary file and join key.
    #[serde(default)]
    pub boundary: BoundaryConfig,

    /// Output destination.
    #[serde(default)]
    pub output: OutputConfig,
}

/// `[tabular]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TabularConfig {
    /// Path to the spreadsheet or CSV.
    #[serde(default = "default_tabular_path")]
    pub path: String,

    /// Format indicator: "xlsx" or "csv".
    #[serde(default = "default_format")]
    pub format: String,

    /// Worksheet name or zero-based index (xlsx only).
    #[serde(default = "default_sheet")]
    pub sheet: SheetSelector,

    /// Rows skipped before the header row. Defaults by format when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_offset: Option<usize>,

    /// Columns to keep, or "all".
    #[serde(default = "default_columns")]
    pub columns: ColumnSelection,

    /// `[old, new]` column rename applied after filtering.
    #[serde(default = "default_rename", skip_serializing_if = "Option::is_none")]
    pub rename: Option<Vec<String>>,
}

impl Default for TabularConfig {
    fn default() -> Self {
        Self {
            path: default_tabular_path(),
            format: default_format(),
            sheet: default_sheet(),
            header_offset: None,
            columns: default_columns(),
            rename: default_rename(),
        }
    }
}

fn default_tabular_path() -> String {
    "data/eGRID2021_data.xlsx".into()
}
fn default_format() -> String {
    "xlsx".into()
}
fn default_sheet() -> SheetSelector {
    SheetSelector::Name("SRL21".into())
}
fn default_columns() -> ColumnSelection {
    ColumnSelection::Only(vec![
        "SUBRGN".into(),
        "SRCO2EQA".into(),
        "SRC2ERTA".into(),
    ])
}
fn default_rename() -> Option<Vec<String>> {
    Some(vec!["SUBRGN".into(), "ZipSubregi".into()])
}

/// `[boundary]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundaryConfig {
    /// Path to the subregion shapefile.
    #[serde(default = "default_boundary_path")]
    pub path: String,

    /// Column present in both the shapefile and the (renamed) table.
    #[serde(default = "default_join_key")]
    pub join_key: String,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            path: default_boundary_path(),
            join_key: default_join_key(),
        }
    }
}

fn default_boundary_path() -> String {
    "shapefile/eGRID_Subregions.shp".into()
}
fn default_join_key() -> String {
    "ZipSubregi".into()
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Destination shapefile; must end in `.shp`.
    #[serde(default = "default_output_path")]
    pub path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
        }
    }
}

fn default_output_path() -> String {
    "merged_shapefile/egrid2020_subregions_merged.shp".into()
}

// ---------------------------------------------------------------------------
// Pipeline config (runtime, paths resolved against the root)
// ---------------------------------------------------------------------------

/// Runtime pipeline configuration with absolute paths.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub tabular_path: PathBuf,
    pub format: String,
    pub sheet: SheetSelector,
    pub header_offset: Option<usize>,
    pub columns: ColumnSelection,
    pub rename: Option<Vec<String>>,
    pub boundary_path: PathBuf,
    pub join_key: String,
    pub output_path: PathBuf,
}

impl PipelineConfig {
    /// Resolve every relative path in `config` against `root`.
    pub fn resolve(config: &AppConfig, root: &Path) -> Self {
        Self {
            tabular_path: resolve_path(root, &config.tabular.path),
            format: config.tabular.format.clone(),
            sheet: config.tabular.sheet.clone(),
            header_offset: config.tabular.header_offset,
            columns: config.tabular.columns.clone(),
            rename: config.tabular.rename.clone(),
            boundary_path: resolve_path(root, &config.boundary.path),
            join_key: config.boundary.join_key.clone(),
            output_path: resolve_path(root, &config.output.path),
        }
    }
}

fn resolve_path(root: &Path, path: &str) -> PathBuf {
    let p = Path::new(path);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        root.join(p)
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.gridmerge/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| GridMergeError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.gridmerge/gridmerge.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| GridMergeError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| GridMergeError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| GridMergeError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| GridMergeError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| GridMergeError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("SRL21"));
        assert!(toml_str.contains("ZipSubregi"));
        assert!(toml_str.contains("egrid2020_subregions_merged.shp"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.tabular.sheet, SheetSelector::Name("SRL21".into()));
        assert_eq!(parsed.tabular.columns, default_columns());
        assert_eq!(parsed.tabular.rename, default_rename());
        assert_eq!(parsed.boundary.join_key, "ZipSubregi");
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let toml_str = r#"
[tabular]
path = "data/subregions.csv"
format = "csv"
columns = "all"

[output]
path = "/tmp/out/merged.shp"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.tabular.format, "csv");
        assert_eq!(config.tabular.columns, ColumnSelection::All);
        assert_eq!(config.boundary.path, "shapefile/eGRID_Subregions.shp");
        assert_eq!(config.output.path, "/tmp/out/merged.shp");
    }

    #[test]
    fn pipeline_config_resolves_relative_paths() {
        let mut app = AppConfig::default();
        app.output.path = "/abs/merged.shp".into();

        let resolved = PipelineConfig::resolve(&app, Path::new("/repo"));
        assert_eq!(resolved.tabular_path, PathBuf::from("/repo/data/eGRID2021_data.xlsx"));
        assert_eq!(resolved.boundary_path, PathBuf::from("/repo/shapefile/eGRID_Subregions.shp"));
        assert_eq!(resolved.output_path, PathBuf::from("/abs/merged.shp"));
        assert_eq!(resolved.join_key, "ZipSubregi");
    }

    #[test]
    fn load_config_from_reports_bad_toml() {
        let dir = std::env::temp_dir().join("gm-config-test-bad-toml");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("gridmerge.toml");
        std::fs::write(&path, "[tabular\npath = 1").unwrap();

        let err = load_config_from(&path).unwrap_err();
        assert!(err.to_string().contains("failed to parse"));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
