//! Error types for GridMerge.
//!
//! Library crates use [`GridMergeError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all GridMerge operations.
#[derive(Debug, thiserror::Error)]
pub enum GridMergeError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// The tabular format indicator is neither `xlsx` nor `csv`.
    #[error("unsupported tabular format '{0}': expected xlsx or csv")]
    UnsupportedFormat(String),

    /// Spreadsheet, CSV, or attribute table decoding error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Existence checks that fail (e.g. join key absent from an input).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Output path does not name a `.shp` file. Fatal for the pipeline.
    #[error("filename for shapefile must end in '.shp': {0:?}")]
    InvalidOutputPath(PathBuf),

    /// Error raised by the shapefile/dBASE layer.
    #[error("shapefile error: {0}")]
    Shapefile(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, GridMergeError>;

impl GridMergeError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error must terminate the whole process.
    pub fn is_fatal_output_error(&self) -> bool {
        matches!(self, Self::InvalidOutputPath(_))
    }
}
