//! Shared types, error model, and configuration for GridMerge.
//!
//! This crate is the foundation depended on by all other GridMerge crates.
//! It provides:
//! - [`GridMergeError`], the unified error type
//! - Domain types ([`Value`], [`Table`], [`DataFormat`], [`SheetSelector`], [`ColumnSelection`])
//! - Configuration ([`AppConfig`], [`PipelineConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BoundaryConfig, OutputConfig, PipelineConfig, TabularConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from,
};
pub use error::{GridMergeError, Result};
pub use types::{ALL_COLUMNS, ColumnSelection, DataFormat, SheetSelector, Table, Value};
