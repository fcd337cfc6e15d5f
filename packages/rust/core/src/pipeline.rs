//! End-to-end merge pipeline: tabular source → left join onto boundaries → shapefile.

use std::path::PathBuf;
use std::time::Instant;

use serde::Serialize;
use tracing::{info, instrument};

use gridmerge_shared::{PipelineConfig, Result};
use gridmerge_tabular::LoadRequest;

use crate::merge;
use crate::writer;

/// Result of one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    /// Path of the written shapefile.
    pub output_path: PathBuf,
    /// Rows read from the tabular source after projection.
    pub table_rows: usize,
    /// Features written (always equal to the boundary feature count).
    pub features: usize,
    /// Features that found a tabular row.
    pub matched: usize,
    /// Attribute fields in the output.
    pub fields: usize,
    /// Total elapsed wall time in milliseconds.
    pub elapsed_ms: u64,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when the pipeline completes.
    fn done(&self, result: &PipelineResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn done(&self, _result: &PipelineResult) {}
}

/// Run the full merge pipeline.
///
/// 1. Load the tabular source (projection + rename)
/// 2. Read the boundary file and left-join the table onto it
/// 3. Write the joined features to the output shapefile
#[instrument(skip_all, fields(
    tabular = %config.tabular_path.display(),
    boundary = %config.boundary_path.display(),
    key = %config.join_key,
))]
pub fn run_pipeline(
    config: &PipelineConfig,
    progress: &dyn ProgressReporter,
) -> Result<PipelineResult> {
    let start = Instant::now();
    info!("starting merge pipeline");

    // --- Phase 1: Load ---
    progress.phase("Loading tabular data");
    let request = LoadRequest::new(&config.tabular_path, &config.format)?
        .with_sheet(config.sheet.clone())
        .with_header_offset(config.header_offset)
        .with_columns(config.columns.clone())
        .with_rename(config.rename.clone());
    let table = gridmerge_tabular::load_table(&request)?;

    // --- Phase 2: Merge ---
    progress.phase("Merging with boundary file");
    let joined = merge::merge_boundaries(&table, &config.boundary_path, &config.join_key)?;

    // --- Phase 3: Write ---
    progress.phase("Writing merged shapefile");
    let output_path = writer::save_feature_set(&joined.features, &config.output_path)?;

    let result = PipelineResult {
        output_path,
        table_rows: table.len(),
        features: joined.features.len(),
        matched: joined.matched,
        fields: joined.features.fields.len(),
        elapsed_ms: start.elapsed().as_millis() as u64,
    };

    progress.done(&result);

    info!(
        features = result.features,
        matched = result.matched,
        elapsed_ms = result.elapsed_ms,
        "merge pipeline complete"
    );

    Ok(result)
}
