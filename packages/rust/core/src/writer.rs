//! Output writer: filename contract, directory creation, serialization.

use std::path::{Path, PathBuf};

use tracing::{error, info, instrument};

use gridmerge_boundary::FeatureSet;
use gridmerge_shared::{GridMergeError, Result};

/// Required suffix for the destination filename.
pub const SHAPEFILE_EXTENSION: &str = ".shp";

/// Save `features` as a shapefile at `destination`.
///
/// The filename must end in `.shp`; otherwise nothing is written and
/// [`GridMergeError::InvalidOutputPath`] is returned, which callers treat as
/// fatal. Missing parent directories are created. Existing files at the
/// destination are overwritten.
#[instrument(skip(features), fields(features = features.len()))]
pub fn save_feature_set(features: &FeatureSet, destination: &Path) -> Result<PathBuf> {
    if !destination
        .as_os_str()
        .to_string_lossy()
        .ends_with(SHAPEFILE_EXTENSION)
    {
        error!(
            path = %destination.display(),
            "filename for shapefile must end in '.shp', file will not be saved"
        );
        return Err(GridMergeError::InvalidOutputPath(destination.to_path_buf()));
    }

    if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| GridMergeError::io(parent, e))?;
            info!(dir = %parent.display(), "created output directory");
        }
    }

    gridmerge_boundary::write_feature_set(features, destination)?;

    info!(path = %destination.display(), "merged shapefile saved");
    Ok(destination.to_path_buf())
}
