//! JSON export of fetched resources

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use fhirpull_domain::Result;
use serde::Serialize;
use tracing::info;

use crate::errors::InfraError;

/// `{stem}_{YYYYmmdd_HHMMSS}.json`
pub fn timestamped_file_name(stem: &str, at: DateTime<Local>) -> String {
    format!("{stem}_{}.json", at.format("%Y%m%d_%H%M%S"))
}

/// Write `value` as pretty-printed JSON to `dir/file_name`, creating `dir`
/// when missing. Returns the written path.
///
/// # Errors
///
/// [`fhirpull_domain::FhirPullError::Io`] when the directory or file cannot
/// be written.
pub fn export_json<T>(dir: &Path, file_name: &str, value: &T) -> Result<PathBuf>
where
    T: Serialize + ?Sized,
{
    std::fs::create_dir_all(dir).map_err(InfraError::from)?;

    let path = dir.join(file_name);
    let body = serde_json::to_vec_pretty(value).map_err(InfraError::from)?;
    std::fs::write(&path, body).map_err(InfraError::from)?;

    info!(path = %path.display(), "exported JSON");
    Ok(path)
}
