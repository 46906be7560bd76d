//! Whole-document JSON persistence.
//!
//! Documents are serialized in full, written to a sibling temporary file and
//! renamed over the destination. A run that fails before this point leaves the
//! previous document untouched.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("IO error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Output directory is not a directory: {0:?}")]
    NotADirectory(PathBuf),
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> OutputError + '_ {
    move |source| OutputError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Fail early when the output location can never be written.
pub fn check_output_dir(path: &Path) -> Result<(), OutputError> {
    match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(dir) if dir.exists() && !dir.is_dir() => {
            Err(OutputError::NotADirectory(dir.to_path_buf()))
        }
        _ => Ok(()),
    }
}

/// Serialize `document` and atomically replace `path` with it.
///
/// Returns the number of bytes written.
pub fn write_json_atomic<T: Serialize>(document: &T, path: &Path) -> Result<usize, OutputError> {
    let json = serde_json::to_vec(document)?;

    if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(io_error(dir))?;
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    std::fs::write(&tmp_path, &json).map_err(io_error(&tmp_path))?;
    debug!("Wrote {} bytes to {:?}", json.len(), tmp_path);

    if let Err(e) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(io_error(path)(e));
    }

    info!(
        "Wrote {:?} ({:.1} KB)",
        path,
        json.len() as f64 / 1024.0
    );
    Ok(json.len())
}

/// Read a previously written document.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, OutputError> {
    let contents = std::fs::read(path).map_err(io_error(path))?;
    Ok(serde_json::from_slice(&contents)?)
}
