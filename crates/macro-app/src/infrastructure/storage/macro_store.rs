//! Reading and writing macro files.
//!
//! The on-disk format lives in [`macro_core::format`]; this module only adds
//! file-system access and attaches the path to every error.

use std::path::{Path, PathBuf};

use macro_core::{parse_macro, to_json, EventStream, FormatError};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum MacroFileError {
    #[error("I/O error accessing macro file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file exists but is empty, malformed or out of order.
    #[error("invalid macro file {path}: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: FormatError,
    },
}

/// Loads and validates the macro stored at `path`.
///
/// # Errors
///
/// [`MacroFileError::Io`] if the file cannot be read, and
/// [`MacroFileError::Format`] if it holds no events or fails to decode.
pub fn load_macro_file(path: &Path) -> Result<EventStream, MacroFileError> {
    let text = std::fs::read_to_string(path).map_err(|source| MacroFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let stream = parse_macro(&text).map_err(|source| MacroFileError::Format {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), events = stream.len(), "macro file loaded");
    Ok(stream)
}

/// Writes `stream` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// [`MacroFileError::Io`] on file-system failure.
pub fn save_macro_file(path: &Path, stream: &EventStream) -> Result<(), MacroFileError> {
    let text = to_json(stream).map_err(|source| MacroFileError::Format {
        path: path.to_path_buf(),
        source,
    })?;
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|source| MacroFileError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(path, text).map_err(|source| MacroFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), events = stream.len(), "macro file saved");
    Ok(())
}
