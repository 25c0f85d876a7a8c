use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::StoreError;

/// Writes `bytes` to `path` through a sibling temp file, fsync, and rename,
/// so readers see either the old file or the complete new one.
///
/// Creates the parent directory if it doesn't exist.
///
/// # Errors
///
/// Returns [`StoreError::Io`] on any filesystem failure; the temp file is
/// removed before returning.
pub fn write_bytes_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
    }

    let temp_path = temp_path_for(path);
    let mut file = fs::File::create(&temp_path).map_err(|e| StoreError::io(&temp_path, e))?;

    let cleanup_and_err = |e| {
        let _ = fs::remove_file(&temp_path);
        StoreError::io(path, e)
    };

    file.write_all(bytes).map_err(cleanup_and_err)?;
    file.sync_all().map_err(cleanup_and_err)?;
    drop(file);

    fs::rename(&temp_path, path).map_err(cleanup_and_err)?;
    Ok(())
}

/// Pretty-prints `value` as JSON and writes it atomically.
///
/// # Errors
///
/// Returns [`StoreError::Serialize`] or [`StoreError::Io`].
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    let json = serde_json::to_vec_pretty(value).map_err(|e| StoreError::Serialize {
        path: path.to_path_buf(),
        source: e,
    })?;
    write_bytes_atomic(path, &json)
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(std::ffi::OsStr::to_os_string)
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
