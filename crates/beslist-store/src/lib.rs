//! Filesystem snapshot store for fetch cycles.
//!
//! Layout under the data directory:
//!
//! ```text
//! latest_result.json
//! direct_match_<pim>.json
//! fetch_<YYYYmmdd_HHMMSS>/{product_search,products,final_result,summary}.json
//! fetch_<YYYYmmdd_HHMMSS>/direct_matches/<pim>.json
//! ```

mod atomic;
mod snapshot;

use std::fs;
use std::path::{Component, Path, PathBuf};

use beslist_core::ProductResult;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use thiserror::Error;

pub use atomic::{write_bytes_atomic, write_json_atomic};
pub use snapshot::{
    SnapshotWriter, DIRECT_MATCH_DIR, FINAL_RESULT_FILE, PRODUCTS_FILE, PRODUCT_SEARCH_FILE,
    SUMMARY_FILE,
};

pub const LATEST_FILE: &str = "latest_result.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Deserialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// A completed snapshot directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotInfo {
    pub name: String,
    pub path: PathBuf,
}

/// Handle on the data directory.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    data_dir: PathBuf,
}

impl SnapshotStore {
    #[must_use]
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    #[must_use]
    pub fn latest_path(&self) -> PathBuf {
        self.data_dir.join(LATEST_FILE)
    }

    /// Starts a new fetch cycle.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the partial directory cannot be created.
    pub fn begin_snapshot(&self, started_at: DateTime<Utc>) -> Result<SnapshotWriter, StoreError> {
        SnapshotWriter::create(&self.data_dir, started_at)
    }

    /// Reads the latest result, or `None` when no cycle has completed yet.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the file exists but cannot be read or parsed.
    pub fn read_latest(&self) -> Result<Option<Vec<ProductResult>>, StoreError> {
        let path = self.latest_path();
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(&path, e)),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| StoreError::Deserialize { path, source: e })
    }

    /// Finds a product by pim id in the latest result.
    ///
    /// # Errors
    ///
    /// Propagates [`Self::read_latest`] errors.
    pub fn find_in_latest(&self, pim_id: &str) -> Result<Option<ProductResult>, StoreError> {
        Ok(self.read_latest()?.and_then(|results| {
            results
                .into_iter()
                .find(|r| r.pim_id.as_deref() == Some(pim_id))
        }))
    }

    /// Persists a live direct-match response made outside a fetch cycle as
    /// `direct_match_<pim>.json`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on serialization or filesystem failure.
    pub fn write_direct_match_lookup(
        &self,
        pim_id: &str,
        raw: &serde_json::Value,
    ) -> Result<PathBuf, StoreError> {
        let path = self
            .data_dir
            .join(format!("direct_match_{}.json", safe_file_stem(pim_id)));
        write_json_atomic(&path, raw)?;
        Ok(path)
    }

    /// Completed snapshots, newest first. Partial directories are excluded.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the data directory cannot be listed.
    /// A missing data directory yields an empty list.
    pub fn list_snapshots(&self) -> Result<Vec<SnapshotInfo>, StoreError> {
        let entries = match fs::read_dir(&self.data_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&self.data_dir, e)),
        };

        let mut snapshots: Vec<SnapshotInfo> = entries
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_ok_and(|t| t.is_dir()))
            .filter_map(|entry| {
                let name = entry.file_name().into_string().ok()?;
                (name.starts_with("fetch_") && !name.ends_with(".partial")).then(|| {
                    SnapshotInfo {
                        path: entry.path(),
                        name,
                    }
                })
            })
            .collect();
        snapshots.sort_by(|a, b| b.name.cmp(&a.name));
        Ok(snapshots)
    }

    /// Resolves a request path against the data directory, rejecting
    /// absolute paths and any `..` component. Returns `None` for paths that
    /// would escape or that do not name an existing file.
    #[must_use]
    pub fn resolve_static(&self, relative: &str) -> Option<PathBuf> {
        let relative = Path::new(relative.trim_start_matches('/'));
        if relative.as_os_str().is_empty() {
            return None;
        }
        if !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return None;
        }
        let path = self.data_dir.join(relative);
        path.is_file().then_some(path)
    }
}

/// Makes an identifier safe to use as a file name. Identifiers that needed
/// rewriting get a short hash of the original appended, so `a/b` and `a_b`
/// never share a file.
pub(crate) fn safe_file_stem(id: &str) -> String {
    let stem: String = id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if stem == id {
        return stem;
    }
    let digest = Sha256::digest(id.as_bytes());
    let hash: String = digest.iter().take(4).map(|b| format!("{b:02x}")).collect();
    format!("{stem}_{hash}")
}
