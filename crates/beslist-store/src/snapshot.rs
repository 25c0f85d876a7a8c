//! One fetch cycle's output directory.
//!
//! A cycle writes into `fetch_<ts>.partial/`. Only [`SnapshotWriter::finish`]
//! renames it to `fetch_<ts>/` and swaps the latest pointer, so an abandoned
//! or failed cycle never becomes visible. Dropping an unfinished writer
//! removes the partial directory.

use std::fs;
use std::path::{Path, PathBuf};

use beslist_core::{FetchFiles, FetchSummary, ProductRecord, ProductResult};
use chrono::{DateTime, Utc};

use crate::atomic::write_json_atomic;
use crate::{safe_file_stem, StoreError, LATEST_FILE};

pub const PRODUCT_SEARCH_FILE: &str = "product_search.json";
pub const PRODUCTS_FILE: &str = "products.json";
pub const FINAL_RESULT_FILE: &str = "final_result.json";
pub const SUMMARY_FILE: &str = "summary.json";
pub const DIRECT_MATCH_DIR: &str = "direct_matches";
const PARTIAL_SUFFIX: &str = ".partial";

pub struct SnapshotWriter {
    data_dir: PathBuf,
    name: String,
    partial_dir: PathBuf,
    finished: bool,
}

impl SnapshotWriter {
    /// Reserves a snapshot name for `started_at` and creates its partial
    /// directory. A name already taken within the same second gets a `_<n>`
    /// suffix.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directory cannot be created.
    pub(crate) fn create(data_dir: &Path, started_at: DateTime<Utc>) -> Result<Self, StoreError> {
        fs::create_dir_all(data_dir).map_err(|e| StoreError::io(data_dir, e))?;

        let base = format!("fetch_{}", started_at.format("%Y%m%d_%H%M%S"));
        let mut name = base.clone();
        let mut n = 1u32;
        loop {
            let final_dir = data_dir.join(&name);
            let partial_dir = data_dir.join(format!("{name}{PARTIAL_SUFFIX}"));
            if !final_dir.exists() && !partial_dir.exists() {
                match fs::create_dir(&partial_dir) {
                    Ok(()) => {
                        return Ok(Self {
                            data_dir: data_dir.to_path_buf(),
                            name,
                            partial_dir,
                            finished: false,
                        });
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
                    Err(e) => return Err(StoreError::io(&partial_dir, e)),
                }
            }
            name = format!("{base}_{n}");
            n += 1;
        }
    }

    /// Final directory name, e.g. `fetch_20250101_120000`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path the snapshot will have once finished.
    #[must_use]
    pub fn final_dir(&self) -> PathBuf {
        self.data_dir.join(&self.name)
    }

    /// `/data/...` links to this snapshot's files.
    #[must_use]
    pub fn files(&self) -> FetchFiles {
        FetchFiles {
            product_search: format!("/data/{}/{PRODUCT_SEARCH_FILE}", self.name),
            products: format!("/data/{}/{PRODUCTS_FILE}", self.name),
            final_result: format!("/data/{}/{FINAL_RESULT_FILE}", self.name),
            latest_result: format!("/data/{LATEST_FILE}"),
        }
    }

    /// # Errors
    ///
    /// Returns [`StoreError`] on serialization or filesystem failure.
    pub fn write_product_search(&self, raw_pages: &[serde_json::Value]) -> Result<(), StoreError> {
        write_json_atomic(&self.partial_dir.join(PRODUCT_SEARCH_FILE), raw_pages)
    }

    /// # Errors
    ///
    /// Returns [`StoreError`] on serialization or filesystem failure.
    pub fn write_products(&self, products: &[ProductRecord]) -> Result<(), StoreError> {
        write_json_atomic(&self.partial_dir.join(PRODUCTS_FILE), products)
    }

    /// Stores the raw direct-match response for one pim id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on serialization or filesystem failure.
    pub fn write_direct_match(&self, pim_id: &str, raw: &serde_json::Value) -> Result<(), StoreError> {
        let path = self
            .partial_dir
            .join(DIRECT_MATCH_DIR)
            .join(format!("{}.json", safe_file_stem(pim_id)));
        write_json_atomic(&path, raw)
    }

    /// Writes the final result and summary, publishes the snapshot under its
    /// final name, then replaces `latest_result.json` with the same results.
    ///
    /// On error the partial directory is removed and the previous latest
    /// pointer is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on serialization or filesystem failure.
    pub fn finish(
        mut self,
        results: &[ProductResult],
        summary: &FetchSummary,
    ) -> Result<PathBuf, StoreError> {
        write_json_atomic(&self.partial_dir.join(FINAL_RESULT_FILE), results)?;
        write_json_atomic(&self.partial_dir.join(SUMMARY_FILE), summary)?;

        let final_dir = self.final_dir();
        fs::rename(&self.partial_dir, &final_dir).map_err(|e| StoreError::io(&final_dir, e))?;
        self.finished = true;

        write_json_atomic(&self.data_dir.join(LATEST_FILE), results)?;
        tracing::info!(
            snapshot = %final_dir.display(),
            results = results.len(),
            "snapshot published and latest pointer swapped"
        );
        Ok(final_dir)
    }

    /// Discards the partial directory.
    pub fn abort(mut self) {
        self.remove_partial();
        self.finished = true;
    }

    fn remove_partial(&self) {
        if let Err(e) = fs::remove_dir_all(&self.partial_dir) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(
                    path = %self.partial_dir.display(),
                    error = %e,
                    "failed to remove partial snapshot directory"
                );
            }
        }
    }
}

impl Drop for SnapshotWriter {
    fn drop(&mut self) {
        if !self.finished {
            self.remove_partial();
        }
    }
}
