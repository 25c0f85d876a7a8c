//! PDF reports for product analysis and A/B comparison runs.
//!
//! Content is first laid out as a list of [`Block`]s and then rendered onto
//! A4 pages. A missing or unreadable screenshot becomes a placeholder, never
//! an error.

pub mod ab;
pub mod analysis;
pub mod error;
pub mod layout;

use std::path::{Path, PathBuf};

use beslist_core::{AbStatistics, AnalysisRecord, ComparisonRecord};
use chrono::{DateTime, Utc};

pub use ab::{ab_blocks, AB_REPORT_TITLE};
pub use analysis::{analysis_blocks, ANALYSIS_REPORT_TITLE};
pub use error::ReportError;
pub use layout::{fit_within, render, Block, PLACEHOLDER_TEXT};

pub const ANALYSIS_REPORT_NAME: &str = "product_analysis_report";
pub const AB_REPORT_NAME: &str = "ab_test_report";

/// `<name>_<YYYYmmdd_HHMMSS>.pdf`
#[must_use]
pub fn report_file_name(name: &str, at: DateTime<Utc>) -> String {
    format!("{name}_{}.pdf", at.format("%Y%m%d_%H%M%S"))
}

/// Renders the analysis report into `dir` and returns its path.
///
/// # Errors
///
/// Returns [`ReportError`] if rendering or the atomic write fails.
pub fn write_analysis_report(
    dir: &Path,
    records: &[AnalysisRecord],
) -> Result<PathBuf, ReportError> {
    let now = Utc::now();
    let bytes = render(ANALYSIS_REPORT_TITLE, &analysis_blocks(records, now))?;
    write_pdf(dir, ANALYSIS_REPORT_NAME, now, &bytes)
}

/// Renders the A/B comparison report into `dir` and returns its path.
///
/// # Errors
///
/// Returns [`ReportError`] if rendering or the atomic write fails.
pub fn write_ab_report(
    dir: &Path,
    records: &[ComparisonRecord],
    statistics: Option<&AbStatistics>,
) -> Result<PathBuf, ReportError> {
    let now = Utc::now();
    let bytes = render(AB_REPORT_TITLE, &ab_blocks(records, statistics, now))?;
    write_pdf(dir, AB_REPORT_NAME, now, &bytes)
}

fn write_pdf(
    dir: &Path,
    name: &str,
    at: DateTime<Utc>,
    bytes: &[u8],
) -> Result<PathBuf, ReportError> {
    let path = dir.join(report_file_name(name, at));
    beslist_store::write_bytes_atomic(&path, bytes)?;
    tracing::info!(path = %path.display(), bytes = bytes.len(), "report written");
    Ok(path)
}
