//! Page analysis for Beslist product and listing pages.
//!
//! Screenshots come from a headless browser, structural facts from the page
//! HTML, and visual features and A/B verdicts from a vision model. Each
//! collaborator sits behind a trait so runs can be tested without a browser
//! or a model account.

pub mod ab;
pub mod analysis;
mod config;
pub mod error;
pub mod inspect;
pub mod screenshot;
pub mod size;
pub mod vision;

use std::path::Path;

use serde::de::DeserializeOwned;

pub use ab::{load_ab_input, variant_url, AbInput, AbRun, VariantParams};
pub use analysis::{Analyzer, RunOptions};
pub use config::AnalyzerConfig;
pub use error::{AnalyzerError, CaptureError, VisionError};
pub use inspect::{inspect_html, PageInspector};
pub use screenshot::{ChromiumScreenshotter, Screenshotter};
pub use vision::{OpenAiVision, VisionModel};

/// Reads a JSON file written by an earlier run.
///
/// # Errors
///
/// Returns [`AnalyzerError::Io`] if the file cannot be read, or
/// [`AnalyzerError::Input`] if it does not parse as `T`.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, AnalyzerError> {
    let bytes = std::fs::read(path).map_err(|source| AnalyzerError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| AnalyzerError::Input {
        path: path.to_path_buf(),
        source,
    })
}
