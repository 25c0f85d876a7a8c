use std::path::PathBuf;

use thiserror::Error;

/// Failure to capture a page screenshot.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to launch browser {bin}: {source}")]
    Spawn {
        bin: String,
        #[source]
        source: std::io::Error,
    },

    #[error("screenshot of {url} timed out after {secs}s")]
    Timeout { url: String, secs: u64 },

    #[error("browser exited with {status} for {url}: {stderr}")]
    Failed {
        url: String,
        status: String,
        stderr: String,
    },

    #[error("browser reported success but no screenshot at {}", path.display())]
    MissingOutput { path: PathBuf },

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure talking to the vision model.
#[derive(Debug, Error)]
pub enum VisionError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("vision model rate limited")]
    RateLimited,

    #[error("vision model returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed model output: {0}")]
    MalformedOutput(String),

    #[error("failed to read image {}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl VisionError {
    pub(crate) fn is_retriable(&self) -> bool {
        match self {
            Self::RateLimited | Self::Http(_) => true,
            Self::Status { status, .. } => *status >= 500,
            Self::MalformedOutput(_) | Self::Image { .. } => false,
        }
    }
}

/// Run-level failures. Per-page capture and model failures are recorded on
/// the page's record instead.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("vision model error: {0}")]
    Vision(#[from] VisionError),

    #[error("storage error: {0}")]
    Store(#[from] beslist_store::StoreError),

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid input file {}: {source}", path.display())]
    Input {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("A/B comparison needs a vision model; set OPENAI_API_KEY")]
    VisionUnavailable,
}
