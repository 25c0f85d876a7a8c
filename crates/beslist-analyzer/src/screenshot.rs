//! Page capture through a headless browser.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::process::Command;

use crate::config::AnalyzerConfig;
use crate::error::CaptureError;

/// Renders a URL to a PNG file.
#[async_trait]
pub trait Screenshotter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Captures `url` into `dest` and returns the written path.
    async fn capture(&self, url: &str, dest: &Path) -> Result<PathBuf, CaptureError>;
}

/// Drives a Chromium-compatible binary with `--headless --screenshot`.
#[derive(Debug, Clone)]
pub struct ChromiumScreenshotter {
    bin: String,
    width: u32,
    height: u32,
    timeout: Duration,
}

impl ChromiumScreenshotter {
    #[must_use]
    pub fn new(bin: impl Into<String>, width: u32, height: u32, timeout: Duration) -> Self {
        Self {
            bin: bin.into(),
            width,
            height,
            timeout,
        }
    }

    #[must_use]
    pub fn from_config(config: &AnalyzerConfig) -> Self {
        Self::new(
            config.browser_bin.clone(),
            config.window_width,
            config.window_height,
            Duration::from_secs(config.screenshot_timeout_secs),
        )
    }

    fn args(&self, url: &str, dest: &Path) -> Vec<String> {
        vec![
            "--headless".to_owned(),
            "--disable-gpu".to_owned(),
            "--no-sandbox".to_owned(),
            "--hide-scrollbars".to_owned(),
            format!("--window-size={},{}", self.width, self.height),
            format!("--screenshot={}", dest.display()),
            url.to_owned(),
        ]
    }
}

#[async_trait]
impl Screenshotter for ChromiumScreenshotter {
    fn name(&self) -> &'static str {
        "chromium"
    }

    async fn capture(&self, url: &str, dest: &Path) -> Result<PathBuf, CaptureError> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| CaptureError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let child = Command::new(&self.bin)
            .args(self.args(url, dest))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CaptureError::Spawn {
                bin: self.bin.clone(),
                source,
            })?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| CaptureError::Timeout {
                url: url.to_owned(),
                secs: self.timeout.as_secs(),
            })?
            .map_err(|source| CaptureError::Io {
                path: dest.to_path_buf(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CaptureError::Failed {
                url: url.to_owned(),
                status: output.status.to_string(),
                stderr: stderr.lines().last().unwrap_or_default().to_owned(),
            });
        }
        if !dest.is_file() {
            return Err(CaptureError::MissingOutput {
                path: dest.to_path_buf(),
            });
        }

        tracing::debug!(url, path = %dest.display(), "screenshot captured");
        Ok(dest.to_path_buf())
    }
}

/// Screenshot file name for a product page: `<id>_<host>.png` with every
/// character outside `[A-Za-z0-9-]` replaced by `_`.
#[must_use]
pub fn product_screenshot_name(product_id: &str, url: &str) -> String {
    let host = reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_owned))
        .unwrap_or_else(|| "page".to_owned());
    format!("{}_{}.png", sanitize(product_id), sanitize(&host))
}

/// Screenshot file name for one A/B variant, keyed by a short hash of the
/// variant URL so reruns overwrite rather than accumulate.
#[must_use]
pub fn variant_screenshot_name(url_index: usize, variant: &str, url: &str) -> String {
    format!("url_{url_index:03}_variant_{variant}_{}.png", short_hash(url))
}

fn short_hash(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    digest.iter().take(4).map(|b| format!("{b:02x}")).collect()
}

pub(crate) fn sanitize(input: &str) -> String {
    input
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
