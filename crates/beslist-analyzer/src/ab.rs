//! A/B ranking comparison runs.
//!
//! Each listing URL is rendered twice, once per ranking variant selected
//! through a query parameter, and the screenshot pair is judged by the
//! vision model.

use std::path::{Path, PathBuf};

use beslist_core::{AbStatistics, ComparisonRecord, VariantCapture};
use beslist_store::write_json_atomic;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::analysis::{create_dir, Analyzer, RunOptions, RESULTS_DIR, SCREENSHOTS_DIR};
use crate::error::AnalyzerError;
use crate::inspect::{extract_h1, listing_titles};
use crate::read_json;
use crate::screenshot::variant_screenshot_name;
use crate::vision::{compare_variants, ComparisonContext, VisionModel};

pub const ALL_RESULTS_FILE: &str = "all_results.json";
pub const STATISTICS_FILE: &str = "statistics.json";

/// Results are flushed to disk after every this many URLs.
pub const SAVE_EVERY: usize = 5;

/// One input row: a listing URL and its page visits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbInput {
    pub url: String,
    #[serde(default)]
    pub visits: u64,
}

/// The query parameter and the two values that select each ranking.
#[derive(Debug, Clone)]
pub struct VariantParams {
    pub param: String,
    pub variant_a: String,
    pub variant_b: String,
}

/// Records and statistics of a finished run.
#[derive(Debug, Clone)]
pub struct AbRun {
    pub records: Vec<ComparisonRecord>,
    pub statistics: Option<AbStatistics>,
    pub results_path: PathBuf,
}

/// Reads the JSON input list.
///
/// # Errors
///
/// Returns [`AnalyzerError::Io`] or [`AnalyzerError::Input`].
pub fn load_ab_input(path: &Path) -> Result<Vec<AbInput>, AnalyzerError> {
    read_json(path)
}

/// `url` with `param` set to `value`, replacing any existing occurrence.
///
/// # Errors
///
/// Returns [`AnalyzerError::InvalidUrl`] if `url` does not parse.
pub fn variant_url(url: &str, param: &str, value: &str) -> Result<String, AnalyzerError> {
    let mut parsed = reqwest::Url::parse(url).map_err(|e| AnalyzerError::InvalidUrl {
        url: url.to_owned(),
        reason: e.to_string(),
    })?;
    let kept: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| k != param)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    parsed
        .query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair(param, value);
    Ok(parsed.into())
}

impl Analyzer {
    /// Compares both ranking variants for each selected input URL.
    ///
    /// A URL whose variant cannot be captured is skipped; a failed model
    /// comparison is kept with `verdict = None`. Resuming with
    /// `start_from > 1` keeps earlier records from an existing
    /// `all_results.json` in the same output directory.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzerError::VisionUnavailable`] without a vision model,
    /// or [`AnalyzerError`] when output files cannot be written.
    pub async fn run_ab_test(
        &self,
        inputs: &[AbInput],
        params: &VariantParams,
        options: &RunOptions,
    ) -> Result<AbRun, AnalyzerError> {
        let model = self
            .vision
            .as_deref()
            .ok_or(AnalyzerError::VisionUnavailable)?;

        let screenshots_dir = options.output_dir.join(SCREENSHOTS_DIR);
        let results_dir = options.output_dir.join(RESULTS_DIR);
        create_dir(&screenshots_dir)?;
        create_dir(&results_dir)?;
        let results_path = results_dir.join(ALL_RESULTS_FILE);

        let mut records = previous_records(&results_path, options.start_from)?;
        let (screenshotter, vision) = self.collaborators();
        tracing::info!(
            inputs = inputs.len(),
            resumed = records.len(),
            screenshotter,
            vision,
            start_from = options.start_from,
            "A/B comparison started"
        );

        let mut processed = 0usize;
        for (i, input) in inputs
            .iter()
            .enumerate()
            .skip(options.offset())
            .take(options.max_items())
        {
            let url_index = i + 1;
            match self
                .compare_url(model, url_index, input, params, &screenshots_dir)
                .await
            {
                Some(record) => records.push(record),
                None => continue,
            }

            processed += 1;
            if processed % SAVE_EVERY == 0 {
                write_json_atomic(&results_path, &records)?;
                tracing::info!(processed, "intermediate results saved");
            }
        }

        write_json_atomic(&results_path, &records)?;
        let statistics = AbStatistics::from_records(&records);
        if let Some(stats) = &statistics {
            write_json_atomic(&results_dir.join(STATISTICS_FILE), stats)?;
            tracing::info!(
                total = stats.total_urls,
                a_wins = stats.variant_a_wins,
                b_wins = stats.variant_b_wins,
                ties = stats.ties,
                unknown = stats.unknown,
                overall = %stats.overall_winner,
                "A/B comparison completed"
            );
        } else {
            tracing::warn!("A/B comparison produced no results");
        }

        Ok(AbRun {
            records,
            statistics,
            results_path,
        })
    }

    async fn compare_url(
        &self,
        model: &dyn VisionModel,
        url_index: usize,
        input: &AbInput,
        params: &VariantParams,
        screenshots_dir: &Path,
    ) -> Option<ComparisonRecord> {
        let url = input.url.as_str();
        let mut captures = Vec::with_capacity(2);
        for (label, value) in [("A", &params.variant_a), ("B", &params.variant_b)] {
            match self
                .capture_variant(url_index, label, url, &params.param, value, screenshots_dir)
                .await
            {
                Ok(capture) => captures.push(capture),
                Err(e) => {
                    tracing::warn!(url_index, url, variant = label, error = %e, "variant capture failed; skipping URL");
                    return None;
                }
            }
        }
        let variant_b = captures.pop()?;
        let variant_a = captures.pop()?;

        let verdict = match (&variant_a.screenshot, &variant_b.screenshot) {
            (Some(a), Some(b)) => {
                let context = ComparisonContext {
                    url,
                    h1_title: variant_a.h1_title.as_deref().or(variant_b.h1_title.as_deref()),
                    titles_a: &variant_a.product_titles,
                    titles_b: &variant_b.product_titles,
                };
                match compare_variants(model, a, b, &context).await {
                    Ok(verdict) => Some(verdict),
                    Err(e) => {
                        tracing::warn!(url_index, url, error = %e, "comparison failed; recording no verdict");
                        None
                    }
                }
            }
            _ => None,
        };

        tracing::info!(
            url_index,
            url,
            winner = verdict.as_ref().map(|v| v.winner.to_string()).as_deref().unwrap_or("unknown"),
            "URL compared"
        );

        Some(ComparisonRecord {
            url_index,
            original_url: input.url.clone(),
            visits: input.visits,
            variant_a,
            variant_b,
            verdict,
            analyzed_at: Utc::now(),
        })
    }

    async fn capture_variant(
        &self,
        url_index: usize,
        label: &str,
        url: &str,
        param: &str,
        value: &str,
        screenshots_dir: &Path,
    ) -> Result<VariantCapture, AnalyzerError> {
        let variant = variant_url(url, param, value)?;
        let dest = screenshots_dir.join(variant_screenshot_name(url_index, label, &variant));
        let screenshot = self.screenshotter.capture(&variant, &dest).await?;

        let (h1_title, product_titles) = match self.inspector.fetch_html(&variant).await {
            Ok(html) => (extract_h1(&html), listing_titles(&html)),
            Err(e) => {
                tracing::warn!(url = %variant, error = %e, "listing HTML unavailable; titles omitted");
                (None, Vec::new())
            }
        };

        Ok(VariantCapture {
            url: variant,
            screenshot: Some(screenshot),
            h1_title,
            product_titles,
        })
    }
}

/// Records before `start_from` from an earlier run, so a resumed run does not
/// drop them when it rewrites `all_results.json`.
fn previous_records(
    results_path: &Path,
    start_from: usize,
) -> Result<Vec<ComparisonRecord>, AnalyzerError> {
    if start_from <= 1 || !results_path.is_file() {
        return Ok(Vec::new());
    }
    let mut records: Vec<ComparisonRecord> = read_json(results_path)?;
    records.retain(|r| r.url_index < start_from);
    Ok(records)
}
