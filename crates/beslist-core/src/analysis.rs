//! Records produced by the page-analysis and A/B comparison runs.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Feature fields a vision model extracted from a product-page screenshot.
///
/// Every field is optional: the model may not be able to tell, and a missing
/// answer is an ordinary outcome rather than a failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageFeatures {
    #[serde(default)]
    pub on_sale: Option<bool>,
    #[serde(default)]
    pub has_reviews: Option<bool>,
    #[serde(default)]
    pub shipping_info: Option<String>,
    #[serde(default)]
    pub free_shipping: Option<bool>,
    #[serde(default)]
    pub delivery_time: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Facts read directly from a product page's HTML.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInspection {
    /// Text of the first `<h1>`.
    pub title: Option<String>,
    pub thumbnail_count: usize,
    pub has_multiple_images: bool,
    pub has_reviews: bool,
    /// Number of size badges listed per shop offer.
    pub shop_size_counts: BTreeMap<String, usize>,
    pub has_shop_with_many_sizes: bool,
    pub has_size_in_title: bool,
}

/// Analysis of one product page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub product_id: String,
    pub url: String,
    #[serde(default)]
    pub screenshot_path: Option<PathBuf>,
    #[serde(default)]
    pub inspection: Option<PageInspection>,
    #[serde(default)]
    pub features: Option<PageFeatures>,
    /// First failure hit while analysing this page, if any. The record is
    /// still kept so reports can show a placeholder.
    #[serde(default)]
    pub error: Option<String>,
    pub captured_at: DateTime<Utc>,
}

impl AnalysisRecord {
    #[must_use]
    pub fn new(product_id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            product_id: product_id.into(),
            url: url.into(),
            screenshot_path: None,
            inspection: None,
            features: None,
            error: None,
            captured_at: Utc::now(),
        }
    }

    /// Records `message` unless an earlier error was already recorded.
    pub fn note_error(&mut self, message: impl Into<String>) {
        if self.error.is_none() {
            self.error = Some(message.into());
        }
    }

    /// Display title: inspected h1, else a generic label.
    #[must_use]
    pub fn display_title(&self) -> String {
        self.inspection
            .as_ref()
            .and_then(|i| i.title.clone())
            .unwrap_or_else(|| format!("Product {}", self.product_id))
    }
}

/// Counts over a set of analysis records, used for report summaries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnalysisSummary {
    pub total: usize,
    pub with_screenshot: usize,
    pub on_sale: usize,
    pub with_reviews: usize,
    pub free_shipping: usize,
    pub with_multiple_images: usize,
    pub with_size_in_title: usize,
    pub with_many_sizes: usize,
    pub failed: usize,
}

impl AnalysisSummary {
    #[must_use]
    pub fn from_records(records: &[AnalysisRecord]) -> Self {
        let mut summary = Self {
            total: records.len(),
            ..Self::default()
        };
        for record in records {
            if record.screenshot_path.is_some() {
                summary.with_screenshot += 1;
            }
            if record.error.is_some() {
                summary.failed += 1;
            }
            if let Some(features) = &record.features {
                if features.on_sale == Some(true) {
                    summary.on_sale += 1;
                }
                if features.free_shipping == Some(true) {
                    summary.free_shipping += 1;
                }
            }
            let inspected_reviews = record.inspection.as_ref().is_some_and(|i| i.has_reviews);
            let seen_reviews = record
                .features
                .as_ref()
                .is_some_and(|f| f.has_reviews == Some(true));
            if inspected_reviews || seen_reviews {
                summary.with_reviews += 1;
            }
            if let Some(inspection) = &record.inspection {
                if inspection.has_multiple_images {
                    summary.with_multiple_images += 1;
                }
                if inspection.has_size_in_title {
                    summary.with_size_in_title += 1;
                }
                if inspection.has_shop_with_many_sizes {
                    summary.with_many_sizes += 1;
                }
            }
        }
        summary
    }

    /// Share of `count` in the total, as a percentage with one decimal.
    #[must_use]
    pub fn percentage(&self, count: usize) -> f64 {
        percentage(count, self.total)
    }
}

/// Outcome of a ranking comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Winner {
    #[serde(alias = "a")]
    A,
    #[serde(alias = "b")]
    B,
    #[serde(alias = "tie", alias = "TIE")]
    Tie,
}

impl fmt::Display for Winner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Winner::A => write!(f, "A"),
            Winner::B => write!(f, "B"),
            Winner::Tie => write!(f, "Tie"),
        }
    }
}

/// A model's judgement of which variant ranks better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub winner: Winner,
    /// Confidence in `[0.0, 1.0]`.
    pub confidence: f64,
    pub score_a: f64,
    pub score_b: f64,
    #[serde(default)]
    pub winner_summary: Option<String>,
    #[serde(default)]
    pub reasoning: Option<String>,
    #[serde(default)]
    pub key_differences: Option<String>,
}

/// One captured variant of an A/B pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantCapture {
    pub url: String,
    #[serde(default)]
    pub screenshot: Option<PathBuf>,
    #[serde(default)]
    pub h1_title: Option<String>,
    #[serde(default)]
    pub product_titles: Vec<String>,
}

/// A/B comparison of one listing URL rendered with two ranking variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRecord {
    /// 1-based position in the input list.
    pub url_index: usize,
    pub original_url: String,
    #[serde(default)]
    pub visits: u64,
    pub variant_a: VariantCapture,
    pub variant_b: VariantCapture,
    /// `None` when the model could not produce a usable verdict.
    #[serde(default)]
    pub verdict: Option<Verdict>,
    pub analyzed_at: DateTime<Utc>,
}

/// Aggregate statistics over a set of comparisons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbStatistics {
    pub total_urls: usize,
    pub variant_a_wins: usize,
    pub variant_b_wins: usize,
    pub ties: usize,
    /// Comparisons without a verdict.
    pub unknown: usize,
    pub average_score_a: f64,
    pub average_score_b: f64,
    pub average_confidence: f64,
    pub weighted_score_a: f64,
    pub weighted_score_b: f64,
    pub overall_winner: Winner,
    pub win_percentage_a: f64,
    pub win_percentage_b: f64,
    pub tie_percentage: f64,
}

impl AbStatistics {
    /// Computes statistics, or `None` for an empty set.
    ///
    /// Score averages cover only comparisons with a verdict. Weighted scores
    /// use page visits as weights and fall back to the plain average when no
    /// comparison has recorded visits.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_records(records: &[ComparisonRecord]) -> Option<Self> {
        if records.is_empty() {
            return None;
        }

        let verdicts: Vec<(&Verdict, u64)> = records
            .iter()
            .filter_map(|r| r.verdict.as_ref().map(|v| (v, r.visits)))
            .collect();

        let count = |w: Winner| verdicts.iter().filter(|(v, _)| v.winner == w).count();
        let variant_a_wins = count(Winner::A);
        let variant_b_wins = count(Winner::B);
        let ties = count(Winner::Tie);
        let unknown = records.len() - verdicts.len();

        let mean = |f: &dyn Fn(&Verdict) -> f64| -> f64 {
            if verdicts.is_empty() {
                0.0
            } else {
                verdicts.iter().map(|(v, _)| f(v)).sum::<f64>() / verdicts.len() as f64
            }
        };
        let average_score_a = mean(&|v| v.score_a);
        let average_score_b = mean(&|v| v.score_b);
        let average_confidence = mean(&|v| v.confidence);

        let total_visits: u64 = verdicts.iter().map(|(_, visits)| *visits).sum();
        let weighted = |f: &dyn Fn(&Verdict) -> f64, fallback: f64| -> f64 {
            if total_visits == 0 {
                fallback
            } else {
                verdicts
                    .iter()
                    .map(|(v, visits)| f(v) * *visits as f64)
                    .sum::<f64>()
                    / total_visits as f64
            }
        };
        let weighted_score_a = weighted(&|v| v.score_a, average_score_a);
        let weighted_score_b = weighted(&|v| v.score_b, average_score_b);

        let overall_winner = match variant_a_wins.cmp(&variant_b_wins) {
            std::cmp::Ordering::Greater => Winner::A,
            std::cmp::Ordering::Less => Winner::B,
            std::cmp::Ordering::Equal => Winner::Tie,
        };

        let total = records.len();
        Some(Self {
            total_urls: total,
            variant_a_wins,
            variant_b_wins,
            ties,
            unknown,
            average_score_a: round2(average_score_a),
            average_score_b: round2(average_score_b),
            average_confidence: round2(average_confidence),
            weighted_score_a: round2(weighted_score_a),
            weighted_score_b: round2(weighted_score_b),
            overall_winner,
            win_percentage_a: percentage(variant_a_wins, total),
            win_percentage_b: percentage(variant_b_wins, total),
            tie_percentage: percentage(ties, total),
        })
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[allow(clippy::cast_precision_loss)]
fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (count as f64 / total as f64 * 1000.0).round() / 10.0
}
