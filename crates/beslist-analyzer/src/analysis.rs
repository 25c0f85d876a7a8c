//! Product-page analysis runs.

use std::path::{Path, PathBuf};

use beslist_core::{AnalysisRecord, AnalysisSummary, ProductResult};
use beslist_store::write_json_atomic;

use crate::config::AnalyzerConfig;
use crate::error::AnalyzerError;
use crate::inspect::{inspect_html, PageInspector};
use crate::screenshot::{product_screenshot_name, sanitize, ChromiumScreenshotter, Screenshotter};
use crate::size::size_in_title;
use crate::vision::{extract_features, OpenAiVision, VisionModel};

pub const SCREENSHOTS_DIR: &str = "screenshots";
pub const RESULTS_DIR: &str = "results";
pub const ALL_ANALYSIS_FILE: &str = "all_analysis_results.json";

/// Which slice of the input to process and where to write it.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub output_dir: PathBuf,
    /// 1-based position of the first item to process.
    pub start_from: usize,
    pub limit: Option<usize>,
}

impl RunOptions {
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            start_from: 1,
            limit: None,
        }
    }

    pub(crate) fn offset(&self) -> usize {
        self.start_from.saturating_sub(1)
    }

    pub(crate) fn max_items(&self) -> usize {
        self.limit.unwrap_or(usize::MAX)
    }
}

/// Capture, inspection, and vision collaborators bundled for a run.
pub struct Analyzer {
    pub(crate) screenshotter: Box<dyn Screenshotter>,
    pub(crate) vision: Option<Box<dyn VisionModel>>,
    pub(crate) inspector: PageInspector,
}

impl Analyzer {
    #[must_use]
    pub fn new(
        screenshotter: Box<dyn Screenshotter>,
        vision: Option<Box<dyn VisionModel>>,
        inspector: PageInspector,
    ) -> Self {
        Self {
            screenshotter,
            vision,
            inspector,
        }
    }

    /// Chromium screenshots, OpenAI vision when a key is configured.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzerError`] if an HTTP client cannot be built.
    pub fn from_config(config: &AnalyzerConfig) -> Result<Self, AnalyzerError> {
        let vision = OpenAiVision::from_config(config)?
            .map(|v| Box::new(v) as Box<dyn VisionModel>);
        if vision.is_none() {
            tracing::info!("no vision API key configured; feature extraction disabled");
        }
        Ok(Self::new(
            Box::new(ChromiumScreenshotter::from_config(config)),
            vision,
            PageInspector::from_config(config)?,
        ))
    }

    #[must_use]
    pub fn has_vision(&self) -> bool {
        self.vision.is_some()
    }

    /// Screenshotter and vision model names, `none` for a missing model.
    #[must_use]
    pub fn collaborators(&self) -> (&'static str, &'static str) {
        (
            self.screenshotter.name(),
            self.vision.as_deref().map_or("none", |v| v.name()),
        )
    }

    /// Analyzes the selected products one at a time.
    ///
    /// Each product gets a record even when its capture, inspection, or
    /// feature extraction fails; the first failure is stored on the record.
    /// Records are written to `results/<id>_analysis.json` as they complete
    /// and together to `all_analysis_results.json` at the end.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzerError`] only when output files cannot be written.
    pub async fn run_product_analysis(
        &self,
        products: &[ProductResult],
        options: &RunOptions,
    ) -> Result<Vec<AnalysisRecord>, AnalyzerError> {
        let screenshots_dir = options.output_dir.join(SCREENSHOTS_DIR);
        let results_dir = options.output_dir.join(RESULTS_DIR);
        create_dir(&screenshots_dir)?;
        create_dir(&results_dir)?;

        let selected: Vec<&ProductResult> = products
            .iter()
            .skip(options.offset())
            .take(options.max_items())
            .collect();
        let (screenshotter, vision) = self.collaborators();
        tracing::info!(
            selected = selected.len(),
            total = products.len(),
            screenshotter,
            vision,
            start_from = options.start_from,
            output = %options.output_dir.display(),
            "product analysis started"
        );

        let mut records = Vec::with_capacity(selected.len());
        for (i, product) in selected.into_iter().enumerate() {
            let record = self.analyze_product(product, &screenshots_dir).await;
            if let Some(error) = &record.error {
                tracing::warn!(product_id = %record.product_id, error = %error, "product analysis incomplete");
            }
            let file = results_dir.join(format!("{}_analysis.json", sanitize(&record.product_id)));
            write_json_atomic(&file, &record)?;
            tracing::info!(
                n = i + 1,
                product_id = %record.product_id,
                "product analyzed"
            );
            records.push(record);
        }

        write_json_atomic(&options.output_dir.join(ALL_ANALYSIS_FILE), &records)?;

        let summary = AnalysisSummary::from_records(&records);
        tracing::info!(
            total = summary.total,
            with_screenshot = summary.with_screenshot,
            failed = summary.failed,
            "product analysis completed"
        );
        Ok(records)
    }

    async fn analyze_product(&self, product: &ProductResult, screenshots_dir: &Path) -> AnalysisRecord {
        let id = product.pim_id.as_deref().unwrap_or(&product.product_id);
        let url = product.product_url.as_str();
        let mut record = AnalysisRecord::new(id, url);

        let dest = screenshots_dir.join(product_screenshot_name(id, url));
        match self.screenshotter.capture(url, &dest).await {
            Ok(path) => record.screenshot_path = Some(path),
            Err(e) => record.note_error(format!("screenshot failed: {e}")),
        }

        match self.inspector.fetch_html(url).await {
            Ok(html) => {
                let mut inspection = inspect_html(&html);
                if let Some(title) = inspection.title.as_deref() {
                    inspection.has_size_in_title = size_in_title(self.vision.as_deref(), title).await;
                }
                record.inspection = Some(inspection);
            }
            Err(e) => record.note_error(format!("page inspection failed: {e}")),
        }

        if let (Some(model), Some(path)) = (self.vision.as_deref(), record.screenshot_path.clone()) {
            match extract_features(model, &path).await {
                Ok(features) => record.features = Some(features),
                Err(e) => record.note_error(format!("feature extraction failed: {e}")),
            }
        }

        record
    }
}

pub(crate) fn create_dir(path: &Path) -> Result<(), AnalyzerError> {
    std::fs::create_dir_all(path).map_err(|source| AnalyzerError::Io {
        path: path.to_path_buf(),
        source,
    })
}
