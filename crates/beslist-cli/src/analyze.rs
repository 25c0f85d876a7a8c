//! `analyze` and `ab-test` command handlers.

use std::path::{Path, PathBuf};

use anyhow::Context;
use beslist_analyzer::ab::{ALL_RESULTS_FILE, STATISTICS_FILE};
use beslist_analyzer::analysis::RESULTS_DIR;
use beslist_analyzer::{
    load_ab_input, read_json, Analyzer, AnalyzerConfig, RunOptions, VariantParams,
};
use beslist_core::{AbStatistics, AppConfig, ComparisonRecord};
use beslist_pipeline::Pipeline;
use chrono::Utc;

#[derive(Debug)]
pub(crate) struct AnalyzeArgs {
    pub category: Option<String>,
    pub limit: Option<usize>,
    pub skip_fetch: bool,
    pub start_from: usize,
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug)]
pub(crate) struct AbTestArgs {
    pub input: Option<PathBuf>,
    pub limit: Option<usize>,
    pub start_from: usize,
    pub skip_analysis: bool,
    pub output_dir: Option<PathBuf>,
}

/// Fetches (unless skipped), analyzes each product page, and writes the
/// report into a fresh `analysis_<timestamp>` directory.
///
/// # Errors
///
/// Returns an error if the fetch fails, no products are available, or output
/// files cannot be written. Per-product failures end up in the report.
pub(crate) async fn run_analyze(config: &AppConfig, args: &AnalyzeArgs) -> anyhow::Result<()> {
    anyhow::ensure!(args.start_from >= 1, "--start-from is 1-based");
    let category = args
        .category
        .as_deref()
        .unwrap_or(&config.default_category);
    let pipeline = Pipeline::from_app_config(config)?;

    let products = if args.skip_fetch {
        pipeline
            .store()
            .read_latest()?
            .context("--skip-fetch given but no latest result exists; run `fetch` first")?
    } else {
        let count = fetch_limit(args.limit, args.start_from, config.default_limit);
        pipeline.fetch(category, count).await?.results
    };
    if products.is_empty() {
        anyhow::bail!("no products to analyze");
    }

    let base = args.output_dir.as_deref().unwrap_or(&config.analysis_dir);
    let run_dir = base.join(format!("analysis_{}", Utc::now().format("%Y%m%d_%H%M%S")));

    let analyzer = Analyzer::from_config(&AnalyzerConfig::from_app_config(config))?;
    if !analyzer.has_vision() {
        tracing::warn!("OPENAI_API_KEY not set; size detection falls back to the title pattern");
    }
    let options = RunOptions {
        start_from: args.start_from,
        limit: args.limit,
        ..RunOptions::new(&run_dir)
    };
    let records = analyzer.run_product_analysis(&products, &options).await?;

    let report = beslist_report::write_analysis_report(&run_dir, &records)?;
    println!("analyzed {} products", records.len());
    println!("results: {}", run_dir.display());
    println!("report: {}", report.display());
    Ok(())
}

/// Runs the A/B comparison (or reloads saved results with
/// `--skip-analysis`) and writes the report.
///
/// # Errors
///
/// Returns an error if the input cannot be read, no vision model is
/// configured, or output files cannot be written.
pub(crate) async fn run_ab_test(config: &AppConfig, args: &AbTestArgs) -> anyhow::Result<()> {
    anyhow::ensure!(args.start_from >= 1, "--start-from is 1-based");
    let output_dir = args.output_dir.as_deref().unwrap_or(&config.ab_dir);

    let (records, statistics) = if args.skip_analysis {
        load_saved_comparisons(output_dir)?
    } else {
        let input = args
            .input
            .as_deref()
            .context("--input is required unless --skip-analysis is given")?;
        let analyzer_config = AnalyzerConfig::from_app_config(config);
        let analyzer = Analyzer::from_config(&analyzer_config)?;
        anyhow::ensure!(
            analyzer.has_vision(),
            "ab-test compares screenshots with a vision model; set OPENAI_API_KEY"
        );

        let inputs = load_ab_input(input)?;
        tracing::info!(urls = inputs.len(), input = %input.display(), "loaded A/B input");

        let params = VariantParams {
            param: analyzer_config.ab_param.clone(),
            variant_a: analyzer_config.ab_variant_a.clone(),
            variant_b: analyzer_config.ab_variant_b.clone(),
        };
        let options = RunOptions {
            start_from: args.start_from,
            limit: args.limit,
            ..RunOptions::new(output_dir)
        };
        let run = analyzer.run_ab_test(&inputs, &params, &options).await?;
        (run.records, run.statistics)
    };

    let report = beslist_report::write_ab_report(output_dir, &records, statistics.as_ref())?;
    if let Some(stats) = &statistics {
        println!(
            "compared {} URLs: A {} / B {} / tie {} / unknown {} (overall: {})",
            stats.total_urls,
            stats.variant_a_wins,
            stats.variant_b_wins,
            stats.ties,
            stats.unknown,
            stats.overall_winner
        );
    }
    println!("report: {}", report.display());
    Ok(())
}

/// Products to fetch so that `limit` remain after skipping to `start_from`.
fn fetch_limit(limit: Option<usize>, start_from: usize, default: usize) -> usize {
    limit.map_or(default, |n| n.saturating_add(start_from.saturating_sub(1)))
}

/// Saved records plus statistics, recomputed when `statistics.json` is absent.
fn load_saved_comparisons(
    output_dir: &Path,
) -> anyhow::Result<(Vec<ComparisonRecord>, Option<AbStatistics>)> {
    let results_dir = output_dir.join(RESULTS_DIR);
    let records: Vec<ComparisonRecord> = read_json(&results_dir.join(ALL_RESULTS_FILE))
        .context("--skip-analysis needs saved results from an earlier run")?;
    let stats_path = results_dir.join(STATISTICS_FILE);
    let statistics = if stats_path.is_file() {
        Some(read_json(&stats_path)?)
    } else {
        AbStatistics::from_records(&records)
    };
    Ok((records, statistics))
}
