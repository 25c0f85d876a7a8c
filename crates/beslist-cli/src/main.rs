mod analyze;
mod fetch;
mod report;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::report::ReportCommands;

/// Product count used by `analyze --test-mode`.
const TEST_MODE_LIMIT: usize = 3;

#[derive(Debug, Parser)]
#[command(name = "beslist-cli")]
#[command(about = "Beslist product fetch, page analysis, and report tool")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run a fetch cycle and print its summary
    Fetch {
        /// Category slug (defaults to `BESLIST_DEFAULT_CATEGORY`)
        #[arg(long)]
        category: Option<String>,

        /// Number of products to fetch (defaults to `BESLIST_DEFAULT_LIMIT`)
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show one product by pim id, from the latest result or a live lookup
    Product {
        pim_id: String,

        /// Category used to build the product URL on a live lookup
        #[arg(long)]
        category: Option<String>,
    },
    /// Fetch products, analyze their pages, and write a PDF report
    Analyze {
        #[arg(long)]
        category: Option<String>,

        /// Number of products to fetch and analyze
        #[arg(long)]
        limit: Option<usize>,

        /// Analyze the latest fetched result instead of fetching again
        #[arg(long)]
        skip_fetch: bool,

        /// Analyze only the first three products
        #[arg(long)]
        test_mode: bool,

        /// 1-based position of the first product to analyze
        #[arg(long, default_value_t = 1)]
        start_from: usize,

        /// Base output directory (defaults to `BESLIST_ANALYSIS_DIR`)
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Compare two ranking variants of listing pages and write a PDF report
    AbTest {
        /// JSON list of `{"url": ..., "visits": ...}` objects
        #[arg(long, required_unless_present = "skip_analysis")]
        input: Option<PathBuf>,

        /// Maximum number of URLs to compare
        #[arg(long)]
        limit: Option<usize>,

        /// 1-based position of the first URL to compare
        #[arg(long, default_value_t = 1)]
        start_from: usize,

        /// Regenerate the report from saved results without comparing again
        #[arg(long)]
        skip_analysis: bool,

        /// Output directory (defaults to `BESLIST_AB_DIR`)
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Re-render a PDF report from saved results
    Report {
        #[command(subcommand)]
        command: ReportCommands,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = beslist_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Fetch { category, limit }) => {
            fetch::run_fetch(&config, category.as_deref(), limit).await?;
        }
        Some(Commands::Product { pim_id, category }) => {
            fetch::run_product(&config, &pim_id, category.as_deref()).await?;
        }
        Some(Commands::Analyze {
            category,
            limit,
            skip_fetch,
            test_mode,
            start_from,
            output_dir,
        }) => {
            let limit = if test_mode {
                Some(TEST_MODE_LIMIT)
            } else {
                limit
            };
            analyze::run_analyze(
                &config,
                &analyze::AnalyzeArgs {
                    category,
                    limit,
                    skip_fetch,
                    start_from,
                    output_dir,
                },
            )
            .await?;
        }
        Some(Commands::AbTest {
            input,
            limit,
            start_from,
            skip_analysis,
            output_dir,
        }) => {
            analyze::run_ab_test(
                &config,
                &analyze::AbTestArgs {
                    input,
                    limit,
                    start_from,
                    skip_analysis,
                    output_dir,
                },
            )
            .await?;
        }
        Some(Commands::Report { command }) => report::run_report(&command)?,
        None => println!("beslist-cli: run with --help to list commands"),
    }

    Ok(())
}
