//! `report` command handlers: re-render PDFs from saved JSON.

use std::path::{Path, PathBuf};

use clap::Subcommand;

use beslist_analyzer::read_json;
use beslist_core::{AbStatistics, AnalysisRecord, ComparisonRecord};

/// Sub-commands available under `report`.
#[derive(Debug, Subcommand)]
pub enum ReportCommands {
    /// Product analysis report from `all_analysis_results.json`
    Analysis {
        #[arg(long)]
        results: PathBuf,

        /// Where to write the PDF (defaults to the results file's directory)
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// A/B comparison report from `all_results.json`
    Ab {
        #[arg(long)]
        results: PathBuf,

        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
}

/// # Errors
///
/// Returns an error if the results file cannot be read or the PDF cannot be
/// written.
pub(crate) fn run_report(command: &ReportCommands) -> anyhow::Result<()> {
    let path = match command {
        ReportCommands::Analysis {
            results,
            output_dir,
        } => {
            let records: Vec<AnalysisRecord> = read_json(results)?;
            beslist_report::write_analysis_report(&target_dir(results, output_dir.as_deref()), &records)?
        }
        ReportCommands::Ab {
            results,
            output_dir,
        } => {
            let records: Vec<ComparisonRecord> = read_json(results)?;
            let statistics = AbStatistics::from_records(&records);
            beslist_report::write_ab_report(
                &target_dir(results, output_dir.as_deref()),
                &records,
                statistics.as_ref(),
            )?
        }
    };
    println!("report: {}", path.display());
    Ok(())
}

fn target_dir(results: &Path, output_dir: Option<&Path>) -> PathBuf {
    output_dir
        .or_else(|| results.parent().filter(|p| !p.as_os_str().is_empty()))
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_lands_next_to_results_by_default() {
        assert_eq!(
            target_dir(Path::new("ab_test/results/all_results.json"), None),
            PathBuf::from("ab_test/results")
        );
        assert_eq!(
            target_dir(Path::new("all_results.json"), None),
            PathBuf::from(".")
        );
        assert_eq!(
            target_dir(Path::new("x/all.json"), Some(Path::new("out"))),
            PathBuf::from("out")
        );
    }
}
