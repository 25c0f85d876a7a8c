use beslist_core::{AbStatistics, ComparisonRecord};
use chrono::{DateTime, Utc};

use crate::layout::Block;

pub const AB_REPORT_TITLE: &str = "A/B Ranking Comparison Report";

/// Statistics page followed by one page per compared URL with both variant
/// screenshots side by side.
#[must_use]
pub fn ab_blocks(
    records: &[ComparisonRecord],
    statistics: Option<&AbStatistics>,
    generated_at: DateTime<Utc>,
) -> Vec<Block> {
    let mut blocks = vec![
        Block::Title(AB_REPORT_TITLE.to_owned()),
        Block::text(format!(
            "Generated {}",
            generated_at.format("%Y-%m-%d %H:%M UTC")
        )),
        Block::Spacer(4.0),
        Block::Heading("Summary".to_owned()),
    ];

    match statistics {
        Some(stats) => statistics_lines(stats, &mut blocks),
        None => blocks.push(Block::text("No comparisons were completed.")),
    }

    for record in records {
        blocks.push(Block::PageBreak);
        blocks.push(Block::Heading(format!(
            "URL {}: {}",
            record.url_index, record.original_url
        )));
        if record.visits > 0 {
            blocks.push(Block::text(format!("Visits: {}", record.visits)));
        }
        if let Some(h1) = record
            .variant_a
            .h1_title
            .as_ref()
            .or(record.variant_b.h1_title.as_ref())
        {
            blocks.push(Block::text(format!("Page: {h1}")));
        }
        blocks.push(Block::Pair {
            left_label: "Variant A".to_owned(),
            left: record.variant_a.screenshot.clone(),
            right_label: "Variant B".to_owned(),
            right: record.variant_b.screenshot.clone(),
        });

        match &record.verdict {
            Some(verdict) => {
                blocks.push(Block::Heading(format!(
                    "Winner: {} (confidence {:.0}%)",
                    verdict.winner,
                    verdict.confidence * 100.0
                )));
                blocks.push(Block::text(format!(
                    "Scores: A {:.1} / B {:.1}",
                    verdict.score_a, verdict.score_b
                )));
                if let Some(summary) = &verdict.winner_summary {
                    blocks.push(Block::text(summary.clone()));
                }
                if let Some(reasoning) = &verdict.reasoning {
                    blocks.push(Block::text(format!("Reasoning: {reasoning}")));
                }
                if let Some(differences) = &verdict.key_differences {
                    blocks.push(Block::text(format!("Key differences: {differences}")));
                }
            }
            None => blocks.push(Block::text("No verdict: the comparison could not be completed.")),
        }
    }

    blocks
}

fn statistics_lines(stats: &AbStatistics, blocks: &mut Vec<Block>) {
    blocks.extend([
        Block::text(format!("URLs compared: {}", stats.total_urls)),
        Block::text(format!(
            "Variant A wins: {} ({:.1}%)",
            stats.variant_a_wins, stats.win_percentage_a
        )),
        Block::text(format!(
            "Variant B wins: {} ({:.1}%)",
            stats.variant_b_wins, stats.win_percentage_b
        )),
        Block::text(format!(
            "Ties: {} ({:.1}%)",
            stats.ties, stats.tie_percentage
        )),
        Block::text(format!("Without verdict: {}", stats.unknown)),
        Block::text(format!(
            "Average score: A {:.2} / B {:.2}",
            stats.average_score_a, stats.average_score_b
        )),
        Block::text(format!(
            "Visit-weighted score: A {:.2} / B {:.2}",
            stats.weighted_score_a, stats.weighted_score_b
        )),
        Block::text(format!(
            "Average confidence: {:.0}%",
            stats.average_confidence * 100.0
        )),
        Block::Heading(format!("Overall winner: {}", stats.overall_winner)),
    ]);
}
