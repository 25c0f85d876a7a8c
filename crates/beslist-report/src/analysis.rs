use beslist_core::{AnalysisRecord, AnalysisSummary, PageFeatures, PageInspection};
use chrono::{DateTime, Utc};

use crate::layout::Block;

pub const ANALYSIS_REPORT_TITLE: &str = "Product Analysis Report";

/// Summary page followed by one page per product.
#[must_use]
pub fn analysis_blocks(records: &[AnalysisRecord], generated_at: DateTime<Utc>) -> Vec<Block> {
    let summary = AnalysisSummary::from_records(records);
    let mut blocks = vec![
        Block::Title(ANALYSIS_REPORT_TITLE.to_owned()),
        Block::text(format!(
            "Generated {}",
            generated_at.format("%Y-%m-%d %H:%M UTC")
        )),
        Block::Spacer(4.0),
        Block::Heading("Summary".to_owned()),
        Block::text(format!("Products analyzed: {}", summary.total)),
    ];

    let rows = [
        ("Screenshots captured", summary.with_screenshot),
        ("On sale", summary.on_sale),
        ("Reviews shown", summary.with_reviews),
        ("Free shipping", summary.free_shipping),
        ("Multiple images", summary.with_multiple_images),
        ("Size in title", summary.with_size_in_title),
        ("Shop with 5+ sizes", summary.with_many_sizes),
        ("Incomplete analyses", summary.failed),
    ];
    for (label, count) in rows {
        blocks.push(Block::text(format!(
            "{label}: {count} ({:.1}%)",
            summary.percentage(count)
        )));
    }

    for (i, record) in records.iter().enumerate() {
        blocks.push(Block::PageBreak);
        blocks.push(Block::Heading(format!(
            "{}. {}",
            i + 1,
            record.display_title()
        )));
        blocks.push(Block::text(format!("Product ID: {}", record.product_id)));
        blocks.push(Block::text(format!("URL: {}", record.url)));
        blocks.push(Block::Screenshot(record.screenshot_path.clone()));

        if let Some(inspection) = &record.inspection {
            inspection_lines(inspection, &mut blocks);
        }
        if let Some(features) = &record.features {
            feature_lines(features, &mut blocks);
        }
        if let Some(error) = &record.error {
            blocks.push(Block::text(format!("Note: {error}")));
        }
    }

    blocks
}

fn inspection_lines(inspection: &PageInspection, blocks: &mut Vec<Block>) {
    blocks.push(Block::text(format!(
        "Images: {} thumbnail(s){}",
        inspection.thumbnail_count,
        if inspection.has_multiple_images {
            ", multiple images"
        } else {
            ""
        }
    )));
    blocks.push(Block::text(format!(
        "Reviews on page: {}",
        yes_no(inspection.has_reviews)
    )));
    blocks.push(Block::text(format!(
        "Size in title: {}",
        yes_no(inspection.has_size_in_title)
    )));
    if !inspection.shop_size_counts.is_empty() {
        let shops: Vec<String> = inspection
            .shop_size_counts
            .iter()
            .map(|(shop, n)| format!("{shop} ({n})"))
            .collect();
        blocks.push(Block::text(format!("Sizes per shop: {}", shops.join(", "))));
    }
}

fn feature_lines(features: &PageFeatures, blocks: &mut Vec<Block>) {
    if let Some(on_sale) = features.on_sale {
        blocks.push(Block::text(format!("On sale: {}", yes_no(on_sale))));
    }
    if let Some(reviews) = features.has_reviews {
        blocks.push(Block::text(format!("Reviews visible: {}", yes_no(reviews))));
    }
    if let Some(free) = features.free_shipping {
        blocks.push(Block::text(format!("Free shipping: {}", yes_no(free))));
    }
    if let Some(info) = &features.shipping_info {
        blocks.push(Block::text(format!("Shipping: {info}")));
    }
    if let Some(delivery) = &features.delivery_time {
        blocks.push(Block::text(format!("Delivery: {delivery}")));
    }
    if let Some(notes) = &features.notes {
        blocks.push(Block::text(format!("Notes: {notes}")));
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}
