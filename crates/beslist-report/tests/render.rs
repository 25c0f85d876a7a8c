//! Renders real PDFs into a temporary directory.

use beslist_core::{AbStatistics, AnalysisRecord, ComparisonRecord, VariantCapture, Verdict, Winner};
use beslist_report::{
    analysis_blocks, render, write_ab_report, write_analysis_report, Block,
    ANALYSIS_REPORT_TITLE,
};
use chrono::Utc;
use printpdf::image_crate::{Rgb, RgbImage};

fn screenshot(dir: &std::path::Path, name: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    RgbImage::from_pixel(64, 36, Rgb([200, 30, 30]))
        .save(&path)
        .unwrap();
    path
}

#[test]
fn failed_screenshot_still_yields_report_with_placeholder() {
    let dir = tempfile::tempdir().unwrap();

    let mut captured = AnalysisRecord::new("pim-1", "https://www.beslist.nl/p/1/");
    captured.screenshot_path = Some(screenshot(dir.path(), "pim-1.png"));

    let mut failed = AnalysisRecord::new("pim-2", "https://www.beslist.nl/p/2/");
    failed.note_error("screenshot failed: timed out");

    let records = vec![captured, failed];
    let blocks = analysis_blocks(&records, Utc::now());
    let screenshots: Vec<&Block> = blocks
        .iter()
        .filter(|b| matches!(b, Block::Screenshot(_)))
        .collect();
    assert_eq!(screenshots.len(), 2);
    assert_eq!(screenshots[1], &Block::Screenshot(None));

    let path = write_analysis_report(dir.path(), &records).expect("report");
    let name = path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("product_analysis_report_"));
    assert!(name.ends_with(".pdf"));
    let bytes = std::fs::read(&path).unwrap();
    assert!(bytes.starts_with(b"%PDF"));
}

#[test]
fn unreadable_screenshot_falls_back_to_placeholder() {
    let dir = tempfile::tempdir().unwrap();
    let bogus = dir.path().join("bogus.png");
    std::fs::write(&bogus, b"not an image").unwrap();

    let bytes = render(
        ANALYSIS_REPORT_TITLE,
        &[
            Block::Title("t".to_owned()),
            Block::Screenshot(Some(bogus)),
            Block::Screenshot(Some(dir.path().join("missing.png"))),
        ],
    )
    .expect("rendered");
    assert!(bytes.starts_with(b"%PDF"));
}

#[test]
fn long_reports_break_across_pages() {
    let blocks: Vec<Block> = (0..200)
        .map(|i| Block::text(format!("line {i} with some filler text")))
        .collect();
    let bytes = render("long", &blocks).expect("rendered");
    assert!(bytes.starts_with(b"%PDF"));
}

#[test]
fn ab_report_renders_pairs() {
    let dir = tempfile::tempdir().unwrap();
    let a = screenshot(dir.path(), "a.png");

    let records = vec![ComparisonRecord {
        url_index: 1,
        original_url: "https://www.beslist.nl/schoenen/".to_owned(),
        visits: 12,
        variant_a: VariantCapture {
            url: "https://www.beslist.nl/schoenen/?opt_seg=5".to_owned(),
            screenshot: Some(a),
            h1_title: Some("Schoenen".to_owned()),
            product_titles: vec!["Sneaker wit".to_owned()],
        },
        variant_b: VariantCapture {
            url: "https://www.beslist.nl/schoenen/?opt_seg=6".to_owned(),
            screenshot: None,
            h1_title: None,
            product_titles: Vec::new(),
        },
        verdict: Some(Verdict {
            winner: Winner::A,
            confidence: 0.8,
            score_a: 8.0,
            score_b: 6.0,
            winner_summary: Some("A shows more relevant shoes".to_owned()),
            reasoning: None,
            key_differences: Some("top 3 differ".to_owned()),
        }),
        analyzed_at: Utc::now(),
    }];
    let stats = AbStatistics::from_records(&records);

    let path = write_ab_report(dir.path(), &records, stats.as_ref()).expect("report");
    assert!(path
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("ab_test_report_"));
    assert!(std::fs::read(&path).unwrap().starts_with(b"%PDF"));
}
