//! Product analysis and A/B runs with stub collaborators and wiremock pages.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use beslist_analyzer::{
    AbInput, Analyzer, AnalyzerError, CaptureError, PageInspector, RunOptions, Screenshotter,
    VariantParams, VisionError, VisionModel,
};
use beslist_core::{AnalysisRecord, ComparisonRecord, ProductResult, Winner};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Writes a placeholder file, failing for URLs containing `broken`.
struct StubScreenshotter;

#[async_trait]
impl Screenshotter for StubScreenshotter {
    fn name(&self) -> &'static str {
        "stub"
    }

    async fn capture(&self, url: &str, dest: &Path) -> Result<PathBuf, CaptureError> {
        if url.contains("broken") {
            return Err(CaptureError::Timeout {
                url: url.to_owned(),
                secs: 1,
            });
        }
        std::fs::create_dir_all(dest.parent().unwrap()).unwrap();
        std::fs::write(dest, b"png").unwrap();
        Ok(dest.to_path_buf())
    }
}

/// Answers by the number of attached screenshots.
struct StubVision {
    fail_comparisons: bool,
}

impl StubVision {
    fn new(fail_comparisons: bool) -> Self {
        Self { fail_comparisons }
    }
}

#[async_trait]
impl VisionModel for StubVision {
    fn name(&self) -> &'static str {
        "stub-vision"
    }

    async fn complete_json(
        &self,
        _system: &str,
        prompt: &str,
        images: &[&Path],
    ) -> Result<Value, VisionError> {
        match images.len() {
            0 => Ok(json!({"has_size": prompt.ends_with("maat 40")})),
            1 => Ok(json!({"on_sale": true, "has_reviews": true, "free_shipping": false})),
            _ if self.fail_comparisons => Err(VisionError::MalformedOutput("nope".to_owned())),
            _ => Ok(json!({"winner": "A", "confidence": 0.9, "score_a": 8, "score_b": 6})),
        }
    }
}

fn product(id: &str, url: String) -> ProductResult {
    ProductResult {
        product_id: id.to_owned(),
        pim_id: Some(format!("pim-{id}")),
        product_url: url,
        category: "schoenen".to_owned(),
        title: None,
        direct_matches: Vec::new(),
    }
}

fn analyzer(vision: Option<StubVision>) -> Analyzer {
    Analyzer::new(
        Box::new(StubScreenshotter),
        vision.map(|v| Box::new(v) as Box<dyn VisionModel>),
        PageInspector::new(5, "beslist-test/0.1").expect("inspector"),
    )
}

async fn mount_page(server: &MockServer, page: &str, html: &str) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(ResponseTemplate::new(200).set_body_string(html.to_owned()))
        .mount(server)
        .await;
}

#[tokio::test]
async fn screenshot_failure_is_recorded_and_batch_continues() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    mount_page(
        &server,
        "/p/ok/",
        r#"<h1>Laars maat 40</h1><img class="thumb__image--a"><img class="thumb__image--a">"#,
    )
    .await;
    mount_page(&server, "/p/broken/", "<h1>Sneaker</h1>").await;

    let products = vec![
        product("1", format!("{}/p/broken/", server.uri())),
        product("2", format!("{}/p/ok/", server.uri())),
    ];
    let records = analyzer(Some(StubVision::new(false)))
        .run_product_analysis(&products, &RunOptions::new(dir.path()))
        .await
        .expect("run");

    assert_eq!(records.len(), 2);
    let broken = &records[0];
    assert_eq!(broken.product_id, "pim-1");
    assert!(broken.screenshot_path.is_none());
    assert!(broken.error.as_deref().unwrap().starts_with("screenshot failed"));
    assert!(broken.features.is_none(), "no screenshot, no features");
    assert_eq!(
        broken.inspection.as_ref().unwrap().title.as_deref(),
        Some("Sneaker")
    );

    let ok = &records[1];
    assert!(ok.error.is_none());
    assert!(ok.screenshot_path.as_ref().unwrap().is_file());
    let inspection = ok.inspection.as_ref().unwrap();
    assert!(inspection.has_multiple_images);
    assert!(inspection.has_size_in_title);
    assert_eq!(ok.features.as_ref().unwrap().on_sale, Some(true));

    let saved: Vec<AnalysisRecord> = serde_json::from_slice(
        &std::fs::read(dir.path().join("all_analysis_results.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(saved, records);
    assert!(dir.path().join("results").join("pim-2_analysis.json").is_file());
}

#[test]
fn collaborators_report_missing_vision_model() {
    let without = analyzer(None);
    assert!(!without.has_vision());
    assert_eq!(without.collaborators(), ("stub", "none"));

    let with = analyzer(Some(StubVision::new(false)));
    assert!(with.has_vision());
    assert_eq!(with.collaborators(), ("stub", "stub-vision"));
}

#[tokio::test]
async fn without_vision_pattern_check_and_no_features() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    mount_page(&server, "/p/a/", "<h1>Pump 38 rood</h1>").await;

    let products = vec![product("1", format!("{}/p/a/", server.uri()))];
    let records = analyzer(None)
        .run_product_analysis(&products, &RunOptions::new(dir.path()))
        .await
        .expect("run");

    assert!(records[0].error.is_none());
    assert!(records[0].features.is_none());
    assert!(records[0].inspection.as_ref().unwrap().has_size_in_title);
}

#[tokio::test]
async fn start_from_and_limit_select_a_slice() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<h1>x</h1>"))
        .mount(&server)
        .await;

    let products: Vec<ProductResult> = (1..=6)
        .map(|i| product(&i.to_string(), format!("{}/p/{i}/", server.uri())))
        .collect();
    let options = RunOptions {
        start_from: 3,
        limit: Some(2),
        ..RunOptions::new(dir.path())
    };
    let records = analyzer(None)
        .run_product_analysis(&products, &options)
        .await
        .expect("run");

    let ids: Vec<&str> = records.iter().map(|r| r.product_id.as_str()).collect();
    assert_eq!(ids, vec!["pim-3", "pim-4"]);
}

#[tokio::test]
async fn inspection_failure_is_recorded() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let products = vec![product("1", format!("{}/p/gone/", server.uri()))];
    let records = analyzer(None)
        .run_product_analysis(&products, &RunOptions::new(dir.path()))
        .await
        .expect("run");

    assert!(records[0].screenshot_path.is_some());
    assert!(records[0].inspection.is_none());
    assert!(records[0]
        .error
        .as_deref()
        .unwrap()
        .starts_with("page inspection failed"));
}

fn params() -> VariantParams {
    VariantParams {
        param: "opt_seg".to_owned(),
        variant_a: "5".to_owned(),
        variant_b: "6".to_owned(),
    }
}

const LISTING: &str = r"<h1>Schoenen</h1>
    <article><h3>Sneaker wit</h3></article>
    <article><h3>Laars zwart</h3></article>";

#[tokio::test]
async fn ab_run_skips_failed_captures_and_writes_statistics() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    mount_page(&server, "/schoenen/", LISTING).await;
    mount_page(&server, "/tassen/", LISTING).await;

    let inputs = vec![
        AbInput {
            url: format!("{}/schoenen/", server.uri()),
            visits: 100,
        },
        AbInput {
            url: format!("{}/broken/", server.uri()),
            visits: 50,
        },
        AbInput {
            url: format!("{}/tassen/", server.uri()),
            visits: 0,
        },
    ];

    let run = analyzer(Some(StubVision::new(false)))
        .run_ab_test(&inputs, &params(), &RunOptions::new(dir.path()))
        .await
        .expect("run");

    let indexes: Vec<usize> = run.records.iter().map(|r| r.url_index).collect();
    assert_eq!(indexes, vec![1, 3]);

    let first = &run.records[0];
    assert!(first.variant_a.url.ends_with("/schoenen/?opt_seg=5"));
    assert!(first.variant_b.url.ends_with("/schoenen/?opt_seg=6"));
    assert_eq!(first.variant_a.h1_title.as_deref(), Some("Schoenen"));
    assert_eq!(first.variant_a.product_titles, vec!["Sneaker wit", "Laars zwart"]);
    assert_eq!(first.verdict.as_ref().unwrap().winner, Winner::A);

    let stats = run.statistics.expect("statistics");
    assert_eq!(stats.total_urls, 2);
    assert_eq!(stats.variant_a_wins, 2);
    assert_eq!(stats.overall_winner, Winner::A);

    let results = dir.path().join("results");
    let saved: Vec<ComparisonRecord> =
        serde_json::from_slice(&std::fs::read(results.join("all_results.json")).unwrap()).unwrap();
    assert_eq!(saved, run.records);
    assert!(results.join("statistics.json").is_file());
}

#[tokio::test]
async fn ab_comparison_failure_keeps_record_without_verdict() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    mount_page(&server, "/schoenen/", LISTING).await;

    let inputs = vec![AbInput {
        url: format!("{}/schoenen/", server.uri()),
        visits: 10,
    }];
    let run = analyzer(Some(StubVision::new(true)))
        .run_ab_test(&inputs, &params(), &RunOptions::new(dir.path()))
        .await
        .expect("run");

    assert_eq!(run.records.len(), 1);
    assert!(run.records[0].verdict.is_none());
    assert_eq!(run.statistics.unwrap().unknown, 1);
}

#[tokio::test]
async fn ab_resume_keeps_earlier_records() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    mount_page(&server, "/schoenen/", LISTING).await;
    mount_page(&server, "/tassen/", LISTING).await;

    let inputs = vec![
        AbInput {
            url: format!("{}/schoenen/", server.uri()),
            visits: 1,
        },
        AbInput {
            url: format!("{}/tassen/", server.uri()),
            visits: 1,
        },
    ];
    let analyzer = analyzer(Some(StubVision::new(false)));
    let first = RunOptions {
        limit: Some(1),
        ..RunOptions::new(dir.path())
    };
    analyzer
        .run_ab_test(&inputs, &params(), &first)
        .await
        .expect("first run");

    let resumed = RunOptions {
        start_from: 2,
        ..RunOptions::new(dir.path())
    };
    let run = analyzer
        .run_ab_test(&inputs, &params(), &resumed)
        .await
        .expect("resumed run");

    let indexes: Vec<usize> = run.records.iter().map(|r| r.url_index).collect();
    assert_eq!(indexes, vec![1, 2]);
}

#[tokio::test]
async fn ab_run_requires_vision_model() {
    let dir = tempfile::tempdir().unwrap();
    let result = analyzer(None)
        .run_ab_test(&[], &params(), &RunOptions::new(dir.path()))
        .await;
    assert!(matches!(result, Err(AnalyzerError::VisionUnavailable)));
}
