//! End-to-end fetch cycle tests: wiremock for the affiliate API, a temporary
//! directory for the snapshot store.

use beslist_client::{BeslistClient, ClientConfig};
use beslist_core::SortDirection;
use beslist_pipeline::{FetchResponse, Pipeline};
use beslist_store::SnapshotStore;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn pipeline(server: &MockServer, data_dir: &std::path::Path) -> Pipeline {
    let config = ClientConfig {
        search_url: format!("{}/productsearch", server.uri()),
        direct_match_url: format!("{}/directmatch", server.uri()),
        country: "nl".to_owned(),
        product_url_format: "https://www.beslist.nl/p/products/{category}/{pim_id}/".to_owned(),
        page_size: 50,
        direct_match_limit: 3,
        sort_direction: SortDirection::Asc,
        timeout_secs: 5,
        user_agent: "beslist-test/0.1".to_owned(),
        max_retries: 0,
        retry_backoff_secs: 0,
        inter_request_delay_ms: 0,
    };
    Pipeline::new(
        BeslistClient::new(config).expect("client"),
        SnapshotStore::new(data_dir),
    )
}

fn search_body(items: serde_json::Value) -> serde_json::Value {
    json!({"results": [{"resultSet": items}]})
}

fn offers(prices: &[(&str, f64)]) -> serde_json::Value {
    let items: Vec<serde_json::Value> = prices
        .iter()
        .map(|(shop, price)| json!({"shopItem": {"url": format!("https://{shop}.example/p"), "price": price}}))
        .collect();
    json!({"results": [{"resultSet": items}]})
}

async fn mount_search(server: &MockServer, items: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/productsearch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_body(items)))
        .mount(server)
        .await;
}

#[tokio::test]
async fn latest_equals_completed_cycle_final_result() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    mount_search(
        &server,
        json!([
            {"id": "1", "pim3puntNullId": "pim-1", "title": "Sneaker"},
            {"id": "2", "pim3puntNullId": "pim-2", "title": "Laars"}
        ]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/directmatch"))
        .and(query_param("pim3puntNullId", "pim-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(offers(&[
            ("d", 90.0),
            ("a", 10.0),
            ("c", 50.0),
            ("b", 20.0),
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/directmatch"))
        .and(query_param("pim3puntNullId", "pim-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
        .mount(&server)
        .await;

    let pipeline = pipeline(&server, dir.path());
    let cycle = pipeline.fetch("schoenen", 2).await.expect("cycle");

    assert_eq!(cycle.results.len(), 2, "limit 2 yields exactly 2 records");
    assert!(cycle.summary.shortfall_reason.is_none());
    for result in &cycle.results {
        assert!(result.direct_matches.len() <= 3);
        let prices: Vec<_> = result.direct_matches.iter().map(|o| o.price).collect();
        assert!(prices.windows(2).all(|w| w[0] <= w[1]), "prices non-decreasing");
    }
    let first: Vec<&str> = cycle.results[0]
        .direct_matches
        .iter()
        .map(|o| o.url.as_str())
        .collect();
    assert_eq!(
        first,
        vec!["https://a.example/p", "https://b.example/p", "https://c.example/p"]
    );
    assert!(cycle.results[1].direct_matches.is_empty());

    let latest = pipeline.store().read_latest().unwrap().expect("latest");
    assert_eq!(latest, cycle.results);

    let snapshot_dir = std::path::PathBuf::from(&cycle.summary.fetch_directory);
    let final_result: Vec<beslist_core::ProductResult> = serde_json::from_slice(
        &std::fs::read(snapshot_dir.join("final_result.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(final_result, latest);
    assert!(snapshot_dir.join("direct_matches").join("pim-1.json").is_file());
}

#[tokio::test]
async fn products_without_pim_never_reach_direct_match() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    mount_search(
        &server,
        json!([
            {"id": "1", "title": "No pim", "url": "https://www.beslist.nl/p/no-pim/1/"},
            {"id": "2", "pim3puntNullId": "pim-2"}
        ]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/directmatch"))
        .and(query_param("pim3puntNullId", "pim-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(offers(&[("a", 5.0)])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/directmatch"))
        .and(query_param("pim3puntNullId", "1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let cycle = pipeline(&server, dir.path())
        .fetch("schoenen", 10)
        .await
        .expect("cycle");

    assert_eq!(cycle.summary.products_with_pim, 1);
    assert!(cycle.results[0].direct_matches.is_empty());
    assert!(cycle.summary.shortfall_reason.is_some(), "fewer than requested");
}

#[tokio::test]
async fn lookup_failure_is_recorded_empty_and_counted() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    mount_search(
        &server,
        json!([
            {"id": "1", "pim3puntNullId": "pim-1"},
            {"id": "2", "pim3puntNullId": "pim-2"}
        ]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/directmatch"))
        .and(query_param("pim3puntNullId", "pim-1"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/directmatch"))
        .and(query_param("pim3puntNullId", "pim-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(offers(&[("a", 5.0)])))
        .mount(&server)
        .await;

    let cycle = pipeline(&server, dir.path())
        .fetch("schoenen", 2)
        .await
        .expect("cycle survives lookup failure");

    assert_eq!(cycle.summary.failed_lookups, 1);
    assert!(cycle.results[0].direct_matches.is_empty());
    assert_eq!(cycle.results[1].direct_matches.len(), 1);
}

#[tokio::test]
async fn refresh_false_serves_cache_without_network() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_body(json!([]))))
        .expect(0)
        .mount(&server)
        .await;

    let cached = json!([{
        "product_id": "1",
        "pim3puntnull": "pim-1",
        "product_url": "https://www.beslist.nl/p/products/schoenen/pim-1/",
        "category": "schoenen",
        "direct_matches": []
    }]);
    std::fs::write(
        dir.path().join("latest_result.json"),
        serde_json::to_vec(&cached).unwrap(),
    )
    .unwrap();

    let pipeline = pipeline(&server, dir.path());
    let response = pipeline
        .fetch_or_cached("schoenen", 2, false)
        .await
        .expect("cached");
    match response {
        FetchResponse::Cached(results) => assert_eq!(results.len(), 1),
        FetchResponse::Fresh(_) => panic!("expected cached response"),
    }

    let product = pipeline
        .product_by_pim("pim-1", "schoenen")
        .await
        .expect("cached product");
    assert_eq!(product.product_id, "1");
}

#[tokio::test]
async fn search_failure_leaves_previous_latest_intact() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("latest_result.json"), b"[]").unwrap();

    Mock::given(method("GET"))
        .and(path("/productsearch"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let pipeline = pipeline(&server, dir.path());
    let result = pipeline.fetch_or_cached("schoenen", 2, true).await;
    assert!(result.is_err());

    assert_eq!(
        std::fs::read(dir.path().join("latest_result.json")).unwrap(),
        b"[]"
    );
    assert!(pipeline.store().list_snapshots().unwrap().is_empty());
    let partials = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().ends_with(".partial"))
        .count();
    assert_eq!(partials, 0);
}

#[tokio::test]
async fn uncached_product_is_looked_up_live_and_saved() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/directmatch"))
        .and(query_param("pim3puntNullId", "pim-9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(offers(&[("b", 30.0), ("a", 12.5)])))
        .expect(1)
        .mount(&server)
        .await;

    let product = pipeline(&server, dir.path())
        .product_by_pim("pim-9", "schoenen")
        .await
        .expect("live lookup");

    assert_eq!(
        product.product_url,
        "https://www.beslist.nl/p/products/schoenen/pim-9/"
    );
    assert_eq!(product.direct_matches[0].url, "https://a.example/p");
    assert!(dir.path().join("direct_match_pim-9.json").is_file());
}

#[tokio::test]
async fn products_fetches_when_no_latest_exists() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    mount_search(&server, json!([{"id": "5", "url": "https://www.beslist.nl/p/x/5/"}])).await;

    let pipeline = pipeline(&server, dir.path());
    let results = pipeline.latest_or_fetch("schoenen", 1).await.expect("fetched");
    assert_eq!(results.len(), 1);
    assert!(pipeline.store().read_latest().unwrap().is_some());
}
