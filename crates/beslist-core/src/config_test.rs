use std::collections::HashMap;
use std::env::VarError;

use super::*;

fn lookup_from_map<'a>(
    map: &'a HashMap<&'a str, &'a str>,
) -> impl Fn(&str) -> Result<String, VarError> + 'a {
    move |key| {
        map.get(key)
            .map(|v| (*v).to_string())
            .ok_or(VarError::NotPresent)
    }
}

#[test]
fn build_app_config_defaults_with_empty_env() {
    let map: HashMap<&str, &str> = HashMap::new();
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.bind_addr.to_string(), "0.0.0.0:5000");
    assert_eq!(cfg.log_level, "info");
    assert_eq!(cfg.data_dir.to_str(), Some("data"));
    assert_eq!(cfg.analysis_dir.to_str(), Some("analysis_results"));
    assert_eq!(cfg.ab_dir.to_str(), Some("ab_test"));
    assert_eq!(cfg.country, "nl");
    assert_eq!(cfg.default_category, "schoenen");
    assert_eq!(cfg.default_limit, 50);
    assert_eq!(
        cfg.product_url_format,
        "https://www.beslist.nl/p/products/{category}/{pim_id}/"
    );
    assert_eq!(cfg.direct_match_limit, 3);
    assert_eq!(cfg.direct_match_sort_direction, SortDirection::Asc);
    assert_eq!(cfg.search_page_size, 50);
    assert_eq!(cfg.request_timeout_secs, 30);
    assert_eq!(cfg.user_agent, "beslist-fetch/0.1");
    assert_eq!(cfg.max_retries, 3);
    assert_eq!(cfg.retry_backoff_secs, 2);
    assert_eq!(cfg.inter_request_delay_ms, 250);
    assert!(cfg.openai_api_key.is_none());
    assert_eq!(cfg.vision_model, "gpt-4o-mini");
    assert_eq!(cfg.browser_bin, "chromium");
    assert_eq!((cfg.window_width, cfg.window_height), (1920, 1080));
    assert_eq!(cfg.ab_param, "opt_seg");
    assert_eq!(cfg.ab_variant_a, "5");
    assert_eq!(cfg.ab_variant_b, "6");
}

#[test]
fn build_app_config_fails_with_invalid_bind_addr() {
    let mut map = HashMap::new();
    map.insert("BESLIST_BIND_ADDR", "not-a-socket-addr");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "BESLIST_BIND_ADDR"),
        "expected InvalidEnvVar(BESLIST_BIND_ADDR), got: {result:?}"
    );
}

#[test]
fn build_app_config_overrides() {
    let mut map = HashMap::new();
    map.insert("BESLIST_DIRECT_MATCH_LIMIT", "5");
    map.insert("BESLIST_DIRECT_MATCH_SORT_DIRECTION", "DESC");
    map.insert("BESLIST_MAX_RETRIES", "7");
    map.insert("BESLIST_COUNTRY", "be");
    map.insert("BESLIST_DATA_DIR", "/tmp/beslist");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.direct_match_limit, 5);
    assert_eq!(cfg.direct_match_sort_direction, SortDirection::Desc);
    assert_eq!(cfg.max_retries, 7);
    assert_eq!(cfg.country, "be");
    assert_eq!(cfg.data_dir.to_str(), Some("/tmp/beslist"));
}

#[test]
fn build_app_config_rejects_non_numeric_values() {
    for var in [
        "BESLIST_DEFAULT_LIMIT",
        "BESLIST_DIRECT_MATCH_LIMIT",
        "BESLIST_REQUEST_TIMEOUT_SECS",
        "BESLIST_MAX_RETRIES",
        "BESLIST_RETRY_BACKOFF_SECS",
        "BESLIST_INTER_REQUEST_DELAY_MS",
        "BESLIST_WINDOW_WIDTH",
    ] {
        let mut map = HashMap::new();
        map.insert(var, "not-a-number");
        let result = build_app_config(lookup_from_map(&map));
        assert!(
            matches!(result, Err(ConfigError::InvalidEnvVar { var: ref v, .. }) if v == var),
            "expected InvalidEnvVar({var}), got: {result:?}"
        );
    }
}

#[test]
fn build_app_config_rejects_zero_page_size() {
    let mut map = HashMap::new();
    map.insert("BESLIST_SEARCH_PAGE_SIZE", "0");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "BESLIST_SEARCH_PAGE_SIZE"),
        "got: {result:?}"
    );
}

#[test]
fn build_app_config_rejects_unknown_sort_direction() {
    let mut map = HashMap::new();
    map.insert("BESLIST_DIRECT_MATCH_SORT_DIRECTION", "sideways");
    assert!(build_app_config(lookup_from_map(&map)).is_err());
}

#[test]
fn blank_api_key_counts_as_unset() {
    let mut map = HashMap::new();
    map.insert("OPENAI_API_KEY", "  ");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert!(cfg.openai_api_key.is_none());
}

#[test]
fn debug_redacts_api_key() {
    let mut map = HashMap::new();
    map.insert("OPENAI_API_KEY", "sk-secret-value");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    let rendered = format!("{cfg:?}");
    assert!(!rendered.contains("sk-secret-value"));
    assert!(rendered.contains("[redacted]"));
}
