use crate::app_config::{AppConfig, SortDirection};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build configuration from an arbitrary lookup. Every variable has a
/// default, so a lookup that knows nothing yields the default config.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_with<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    build_app_config(lookup)
}

fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        parse_num(var, &or_default(var, default))
    };
    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        parse_num(var, &or_default(var, default))
    };
    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        parse_num(var, &or_default(var, default))
    };

    let positive = |var: &str, value: usize| -> Result<usize, ConfigError> {
        if value == 0 {
            Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: "must be greater than zero".to_string(),
            })
        } else {
            Ok(value)
        }
    };

    let bind_addr = parse("BESLIST_BIND_ADDR", "0.0.0.0:5000")?;
    let log_level = or_default("BESLIST_LOG_LEVEL", "info");
    let data_dir = PathBuf::from(or_default("BESLIST_DATA_DIR", "data"));
    let analysis_dir = PathBuf::from(or_default("BESLIST_ANALYSIS_DIR", "analysis_results"));
    let ab_dir = PathBuf::from(or_default("BESLIST_AB_DIR", "ab_test"));

    let country = or_default("BESLIST_COUNTRY", "nl");
    let default_category = or_default("BESLIST_DEFAULT_CATEGORY", "schoenen");
    let default_limit = positive(
        "BESLIST_DEFAULT_LIMIT",
        parse_usize("BESLIST_DEFAULT_LIMIT", "50")?,
    )?;
    let product_url_format = or_default(
        "BESLIST_PRODUCT_URL_FORMAT",
        "https://www.beslist.nl/p/products/{category}/{pim_id}/",
    );
    let search_url = or_default(
        "BESLIST_SEARCH_URL",
        "https://productsearch.api.beslist.nl/productsearch",
    );
    let direct_match_url = or_default(
        "BESLIST_DIRECT_MATCH_URL",
        "https://productsearch.api.beslist.nl/directmatch",
    );
    let direct_match_limit = parse_usize("BESLIST_DIRECT_MATCH_LIMIT", "3")?;
    let direct_match_sort_direction = parse_sort_direction(&or_default(
        "BESLIST_DIRECT_MATCH_SORT_DIRECTION",
        "asc",
    ))?;
    let search_page_size = positive(
        "BESLIST_SEARCH_PAGE_SIZE",
        parse_usize("BESLIST_SEARCH_PAGE_SIZE", "50")?,
    )?;
    let request_timeout_secs = parse_u64("BESLIST_REQUEST_TIMEOUT_SECS", "30")?;
    let user_agent = or_default("BESLIST_USER_AGENT", "beslist-fetch/0.1");
    let max_retries = parse_u32("BESLIST_MAX_RETRIES", "3")?;
    let retry_backoff_secs = parse_u64("BESLIST_RETRY_BACKOFF_SECS", "2")?;
    let inter_request_delay_ms = parse_u64("BESLIST_INTER_REQUEST_DELAY_MS", "250")?;

    let openai_api_key = lookup("OPENAI_API_KEY")
        .ok()
        .filter(|key| !key.trim().is_empty());
    let vision_base_url = or_default("BESLIST_VISION_BASE_URL", "https://api.openai.com/v1");
    let vision_model = or_default("BESLIST_VISION_MODEL", "gpt-4o-mini");
    let browser_bin = or_default("BESLIST_BROWSER_BIN", "chromium");
    let screenshot_timeout_secs = parse_u64("BESLIST_SCREENSHOT_TIMEOUT_SECS", "30")?;
    let window_width = parse_u32("BESLIST_WINDOW_WIDTH", "1920")?;
    let window_height = parse_u32("BESLIST_WINDOW_HEIGHT", "1080")?;
    let ab_param = or_default("BESLIST_AB_PARAM", "opt_seg");
    let ab_variant_a = or_default("BESLIST_AB_VARIANT_A", "5");
    let ab_variant_b = or_default("BESLIST_AB_VARIANT_B", "6");

    Ok(AppConfig {
        bind_addr,
        log_level,
        data_dir,
        analysis_dir,
        ab_dir,
        country,
        default_category,
        default_limit,
        product_url_format,
        search_url,
        direct_match_url,
        direct_match_limit,
        direct_match_sort_direction,
        search_page_size,
        request_timeout_secs,
        user_agent,
        max_retries,
        retry_backoff_secs,
        inter_request_delay_ms,
        openai_api_key,
        vision_base_url,
        vision_model,
        browser_bin,
        screenshot_timeout_secs,
        window_width,
        window_height,
        ab_param,
        ab_variant_a,
        ab_variant_b,
    })
}

fn parse_num<T>(var: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
}

fn parse_sort_direction(s: &str) -> Result<SortDirection, ConfigError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "asc" => Ok(SortDirection::Asc),
        "desc" => Ok(SortDirection::Desc),
        other => Err(ConfigError::InvalidEnvVar {
            var: "BESLIST_DIRECT_MATCH_SORT_DIRECTION".to_string(),
            reason: format!("expected asc or desc, got {other:?}"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
