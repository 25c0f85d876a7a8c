use std::net::SocketAddr;
use std::path::PathBuf;

/// Price order requested from the direct-match endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub data_dir: PathBuf,
    pub analysis_dir: PathBuf,
    pub ab_dir: PathBuf,

    pub country: String,
    pub default_category: String,
    pub default_limit: usize,
    /// Template with `{category}` and `{pim_id}` placeholders.
    pub product_url_format: String,
    pub search_url: String,
    pub direct_match_url: String,
    pub direct_match_limit: usize,
    pub direct_match_sort_direction: SortDirection,
    pub search_page_size: usize,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub max_retries: u32,
    pub retry_backoff_secs: u64,
    pub inter_request_delay_ms: u64,

    pub openai_api_key: Option<String>,
    pub vision_base_url: String,
    pub vision_model: String,
    pub browser_bin: String,
    pub screenshot_timeout_secs: u64,
    pub window_width: u32,
    pub window_height: u32,
    pub ab_param: String,
    pub ab_variant_a: String,
    pub ab_variant_b: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("data_dir", &self.data_dir)
            .field("analysis_dir", &self.analysis_dir)
            .field("ab_dir", &self.ab_dir)
            .field("country", &self.country)
            .field("default_category", &self.default_category)
            .field("default_limit", &self.default_limit)
            .field("product_url_format", &self.product_url_format)
            .field("search_url", &self.search_url)
            .field("direct_match_url", &self.direct_match_url)
            .field("direct_match_limit", &self.direct_match_limit)
            .field(
                "direct_match_sort_direction",
                &self.direct_match_sort_direction,
            )
            .field("search_page_size", &self.search_page_size)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_secs", &self.retry_backoff_secs)
            .field("inter_request_delay_ms", &self.inter_request_delay_ms)
            .field(
                "openai_api_key",
                &self.openai_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("vision_base_url", &self.vision_base_url)
            .field("vision_model", &self.vision_model)
            .field("browser_bin", &self.browser_bin)
            .field("screenshot_timeout_secs", &self.screenshot_timeout_secs)
            .field("window_width", &self.window_width)
            .field("window_height", &self.window_height)
            .field("ab_param", &self.ab_param)
            .field("ab_variant_a", &self.ab_variant_a)
            .field("ab_variant_b", &self.ab_variant_b)
            .finish()
    }
}
