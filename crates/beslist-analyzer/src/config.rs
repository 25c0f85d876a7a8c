use beslist_core::AppConfig;

/// Settings for the capture, inspection, and vision collaborators.
#[derive(Clone)]
pub struct AnalyzerConfig {
    pub browser_bin: String,
    pub screenshot_timeout_secs: u64,
    pub window_width: u32,
    pub window_height: u32,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub openai_api_key: Option<String>,
    pub vision_base_url: String,
    pub vision_model: String,
    pub max_retries: u32,
    pub retry_backoff_secs: u64,
    pub ab_param: String,
    pub ab_variant_a: String,
    pub ab_variant_b: String,
}

impl AnalyzerConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            browser_bin: config.browser_bin.clone(),
            screenshot_timeout_secs: config.screenshot_timeout_secs,
            window_width: config.window_width,
            window_height: config.window_height,
            request_timeout_secs: config.request_timeout_secs,
            user_agent: config.user_agent.clone(),
            openai_api_key: config.openai_api_key.clone(),
            vision_base_url: config.vision_base_url.clone(),
            vision_model: config.vision_model.clone(),
            max_retries: config.max_retries,
            retry_backoff_secs: config.retry_backoff_secs,
            ab_param: config.ab_param.clone(),
            ab_variant_a: config.ab_variant_a.clone(),
            ab_variant_b: config.ab_variant_b.clone(),
        }
    }
}

impl std::fmt::Debug for AnalyzerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyzerConfig")
            .field("browser_bin", &self.browser_bin)
            .field("screenshot_timeout_secs", &self.screenshot_timeout_secs)
            .field("window_width", &self.window_width)
            .field("window_height", &self.window_height)
            .field(
                "openai_api_key",
                &self.openai_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("vision_base_url", &self.vision_base_url)
            .field("vision_model", &self.vision_model)
            .field("ab_param", &self.ab_param)
            .finish_non_exhaustive()
    }
}
