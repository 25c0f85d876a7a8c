use std::collections::HashSet;
use std::time::Duration;

use beslist_core::{AppConfig, DirectMatchRecord, ProductRecord, SortDirection};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::ClientError;
use crate::extract::{product_record, vendor_offers};
use crate::rate_limit::retry_with_backoff;
use crate::types::{DirectMatchResponse, SearchItem, SearchResponse};

/// Maximum number of search pages per call. Guards against an upstream that
/// keeps returning full pages forever.
pub const MAX_PAGES: usize = 100;

/// Endpoint and policy settings for [`BeslistClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub search_url: String,
    pub direct_match_url: String,
    pub country: String,
    pub product_url_format: String,
    pub page_size: usize,
    pub direct_match_limit: usize,
    pub sort_direction: SortDirection,
    pub timeout_secs: u64,
    pub user_agent: String,
    pub max_retries: u32,
    pub retry_backoff_secs: u64,
    /// Delay between consecutive search pages.
    pub inter_request_delay_ms: u64,
}

impl ClientConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            search_url: config.search_url.clone(),
            direct_match_url: config.direct_match_url.clone(),
            country: config.country.clone(),
            product_url_format: config.product_url_format.clone(),
            page_size: config.search_page_size,
            direct_match_limit: config.direct_match_limit,
            sort_direction: config.direct_match_sort_direction,
            timeout_secs: config.request_timeout_secs,
            user_agent: config.user_agent.clone(),
            max_retries: config.max_retries,
            retry_backoff_secs: config.retry_backoff_secs,
            inter_request_delay_ms: config.inter_request_delay_ms,
        }
    }
}

/// One raw search page plus its parsed items.
#[derive(Debug)]
pub struct SearchPage {
    pub raw: serde_json::Value,
    pub items: Vec<SearchItem>,
}

/// Result of a paged, deduplicated product search.
#[derive(Debug)]
pub struct SearchOutcome {
    /// Raw page bodies in request order.
    pub raw_pages: Vec<serde_json::Value>,
    /// Unique product records, at most the requested limit.
    pub products: Vec<ProductRecord>,
    /// Items returned upstream across all pages, before filtering.
    pub upstream_count: usize,
    /// `true` when the upstream ran out of items before the limit was reached.
    pub exhausted: bool,
}

/// Result of a direct-match lookup.
#[derive(Debug)]
pub struct DirectMatchOutcome {
    pub raw: serde_json::Value,
    pub record: DirectMatchRecord,
}

/// HTTP client for the Beslist product-search and direct-match endpoints.
///
/// Handles rate limiting (429), server errors (5xx), not-found (404), and
/// other non-2xx responses as typed errors. Transient errors are retried with
/// a fixed backoff up to `max_retries` additional attempts.
pub struct BeslistClient {
    client: Client,
    config: ClientConfig,
}

impl BeslistClient {
    /// # Errors
    ///
    /// Returns [`ClientError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(config.user_agent.as_str())
            .build()?;
        Ok(Self { client, config })
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Fetches one page of search results.
    ///
    /// # Errors
    ///
    /// Any [`ClientError`] left after retries.
    pub async fn search_page(
        &self,
        category: &str,
        limit: usize,
        offset: usize,
    ) -> Result<SearchPage, ClientError> {
        let query = Self::search_query(&self.config.country, category, limit, offset);
        let context = format!("search page for {category} at offset {offset}");
        let raw = self
            .get_json(&self.config.search_url, &query, &context)
            .await?;
        let items = parse_value::<SearchResponse>(&raw, &context)?.into_result_set();
        Ok(SearchPage { raw, items })
    }

    /// Pages the search endpoint until `limit` unique products are collected
    /// or the upstream runs dry.
    ///
    /// Products are deduplicated by pim id when present, else by product id;
    /// the first occurrence wins. Items without an identifier or product URL
    /// are skipped.
    ///
    /// # Errors
    ///
    /// Propagates any error from [`Self::search_page`]; partial results are
    /// discarded. Returns [`ClientError::PaginationLimit`] after
    /// [`MAX_PAGES`] pages.
    pub async fn search_products(
        &self,
        category: &str,
        limit: usize,
    ) -> Result<SearchOutcome, ClientError> {
        let mut outcome = SearchOutcome {
            raw_pages: Vec::new(),
            products: Vec::new(),
            upstream_count: 0,
            exhausted: false,
        };
        let mut seen: HashSet<String> = HashSet::new();
        let mut offset = 0usize;
        let mut page_count = 0usize;

        while outcome.products.len() < limit {
            page_count += 1;
            if page_count > MAX_PAGES {
                return Err(ClientError::PaginationLimit {
                    category: category.to_owned(),
                    max_pages: MAX_PAGES,
                });
            }

            if page_count > 1 && self.config.inter_request_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.inter_request_delay_ms))
                    .await;
            }

            let requested = self.config.page_size.min(limit - outcome.products.len());
            let page = self.search_page(category, requested, offset).await?;
            let returned = page.items.len();
            outcome.upstream_count += returned;
            outcome.raw_pages.push(page.raw);

            let before = outcome.products.len();
            for item in &page.items {
                if outcome.products.len() >= limit {
                    break;
                }
                let Some(record) =
                    product_record(item, category, &self.config.product_url_format)
                else {
                    continue;
                };
                let key = record
                    .pim_id
                    .clone()
                    .unwrap_or_else(|| record.product_id.clone());
                if seen.insert(key) {
                    outcome.products.push(record);
                }
            }

            tracing::debug!(
                category,
                offset,
                requested,
                returned,
                collected = outcome.products.len(),
                "search page processed"
            );

            if returned < requested {
                outcome.exhausted = true;
                break;
            }
            if outcome.products.len() == before {
                tracing::warn!(category, offset, "search page added no new products; stopping");
                break;
            }
            offset += returned;
        }

        Ok(outcome)
    }

    /// Looks up vendor offers for one pim id.
    ///
    /// The offers are re-sorted locally by ascending price and capped at the
    /// configured limit regardless of what the upstream returned.
    ///
    /// # Errors
    ///
    /// Any [`ClientError`] left after retries.
    pub async fn direct_matches(&self, pim_id: &str) -> Result<DirectMatchOutcome, ClientError> {
        let query = vec![
            ("pim3puntNullId", pim_id.to_owned()),
            ("country", self.config.country.clone()),
            ("limit", self.config.direct_match_limit.to_string()),
            ("splittestid", "1".to_owned()),
            ("sort", "price".to_owned()),
            (
                "sortdirection",
                self.config.sort_direction.as_str().to_owned(),
            ),
        ];
        let context = format!("direct match for {pim_id}");
        let raw = self
            .get_json(&self.config.direct_match_url, &query, &context)
            .await?;
        let items = parse_value::<DirectMatchResponse>(&raw, &context)?.into_result_set();
        let record =
            DirectMatchRecord::from_offers(pim_id, vendor_offers(items), self.config.direct_match_limit);
        Ok(DirectMatchOutcome { raw, record })
    }

    async fn get_json(
        &self,
        url: &str,
        query: &[(&str, String)],
        context: &str,
    ) -> Result<serde_json::Value, ClientError> {
        retry_with_backoff(self.config.max_retries, self.config.retry_backoff_secs, || async move {
            let response = self.client.get(url).query(query).send().await?;
            let status = response.status();

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                let retry_after_secs = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(60);
                return Err(ClientError::RateLimited {
                    url: url.to_owned(),
                    retry_after_secs,
                });
            }

            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(ClientError::NotFound {
                    url: url.to_owned(),
                });
            }

            if status.is_server_error() {
                return Err(ClientError::ServerError {
                    status: status.as_u16(),
                    url: url.to_owned(),
                });
            }

            if !status.is_success() {
                return Err(ClientError::UnexpectedStatus {
                    status: status.as_u16(),
                    url: url.to_owned(),
                });
            }

            let body = response.text().await?;
            serde_json::from_str::<serde_json::Value>(&body).map_err(|e| ClientError::Deserialize {
                context: context.to_owned(),
                source: e,
            })
        })
        .await
    }

    /// Fixed search parameters plus the paging window.
    fn search_query(
        country: &str,
        category: &str,
        limit: usize,
        offset: usize,
    ) -> Vec<(&'static str, String)> {
        vec![
            ("country", country.to_owned()),
            ("cat_url", format!("/{}/", category.trim_matches('/'))),
            ("sort", "popularity".to_owned()),
            ("sortdirection", "desc".to_owned()),
            ("limit", limit.to_string()),
            ("offset", offset.to_string()),
            ("res[or]", "true".to_owned()),
            ("res[facets]", "false".to_owned()),
            ("res[facets_all]", "0".to_owned()),
            ("res[facets_selected]", "false".to_owned()),
            ("res[stats]", "true".to_owned()),
            ("res[categories]", "true".to_owned()),
            ("res[collapse]", "true".to_owned()),
            ("res[category_direction_markers]", "true".to_owned()),
            ("splittestid", "9".to_owned()),
        ]
    }
}

fn parse_value<T: DeserializeOwned>(raw: &serde_json::Value, context: &str) -> Result<T, ClientError> {
    T::deserialize(raw).map_err(|e| ClientError::Deserialize {
        context: context.to_owned(),
        source: e,
    })
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
