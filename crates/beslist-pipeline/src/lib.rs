//! Fetch-and-cache pipeline over the Beslist affiliate API.
//!
//! Per-product lookup failures are logged and recorded as empty results
//! rather than propagated, so one bad product never aborts a cycle.

pub mod error;
pub mod fetch;
pub mod matcher;

use beslist_client::{format_product_url, BeslistClient, ClientConfig};
use beslist_core::{AppConfig, FetchSummary, ProductResult};
use beslist_store::SnapshotStore;

pub use error::PipelineError;
pub use fetch::{run_fetch_cycle, FetchCycle};
pub use matcher::{lookup_candidates, match_products, MatchOutcome};

/// Either the cached latest result or a freshly completed cycle.
#[derive(Debug, Clone)]
pub enum FetchResponse {
    Cached(Vec<ProductResult>),
    Fresh(FetchSummary),
}

/// Client plus store, shared by the CLI and the server.
pub struct Pipeline {
    client: BeslistClient,
    store: SnapshotStore,
}

impl Pipeline {
    #[must_use]
    pub fn new(client: BeslistClient, store: SnapshotStore) -> Self {
        Self { client, store }
    }

    /// # Errors
    ///
    /// Returns [`PipelineError::Client`] if the HTTP client cannot be built.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, PipelineError> {
        let client = BeslistClient::new(ClientConfig::from_app_config(config))?;
        Ok(Self::new(client, SnapshotStore::new(&config.data_dir)))
    }

    #[must_use]
    pub fn client(&self) -> &BeslistClient {
        &self.client
    }

    #[must_use]
    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Runs a full fetch cycle.
    ///
    /// # Errors
    ///
    /// See [`run_fetch_cycle`].
    pub async fn fetch(&self, category: &str, limit: usize) -> Result<FetchCycle, PipelineError> {
        run_fetch_cycle(&self.client, &self.store, category, limit).await
    }

    /// Returns the cached latest result when `refresh` is `false` and one
    /// exists, without any network call; otherwise runs a fetch cycle.
    ///
    /// # Errors
    ///
    /// Store read errors, or any [`run_fetch_cycle`] error.
    pub async fn fetch_or_cached(
        &self,
        category: &str,
        limit: usize,
        refresh: bool,
    ) -> Result<FetchResponse, PipelineError> {
        if !refresh {
            if let Some(latest) = self.store.read_latest()? {
                tracing::debug!(results = latest.len(), "serving cached latest result");
                return Ok(FetchResponse::Cached(latest));
            }
        }
        let cycle = self.fetch(category, limit).await?;
        Ok(FetchResponse::Fresh(cycle.summary))
    }

    /// The latest result, running a fetch cycle first if none exists.
    ///
    /// # Errors
    ///
    /// Store read errors, or any [`run_fetch_cycle`] error.
    pub async fn latest_or_fetch(
        &self,
        category: &str,
        limit: usize,
    ) -> Result<Vec<ProductResult>, PipelineError> {
        if let Some(latest) = self.store.read_latest()? {
            return Ok(latest);
        }
        tracing::info!(category, "no latest result yet; running fetch cycle");
        Ok(self.fetch(category, limit).await?.results)
    }

    /// One product by pim id: from the latest result when cached, otherwise
    /// a live direct-match lookup saved as `direct_match_<pim>.json`.
    ///
    /// # Errors
    ///
    /// Store errors, or [`PipelineError::Client`] when the live lookup fails.
    pub async fn product_by_pim(
        &self,
        pim_id: &str,
        category: &str,
    ) -> Result<ProductResult, PipelineError> {
        if let Some(cached) = self.store.find_in_latest(pim_id)? {
            return Ok(cached);
        }

        let found = self.client.direct_matches(pim_id).await?;
        self.store.write_direct_match_lookup(pim_id, &found.raw)?;

        Ok(ProductResult {
            product_id: pim_id.to_owned(),
            pim_id: Some(pim_id.to_owned()),
            product_url: format_product_url(
                &self.client.config().product_url_format,
                category,
                pim_id,
            ),
            category: category.to_owned(),
            title: None,
            direct_matches: found.record.offers,
        })
    }
}
