use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use beslist_core::{FetchSummary, ProductResult};
use beslist_pipeline::FetchResponse;
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_pipeline_error, ApiError, ApiResponse, AppState};

/// Upper bound on products per triggered fetch cycle.
const MAX_FETCH_LIMIT: usize = 500;

#[derive(Debug, Deserialize)]
pub(super) struct FetchQuery {
    pub category: Option<String>,
    pub limit: Option<usize>,
    /// Any casing of `true` forces a new cycle; every other value does not.
    pub refresh: Option<String>,
}

impl FetchQuery {
    fn refresh(&self) -> bool {
        self.refresh
            .as_deref()
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct ProductQuery {
    pub category: Option<String>,
}

/// `/api/fetch` payload, tagged with where the data came from.
#[derive(Debug, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub(super) enum FetchPayload {
    Cache { results: Vec<ProductResult> },
    Fresh { summary: FetchSummary },
}

impl From<FetchResponse> for FetchPayload {
    fn from(response: FetchResponse) -> Self {
        match response {
            FetchResponse::Cached(results) => Self::Cache { results },
            FetchResponse::Fresh(summary) => Self::Fresh { summary },
        }
    }
}

pub(super) fn normalize_limit(limit: Option<usize>, default: usize) -> usize {
    limit.unwrap_or(default).clamp(1, MAX_FETCH_LIMIT)
}

fn category_or_default<'a>(category: Option<&'a str>, state: &'a AppState) -> &'a str {
    category
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(&state.config.default_category)
}

fn read_latest(
    state: &AppState,
    req_id: &RequestId,
) -> Result<Option<Vec<ProductResult>>, ApiError> {
    state
        .pipeline
        .store()
        .read_latest()
        .map_err(|e| map_pipeline_error(req_id.0.clone(), &e.into()))
}

pub(super) async fn fetch(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<FetchQuery>,
) -> Result<Json<ApiResponse<FetchPayload>>, ApiError> {
    let category = category_or_default(query.category.as_deref(), &state);
    let limit = normalize_limit(query.limit, state.config.default_limit);
    let refresh = query.refresh();

    // The latest file is swapped atomically, so cached reads skip the lock.
    if !refresh {
        if let Some(results) = read_latest(&state, &req_id)? {
            return Ok(Json(ApiResponse::new(
                FetchPayload::Cache { results },
                req_id.0,
            )));
        }
    }

    let _guard = state.fetch_lock.lock().await;
    tracing::info!(category, limit, refresh, "fetch requested");
    // Re-checks latest under the lock when not refreshing, so a cycle that
    // finished while waiting is served instead of repeated.
    let response = state
        .pipeline
        .fetch_or_cached(category, limit, refresh)
        .await
        .map_err(|e| map_pipeline_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(response.into(), req_id.0)))
}

pub(super) async fn list_products(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<ProductResult>>>, ApiError> {
    if let Some(products) = read_latest(&state, &req_id)? {
        return Ok(Json(ApiResponse::new(products, req_id.0)));
    }

    let _guard = state.fetch_lock.lock().await;
    let products = state
        .pipeline
        .latest_or_fetch(&state.config.default_category, state.config.default_limit)
        .await
        .map_err(|e| map_pipeline_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(products, req_id.0)))
}

pub(super) async fn get_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(pim_id): Path<String>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<ApiResponse<ProductResult>>, ApiError> {
    let pim_id = pim_id.trim();
    if pim_id.is_empty() {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "pim_id must not be empty",
        ));
    }
    let category = category_or_default(query.category.as_deref(), &state);
    let product = state
        .pipeline
        .product_by_pim(pim_id, category)
        .await
        .map_err(|e| map_pipeline_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(product, req_id.0)))
}
