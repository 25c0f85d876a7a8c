use axum::{
    body::Body,
    extract::{Path, Request, State},
    response::{IntoResponse, Response},
    Extension,
};
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::middleware::RequestId;

use super::{ApiError, AppState};

/// Serves a file from the data directory. Paths that escape the directory
/// and paths that do not name a file both answer 404.
pub(super) async fn serve_data_file(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(path): Path<String>,
    req: Request,
) -> Response {
    let Some(file) = state.pipeline.store().resolve_static(&path) else {
        tracing::debug!(path = %path, "data file not found");
        return ApiError::new(req_id.0, "not_found", format!("no data file at {path}"))
            .into_response();
    };

    match ServeFile::new(file).oneshot(req).await {
        Ok(res) => res.map(Body::new).into_response(),
        Err(infallible) => match infallible {},
    }
}
