use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use tracing::info;

use crate::{application::error::HttpError, cache::StalenessPolicy};

use super::middleware::log_responses;

#[derive(Clone)]
pub struct HttpState {
    pub index: Arc<StalenessPolicy>,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/blog", get(blog_index))
        .route(
            "/api/clear-preview",
            get(clear_preview).post(clear_preview),
        )
        .route("/health", get(health))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct IndexQuery {
    preview: bool,
}

async fn blog_index(State(state): State<HttpState>, Query(query): Query<IndexQuery>) -> Response {
    match state.index.get_index(query.preview).await {
        Ok(index) => Json(index.as_ref()).into_response(),
        Err(err) => HttpError::from(err).into_response(),
    }
}

async fn clear_preview(State(state): State<HttpState>) -> StatusCode {
    state.index.invalidate(true);
    info!(target = "folio::http", "preview index cleared on request");
    StatusCode::NO_CONTENT
}

async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}
