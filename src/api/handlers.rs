//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint. The cache itself
//! never fails a request; handlers only report misses, rejected input and
//! writes that no tier accepted.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::cache::{CacheManager, CacheStats};
use crate::error::{CacheError, Result};
use crate::models::{
    DeleteResponse, FlushResponse, GetResponse, HealthResponse, IncrementRequest,
    IncrementResponse, InvalidateResponse, SetRequest, SetResponse,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<CacheManager>,
}

impl AppState {
    pub fn new(cache: Arc<CacheManager>) -> Self {
        Self { cache }
    }
}

/// Handler for PUT /set
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let tags = req.tag_refs();
    if !state.cache.set(&req.key, &req.value, req.ttl, &tags).await {
        return Err(CacheError::Unavailable(format!(
            "no cache tier accepted key '{}'",
            req.key
        )));
    }

    Ok(Json(SetResponse::new(req.key.clone())))
}

/// Handler for GET /get/:key
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    match state.cache.get::<serde_json::Value>(&key).await {
        Some(value) => Ok(Json(GetResponse::new(key, value))),
        None => Err(CacheError::NotFound(key)),
    }
}

/// Handler for DELETE /del/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    if state.cache.delete(&key).await {
        Ok(Json(DeleteResponse::new(key)))
    } else {
        Err(CacheError::NotFound(key))
    }
}

/// Handler for POST /invalidate/:tag
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Path(tag): Path<String>,
) -> Json<InvalidateResponse> {
    let removed = state.cache.invalidate_by_tag(&tag).await;
    Json(InvalidateResponse { tag, removed })
}

/// Handler for POST /incr/:key
///
/// The JSON body is optional; without one the counter goes up by 1.
pub async fn increment_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    body: Option<Json<IncrementRequest>>,
) -> Result<Json<IncrementResponse>> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    if let Some(error_msg) = req.validate(&key) {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let value = state.cache.increment(&key, req.amount, req.ttl).await;
    Ok(Json(IncrementResponse { key, value }))
}

/// Handler for DELETE /flush
pub async fn flush_handler(State(state): State<AppState>) -> Result<Json<FlushResponse>> {
    if state.cache.clear().await {
        Ok(Json(FlushResponse {
            message: "Cache flushed".to_string(),
        }))
    } else {
        Err(CacheError::Unavailable(
            "one or more cache tiers could not be flushed".to_string(),
        ))
    }
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.cache.get_stats())
}

/// Handler for GET /health
///
/// 200 while the local tier works (`healthy` or `degraded`), 503 otherwise.
pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let report = state.cache.health_check().await;
    let response = HealthResponse::from_report(report, state.cache.has_distributed());
    let status = if response.is_serving() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(response))
}
