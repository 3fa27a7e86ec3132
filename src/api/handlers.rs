//! API Handlers
//!
//! HTTP request handlers for each inspection endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::cache::{validate_ttl, Cache};
use crate::error::{CacheError, Result};
use crate::models::{
    CounterResponse, ExpireRequest, FlushResponse, GetResponse, HealthResponse, IncrementRequest,
    KeyResponse, KeysQuery, KeysResponse, SetRequest, StatsResponse,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Active cache backend
    pub cache: Arc<dyn Cache>,
}

impl AppState {
    /// Creates a new AppState around an existing cache.
    pub fn new(cache: Arc<dyn Cache>) -> Self {
        Self { cache }
    }
}

/// Handler for PUT /set
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<KeyResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    if !state.cache.set(&req.key, &req.value, req.ttl).await {
        return Err(CacheError::Internal(format!("Failed to store key '{}'", req.key)));
    }

    Ok(Json(KeyResponse::set(req.key)))
}

/// Handler for GET /get/:key
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    match state.cache.get(&key).await {
        Some(value) => Ok(Json(GetResponse::new(key, value))),
        None => Err(CacheError::NotFound(key)),
    }
}

/// Handler for DELETE /del/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<KeyResponse>> {
    if state.cache.delete(&key).await {
        Ok(Json(KeyResponse::deleted(key)))
    } else {
        Err(CacheError::NotFound(key))
    }
}

/// Handler for GET /keys?pattern=...
pub async fn keys_handler(
    State(state): State<AppState>,
    Query(query): Query<KeysQuery>,
) -> Json<KeysResponse> {
    let keys = state.cache.keys(&query.pattern).await;

    Json(KeysResponse {
        pattern: query.pattern,
        keys,
    })
}

/// Handler for POST /incr/:key
///
/// The body is optional; without one the counter is incremented by 1.
pub async fn increment_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    body: Option<Json<IncrementRequest>>,
) -> Result<Json<CounterResponse>> {
    let amount = body.map(|Json(req)| req.amount).unwrap_or(1);

    match state.cache.increment(&key, amount).await {
        Some(value) => Ok(Json(CounterResponse { key, value })),
        None => Err(CacheError::Conflict(format!(
            "Could not increment '{}' by {}",
            key, amount
        ))),
    }
}

/// Handler for POST /expire/:key
pub async fn expire_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(req): Json<ExpireRequest>,
) -> Result<Json<KeyResponse>> {
    validate_ttl(req.seconds)?;

    if state.cache.expire(&key, req.seconds).await {
        Ok(Json(KeyResponse::expiring(key, req.seconds)))
    } else {
        Err(CacheError::NotFound(key))
    }
}

/// Handler for DELETE /flush
pub async fn flush_handler(State(state): State<AppState>) -> Result<Json<FlushResponse>> {
    if state.cache.flush().await {
        Ok(Json(FlushResponse::new(state.cache.namespace())))
    } else {
        Err(CacheError::Internal("Failed to flush cache".to_string()))
    }
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.cache.stats();

    Json(StatsResponse::new(
        state.cache.backend(),
        state.cache.namespace(),
        &stats,
    ))
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.cache.backend()))
}
