use axum::extract::State;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};

/// GET /health - Liveness plus a database round-trip
pub async fn get(State(state): State<AppState>) -> ApiResult<Value> {
    state.members.ping().await.map_err(|e| {
        tracing::error!("Health check failed: {}", e);
        ApiError::service_unavailable("Database unreachable")
    })?;

    Ok(ApiResponse::success(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    })))
}
