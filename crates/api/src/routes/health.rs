//! Health check endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use order_store::Store;
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// GET /health: reports whether the store accepts new transactions.
pub async fn check<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> (StatusCode, Json<HealthResponse>) {
    match state.order_service.store().begin().await {
        Ok(tx) => {
            if let Err(e) = tx.rollback().await {
                tracing::warn!(error = %e, "health check rollback failed");
            }
            (StatusCode::OK, Json(HealthResponse { status: "ok" }))
        }
        Err(e) => {
            tracing::error!(error = %e, "store unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unavailable",
                }),
            )
        }
    }
}
