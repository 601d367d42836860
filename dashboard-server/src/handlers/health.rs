//! Health check handler

use axum::{extract::State, Json};
use serde::Serialize;

use prediction_core::EngineStatus;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    timestamp: i64,
    classifier: EngineStatus,
}

pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    let classifier = state.service.classifier().status();

    Json(HealthResponse {
        status: if classifier.model_loaded { "healthy" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().timestamp(),
        classifier,
    })
}
