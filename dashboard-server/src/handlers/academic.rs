//! Academic staff handlers: records, reports, batch scoring and purges

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use prediction_core::report::{
    latest_high_risk, newest_first, student_history, to_csv_string, RiskDistribution,
};
use prediction_core::{normalize_student_id, BatchReport, PredictionRecord, RiskSummary};

use crate::{AppState, AppError, AppResult};
use crate::middleware::auth::{require_role, UserContext};
use crate::models::Role;

#[derive(Debug, Serialize)]
pub struct AcademicSummary {
    pub summary: RiskSummary,
    pub high_risk: Vec<PredictionRecord>,
}

#[derive(Debug, Deserialize)]
pub struct BatchQuery {
    #[serde(default)]
    pub save: bool,
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub saved: u64,
    #[serde(flatten)]
    pub report: BatchReport,
}

/// All records, newest first
pub async fn list_predictions(
    State(state): State<AppState>,
    user: UserContext,
) -> AppResult<Json<Vec<PredictionRecord>>> {
    require_role(&user, Role::Academic)?;
    Ok(Json(newest_first(state.predictions.load_all().await?)))
}

/// Tier counts for charting
pub async fn risk_summary(
    State(state): State<AppState>,
    user: UserContext,
) -> AppResult<Json<RiskDistribution>> {
    require_role(&user, Role::Academic)?;
    let records = state.predictions.load_all().await?;
    Ok(Json(RiskDistribution::from_records(&records)))
}

pub async fn summary(
    State(state): State<AppState>,
    user: UserContext,
) -> AppResult<Json<AcademicSummary>> {
    require_role(&user, Role::Academic)?;
    let records = state.predictions.load_all().await?;

    Ok(Json(AcademicSummary {
        summary: RiskSummary::from_records(&records),
        high_risk: latest_high_risk(&records),
    }))
}

/// One student's records, oldest first
pub async fn student_detail(
    State(state): State<AppState>,
    user: UserContext,
    Path(student_id): Path<String>,
) -> AppResult<Json<Vec<PredictionRecord>>> {
    require_role(&user, Role::Academic)?;

    let records = state.predictions.load_all().await?;
    let history = student_history(&records, &student_id);
    if history.is_empty() {
        return Err(AppError::NotFound(format!(
            "No predictions for student '{}'",
            normalize_student_id(&student_id)
        )));
    }

    Ok(Json(history))
}

pub async fn export_csv(
    State(state): State<AppState>,
    user: UserContext,
) -> AppResult<impl IntoResponse> {
    require_role(&user, Role::Academic)?;

    let records = state.predictions.load_all().await?;
    let csv = to_csv_string(&records)
        .map_err(|e| AppError::InternalError(format!("CSV export failed: {}", e)))?;
    let filename = format!(
        "attachment; filename=\"predictions_{}.csv\"",
        chrono::Utc::now().format("%Y%m%d_%H%M%S")
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, filename),
        ],
        csv,
    ))
}

/// Score an uploaded CSV. With `save=true` the successful rows are saved
/// together or not at all.
pub async fn batch(
    State(state): State<AppState>,
    user: UserContext,
    Query(query): Query<BatchQuery>,
    body: String,
) -> AppResult<Json<BatchResponse>> {
    require_role(&user, Role::Academic)?;

    let report = state
        .service
        .predict_csv(&user.username, &body, state.config.batch_max_rows)?;

    let saved = if query.save {
        let records: Vec<PredictionRecord> = report.records().cloned().collect();
        state.predictions.save_all(&records).await?
    } else {
        0
    };

    tracing::info!(
        "Batch upload by {}: {} rows, {} failed, {} saved",
        user.username, report.total, report.failed, saved
    );

    Ok(Json(BatchResponse { saved, report }))
}

pub async fn delete_all(
    State(state): State<AppState>,
    user: UserContext,
) -> AppResult<Json<Value>> {
    require_role(&user, Role::Academic)?;

    let deleted = state.predictions.delete_all().await?;
    tracing::warn!("All predictions purged by {} ({} records)", user.username, deleted);
    Ok(Json(json!({ "deleted": deleted })))
}

pub async fn delete_by_student(
    State(state): State<AppState>,
    user: UserContext,
    Path(student_id): Path<String>,
) -> AppResult<Json<Value>> {
    require_role(&user, Role::Academic)?;

    let deleted = state.predictions.delete_by_student_id(&student_id).await?;
    tracing::info!(
        "Predictions of student {} purged by {} ({} records)",
        normalize_student_id(&student_id), user.username, deleted
    );
    Ok(Json(json!({ "deleted": deleted })))
}

pub async fn delete_record(
    State(state): State<AppState>,
    user: UserContext,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    require_role(&user, Role::Academic)?;

    let deleted = state.predictions.delete_by_record_id(id).await?;
    if deleted == 0 {
        return Err(AppError::NotFound("Prediction not found".to_string()));
    }
    Ok(Json(json!({ "deleted": deleted })))
}
