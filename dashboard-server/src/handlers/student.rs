//! Student handlers

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use prediction_core::report::student_history;
use prediction_core::{PredictionError, PredictionRecord, RawFeatures, StudentProfile};

use crate::{AppState, AppResult};
use crate::middleware::auth::{require_role, UserContext};
use crate::models::Role;

#[derive(Debug, Serialize)]
pub struct StudentDashboard {
    pub profile: StudentProfile,
    pub latest: Option<PredictionRecord>,
    /// Oldest first
    pub history: Vec<PredictionRecord>,
}

/// Own profile and prediction history
pub async fn dashboard(
    State(state): State<AppState>,
    user: UserContext,
) -> AppResult<Json<StudentDashboard>> {
    require_role(&user, Role::Student)?;

    let profile = state
        .profiles
        .lookup(&user.username)
        .await?
        .ok_or_else(|| PredictionError::ProfileNotFound { username: user.username.clone() })?;

    let records = state.predictions.load_all().await?;
    let history = student_history(&records, &profile.student_id);

    Ok(Json(StudentDashboard {
        latest: history.last().cloned(),
        profile,
        history,
    }))
}

/// Run and persist a prediction for the logged-in student
pub async fn predict(
    State(state): State<AppState>,
    user: UserContext,
    Json(raw): Json<RawFeatures>,
) -> AppResult<(StatusCode, Json<PredictionRecord>)> {
    require_role(&user, Role::Student)?;

    let record = state
        .service
        .predict_and_save(state.predictions.as_ref(), &user.username, &raw)
        .await?;

    Ok((StatusCode::CREATED, Json(record)))
}
