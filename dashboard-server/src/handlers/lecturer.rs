//! Lecturer handlers

use std::collections::BTreeSet;

use axum::{extract::{Query, State}, Json};
use serde::{Deserialize, Serialize};

use prediction_core::report::{latest_high_risk, newest_first, RecordFilter};
use prediction_core::{PredictionRecord, RiskSummary};

use crate::{AppState, AppResult};
use crate::middleware::auth::{require_role, UserContext};
use crate::models::{Role, Student};

#[derive(Debug, Deserialize)]
pub struct LecturerQuery {
    pub class: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LecturerDashboard {
    pub students: Vec<Student>,
    pub classes: Vec<String>,
    pub selected_class: Option<String>,
    /// Newest first
    pub records: Vec<PredictionRecord>,
    pub summary: RiskSummary,
    pub high_risk: Vec<PredictionRecord>,
}

/// Predictions of advised students, optionally narrowed to one class
pub async fn dashboard(
    State(state): State<AppState>,
    user: UserContext,
    Query(query): Query<LecturerQuery>,
) -> AppResult<Json<LecturerDashboard>> {
    require_role(&user, Role::Lecturer)?;

    let students = Student::list_by_advisor(&state.pool, user.user_id).await?;
    let classes: Vec<String> = students
        .iter()
        .map(|s| s.class_code.clone())
        .filter(|c| !c.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let selected_class = query
        .class
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());

    let mut filter = RecordFilter::default().students(students.iter().map(|s| s.student_id.as_str()));
    if let Some(class) = &selected_class {
        filter = filter.class_code(class.clone());
    }

    let records = newest_first(filter.apply(state.predictions.load_all().await?));
    let summary = RiskSummary::from_records(&records);
    let high_risk = latest_high_risk(&records);

    Ok(Json(LecturerDashboard {
        students,
        classes,
        selected_class,
        records,
        summary,
        high_risk,
    }))
}
