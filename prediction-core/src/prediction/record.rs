//! Prediction record and student profile value types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::features::FeatureVector;
use crate::risk::{RiskAssessment, RiskTier};

/// Trim a student id and drop the trailing `.0` spreadsheets add to
/// numeric cells.
pub fn normalize_student_id(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed.strip_suffix(".0").unwrap_or(trimmed).trim_end().to_string()
}

/// Read-only student profile, resolved by username
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentProfile {
    pub name: String,
    pub student_id: String,
    pub program: String,
    pub cohort: String,
    pub class_code: String,
}

impl StudentProfile {
    pub fn new(
        name: impl Into<String>,
        student_id: &str,
        program: impl Into<String>,
        cohort: impl Into<String>,
        class_code: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            student_id: normalize_student_id(student_id),
            program: program.into(),
            cohort: cohort.into(),
            class_code: class_code.into(),
        }
    }
}

/// Result of one scoring request. Immutable once created.
///
/// Field names are the contract consumed by reporting and export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub id: Uuid,
    pub username: String,
    pub student_name: String,
    pub student_id: String,
    pub program: String,
    pub cohort: String,
    pub class_code: String,
    pub gpa: f64,
    pub repeat_count: i32,
    pub attendance_percent: i32,
    pub credits_passed: i32,
    /// 0-100 scale, two decimals, never above 98.5
    pub probability: f64,
    pub risk: RiskTier,
    pub recommendation: String,
    pub created_at: DateTime<Utc>,
}

impl PredictionRecord {
    /// Assemble a fresh record with a new random id and the current time
    pub fn create(
        username: impl Into<String>,
        profile: &StudentProfile,
        features: &FeatureVector,
        assessment: &RiskAssessment,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            student_name: profile.name.clone(),
            student_id: normalize_student_id(&profile.student_id),
            program: profile.program.clone(),
            cohort: profile.cohort.clone(),
            class_code: profile.class_code.clone(),
            gpa: features.gpa,
            repeat_count: features.repeat_count,
            attendance_percent: features.attendance_percent,
            credits_passed: features.credits_passed,
            probability: assessment.probability_percent,
            risk: assessment.tier,
            recommendation: assessment.recommendation.clone(),
            created_at: Utc::now(),
        }
    }

    pub fn features(&self) -> FeatureVector {
        FeatureVector::new(self.gpa, self.credits_passed, self.attendance_percent, self.repeat_count)
    }

    pub fn profile(&self) -> StudentProfile {
        StudentProfile {
            name: self.student_name.clone(),
            student_id: self.student_id.clone(),
            program: self.program.clone(),
            cohort: self.cohort.clone(),
            class_code: self.class_code.clone(),
        }
    }

    pub fn is_high_risk(&self) -> bool {
        self.risk == RiskTier::High
    }
}
