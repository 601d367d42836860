//! Feature Vector - Core data structure for ML input
//!
//! `RawFeatures` is what arrives from a form, a JSON body or a CSV cell.
//! `FeatureVector` is the coerced, typed form the pipeline works on.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::layout::{FeatureName, FeatureOrder, FEATURE_COUNT};
use crate::error::ValidationError;

// ============================================================================
// TYPED FEATURE VECTOR
// ============================================================================

/// The four academic metrics, coerced to their numeric types.
///
/// Ranges are advisory: out-of-range values are kept as given.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub gpa: f64,
    pub credits_passed: i32,
    pub attendance_percent: i32,
    pub repeat_count: i32,
}

impl FeatureVector {
    pub fn new(gpa: f64, credits_passed: i32, attendance_percent: i32, repeat_count: i32) -> Self {
        Self {
            gpa,
            credits_passed,
            attendance_percent,
            repeat_count,
        }
    }

    /// Get feature by name
    pub fn get(&self, feature: FeatureName) -> f64 {
        match feature {
            FeatureName::Gpa => self.gpa,
            FeatureName::CreditsPassed => self.credits_passed as f64,
            FeatureName::AttendancePercent => self.attendance_percent as f64,
            FeatureName::RepeatCount => self.repeat_count as f64,
        }
    }

    /// Lay the values out in the order the model was trained on
    pub fn to_model_row(&self, order: &FeatureOrder) -> [f64; FEATURE_COUNT] {
        let mut row = [0.0f64; FEATURE_COUNT];
        for (slot, feature) in row.iter_mut().zip(order.as_slice()) {
            *slot = self.get(*feature);
        }
        row
    }
}

// ============================================================================
// RAW INPUT
// ============================================================================

/// Uncoerced inputs. Missing fields deserialize as `null` and fail coercion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawFeatures {
    #[serde(default)]
    pub gpa: Value,
    #[serde(default)]
    pub repeat_count: Value,
    #[serde(default)]
    pub attendance_percent: Value,
    #[serde(default)]
    pub credits_passed: Value,
}

impl RawFeatures {
    /// Build from text cells (CSV rows, form fields)
    pub fn from_text(gpa: &str, repeat_count: &str, attendance_percent: &str, credits_passed: &str) -> Self {
        Self {
            gpa: Value::String(gpa.to_string()),
            repeat_count: Value::String(repeat_count.to_string()),
            attendance_percent: Value::String(attendance_percent.to_string()),
            credits_passed: Value::String(credits_passed.to_string()),
        }
    }

    /// Coerce every field, failing on the first one that is not numeric
    pub fn coerce(&self) -> Result<FeatureVector, ValidationError> {
        let gpa = coerce_real(FeatureName::Gpa, &self.gpa)?;
        let repeat_count = coerce_integer(FeatureName::RepeatCount, &self.repeat_count)?;
        let attendance_percent = coerce_integer(FeatureName::AttendancePercent, &self.attendance_percent)?;
        let credits_passed = coerce_integer(FeatureName::CreditsPassed, &self.credits_passed)?;

        Ok(FeatureVector {
            gpa,
            credits_passed,
            attendance_percent,
            repeat_count,
        })
    }
}

fn coerce_real(feature: FeatureName, value: &Value) -> Result<f64, ValidationError> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match parsed {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(ValidationError::not_numeric(feature.as_str(), value)),
    }
}

fn coerce_integer(feature: FeatureName, value: &Value) -> Result<i32, ValidationError> {
    let parsed = match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };

    parsed
        .and_then(|v| i32::try_from(v).ok())
        .ok_or_else(|| ValidationError::not_numeric(feature.as_str(), value))
}

// ============================================================================
// TESTS
// ============================================================================
