//! Feature Layout - Centralized Feature Definition
//!
//! The classifier consumes exactly four academic metrics. Their order is a
//! property of the trained model: a model that carries field-order metadata
//! dictates it, everything else falls back to `DEFAULT_FEATURE_ORDER`.

use serde::{Deserialize, Serialize};

// ============================================================================
// FEATURE NAMES
// ============================================================================

/// One of the four model inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureName {
    Gpa,
    CreditsPassed,
    AttendancePercent,
    RepeatCount,
}

impl FeatureName {
    pub const ALL: [FeatureName; FEATURE_COUNT] = [
        FeatureName::Gpa,
        FeatureName::CreditsPassed,
        FeatureName::AttendancePercent,
        FeatureName::RepeatCount,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureName::Gpa => "gpa",
            FeatureName::CreditsPassed => "credits_passed",
            FeatureName::AttendancePercent => "attendance_percent",
            FeatureName::RepeatCount => "repeat_count",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.as_str() == name.trim())
    }
}

impl std::fmt::Display for FeatureName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Total number of features
pub const FEATURE_COUNT: usize = 4;

/// Order used when the loaded model does not expose its own
pub const DEFAULT_FEATURE_ORDER: [FeatureName; FEATURE_COUNT] = [
    FeatureName::Gpa,
    FeatureName::RepeatCount,
    FeatureName::AttendancePercent,
    FeatureName::CreditsPassed,
];

// ============================================================================
// FEATURE ORDER
// ============================================================================

/// Validated permutation of the four features
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeatureOrder([FeatureName; FEATURE_COUNT]);

impl FeatureOrder {
    pub fn fallback() -> Self {
        Self(DEFAULT_FEATURE_ORDER)
    }

    /// Build an order from model metadata.
    ///
    /// Every feature must appear exactly once.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, LayoutMismatchError> {
        let mismatch = || LayoutMismatchError {
            found: names.iter().map(|n| n.as_ref().to_string()).collect(),
        };

        if names.len() != FEATURE_COUNT {
            return Err(mismatch());
        }

        let mut order = DEFAULT_FEATURE_ORDER;
        for (slot, name) in order.iter_mut().zip(names) {
            *slot = FeatureName::parse(name.as_ref()).ok_or_else(mismatch)?;
        }

        for feature in FeatureName::ALL {
            if !order.contains(&feature) {
                return Err(mismatch());
            }
        }

        Ok(Self(order))
    }

    /// Resolve the order for a model: its metadata if present, else the fallback
    pub fn resolve(model_names: Option<&[String]>) -> Result<Self, LayoutMismatchError> {
        match model_names {
            Some(names) => Self::from_names(names),
            None => Ok(Self::fallback()),
        }
    }

    pub fn as_slice(&self) -> &[FeatureName] {
        &self.0
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.0.iter().map(FeatureName::as_str).collect()
    }
}

impl Default for FeatureOrder {
    fn default() -> Self {
        Self::fallback()
    }
}

// ============================================================================
// LAYOUT VALIDATION
// ============================================================================

/// Model metadata does not name exactly the four known features
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("feature layout mismatch: model declares {found:?}, expected a permutation of gpa, credits_passed, attendance_percent, repeat_count")]
pub struct LayoutMismatchError {
    pub found: Vec<String>,
}

// ============================================================================
// TESTS
// ============================================================================
