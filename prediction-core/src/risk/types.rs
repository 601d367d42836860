//! Risk Types
//!
//! Core data structures for risk tiering. No decision logic here.

use serde::{Deserialize, Serialize};

// ============================================================================
// RISK TIER
// ============================================================================

/// Risk of not graduating on time.
///
/// The string forms are part of the export contract consumed by reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskTier {
    #[serde(rename = "Low Risk")]
    Low,
    #[serde(rename = "Medium Risk")]
    Medium,
    #[serde(rename = "High Risk")]
    High,
}

impl RiskTier {
    pub const ALL: [RiskTier; 3] = [RiskTier::Low, RiskTier::Medium, RiskTier::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTier::Low => "Low Risk",
            RiskTier::Medium => "Medium Risk",
            RiskTier::High => "High Risk",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.as_str() == s.trim())
    }

    /// Fixed advice shown next to the tier
    pub fn recommendation(&self) -> &'static str {
        match self {
            RiskTier::Low => {
                "Maintain your academic performance and keep your study habits consistent."
            }
            RiskTier::Medium => {
                "Regular academic counseling is advised, together with a review of study strategy."
            }
            RiskTier::High => {
                "Intervention needed: counseling, intensive mentoring and periodic monitoring."
            }
        }
    }
}

impl std::fmt::Display for RiskTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// BOOSTS
// ============================================================================

/// Auxiliary signal that raised the calibrated probability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoostReason {
    GpaExcellent,
    GpaHigh,
    AttendanceExcellent,
    AttendanceHigh,
    NoRepeatedCourses,
    HighCreditLoad,
}

/// One fired boost
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AppliedBoost {
    pub reason: BoostReason,
    pub amount: f64,
}

/// Outcome of the probability adjustment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Adjustment {
    /// Calibrated model probability, 0.0 - 1.0
    pub base: f64,
    /// Sum of fired boosts
    pub total_boost: f64,
    /// `min(base + total_boost, ceiling)`, 0.0 - ceiling
    pub adjusted: f64,
    pub applied: Vec<AppliedBoost>,
}

impl Adjustment {
    pub fn was_capped(&self) -> bool {
        self.base + self.total_boost > self.adjusted
    }
}

// ============================================================================
// ASSESSMENT
// ============================================================================

/// Probability on the 0-100 scale with the tier derived from it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub probability_percent: f64,
    pub tier: RiskTier,
    pub recommendation: String,
    pub adjustment: Adjustment,
}
