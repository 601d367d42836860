//! Risk Tier Mapper
//!
//! Input: calibrated probability + features
//! Output: RiskAssessment (adjusted percentage, tier, recommendation)

use super::adjuster::adjust;
use super::rules::{LOW_RISK_MIN_PERCENT, MEDIUM_RISK_MIN_PERCENT};
use super::types::{RiskAssessment, RiskTier};
use crate::features::FeatureVector;

// ============================================================================
// TIERING
// ============================================================================

/// Tier for a probability on the 0-100 scale.
/// Lower bounds are inclusive: exactly 85.0 is Low, exactly 60.0 is Medium
pub fn classify_risk(probability_percent: f64) -> (RiskTier, &'static str) {
    let tier = if probability_percent >= LOW_RISK_MIN_PERCENT {
        RiskTier::Low
    } else if probability_percent >= MEDIUM_RISK_MIN_PERCENT {
        RiskTier::Medium
    } else {
        RiskTier::High
    };

    (tier, tier.recommendation())
}

/// 0-1 probability to the stored 0-100 scale, two decimals
pub fn to_percent(probability: f64) -> f64 {
    (probability * 10_000.0).round() / 100.0
}

// ============================================================================
// ASSESSMENT
// ============================================================================

/// Adjust, scale and tier a calibrated probability.
///
/// The tier is taken from the rounded percentage that gets stored, so a
/// persisted record never disagrees with itself.
pub fn assess(probability: f64, features: &FeatureVector) -> RiskAssessment {
    let adjustment = adjust(probability, features);
    let probability_percent = to_percent(adjustment.adjusted);
    let (tier, recommendation) = classify_risk(probability_percent);

    RiskAssessment {
        probability_percent,
        tier,
        recommendation: recommendation.to_string(),
        adjustment,
    }
}

// ============================================================================
// TESTS
// ============================================================================
