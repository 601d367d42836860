//! Probability Adjuster (softboost)
//!
//! Deterministic additive boosts on top of the calibrated probability.
//! Applied exactly once per prediction.

use super::rules::*;
use super::types::{Adjustment, AppliedBoost, BoostReason};
use crate::features::FeatureVector;

/// Boosts that fire for these features, in table order
pub fn boosts_for(features: &FeatureVector) -> Vec<AppliedBoost> {
    let mut applied = Vec::with_capacity(4);

    if features.gpa >= GPA_EXCELLENT_MIN {
        applied.push(AppliedBoost { reason: BoostReason::GpaExcellent, amount: GPA_EXCELLENT_BOOST });
    } else if features.gpa >= GPA_HIGH_MIN {
        applied.push(AppliedBoost { reason: BoostReason::GpaHigh, amount: GPA_HIGH_BOOST });
    }

    if features.attendance_percent >= ATTENDANCE_EXCELLENT_MIN {
        applied.push(AppliedBoost {
            reason: BoostReason::AttendanceExcellent,
            amount: ATTENDANCE_EXCELLENT_BOOST,
        });
    } else if features.attendance_percent >= ATTENDANCE_HIGH_MIN {
        applied.push(AppliedBoost { reason: BoostReason::AttendanceHigh, amount: ATTENDANCE_HIGH_BOOST });
    }

    if features.repeat_count == 0 {
        applied.push(AppliedBoost { reason: BoostReason::NoRepeatedCourses, amount: NO_REPEAT_BOOST });
    }

    if features.credits_passed >= CREDIT_LOAD_MIN {
        applied.push(AppliedBoost { reason: BoostReason::HighCreditLoad, amount: CREDIT_LOAD_BOOST });
    }

    applied
}

/// `min(probability + boosts, PROBABILITY_CEILING)`.
///
/// The ceiling holds even when the model already returned 1.0.
pub fn adjust(probability: f64, features: &FeatureVector) -> Adjustment {
    let applied = boosts_for(features);
    let total_boost: f64 = applied.iter().map(|b| b.amount).sum();
    let adjusted = (probability + total_boost).clamp(0.0, PROBABILITY_CEILING);

    if !applied.is_empty() {
        log::debug!(
            "softboost: base={:.4} boost={:.2} adjusted={:.4}",
            probability,
            total_boost,
            adjusted
        );
    }

    Adjustment {
        base: probability,
        total_boost,
        adjusted,
        applied,
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn reasons(adj: &Adjustment) -> Vec<BoostReason> {
        adj.applied.iter().map(|b| b.reason).collect()
    }

    #[test]
    fn test_no_boosts() {
        let adj = adjust(0.50, &FeatureVector::new(3.2, 90, 80, 2));
        assert!(adj.applied.is_empty());
        assert!((adj.adjusted - 0.50).abs() < EPS);
    }

    #[test]
    fn test_only_higher_tier_fires_per_dimension() {
        let adj = adjust(0.10, &FeatureVector::new(3.95, 100, 99, 3));
        assert_eq!(reasons(&adj), vec![BoostReason::GpaExcellent, BoostReason::AttendanceExcellent]);
        assert!((adj.total_boost - 0.22).abs() < EPS);
    }

    #[test]
    fn test_lower_tiers() {
        let adj = adjust(0.55, &FeatureVector::new(3.75, 100, 96, 1));
        assert_eq!(reasons(&adj), vec![BoostReason::GpaHigh, BoostReason::AttendanceHigh]);
        assert!((adj.adjusted - 0.67).abs() < EPS);
    }

    #[test]
    fn test_tier_boundaries_inclusive() {
        let adj = adjust(0.0, &FeatureVector::new(3.9, 140, 98, 1));
        assert_eq!(
            reasons(&adj),
            vec![BoostReason::GpaExcellent, BoostReason::AttendanceExcellent, BoostReason::HighCreditLoad]
        );

        let adj = adjust(0.0, &FeatureVector::new(3.7, 139, 95, 1));
        assert_eq!(reasons(&adj), vec![BoostReason::GpaHigh, BoostReason::AttendanceHigh]);

        let adj = adjust(0.0, &FeatureVector::new(3.69, 139, 94, 1));
        assert!(adj.applied.is_empty());
    }

    #[test]
    fn test_all_boosts_capped() {
        let adj = adjust(0.70, &FeatureVector::new(3.95, 145, 99, 0));
        assert!((adj.total_boost - 0.30).abs() < EPS);
        assert_eq!(adj.adjusted, PROBABILITY_CEILING);
        assert!(adj.was_capped());
    }

    #[test]
    fn test_ceiling_holds_for_certain_model_output() {
        let adj = adjust(1.0, &FeatureVector::new(2.0, 10, 50, 4));
        assert_eq!(adj.adjusted, PROBABILITY_CEILING);

        let adj = adjust(1.0, &FeatureVector::new(4.0, 150, 100, 0));
        assert_eq!(adj.adjusted, PROBABILITY_CEILING);
    }

    #[test]
    fn test_adjusted_always_within_bounds() {
        let gpas = [0.0, 2.5, 3.7, 3.9, 4.0];
        let attendance = [0, 60, 95, 98, 100];
        let repeats = [0, 1, 5];
        let credits = [0, 100, 140];
        let bases = [0.0, 0.3, 0.85, 0.99, 1.0];

        for &gpa in &gpas {
            for &att in &attendance {
                for &rep in &repeats {
                    for &cr in &credits {
                        for &base in &bases {
                            let adj = adjust(base, &FeatureVector::new(gpa, cr, att, rep));
                            assert!(adj.adjusted >= 0.0);
                            assert!(adj.adjusted <= PROBABILITY_CEILING);
                        }
                    }
                }
            }
        }
    }
}
