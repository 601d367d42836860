//! Risk Rules & Thresholds
//!
//! Constants for the softboost table and the tier cut-offs.
//! No classification logic here.

// ============================================================================
// SOFTBOOST TABLE
// ============================================================================

/// GPA tiers (mutually exclusive, higher wins)
pub const GPA_EXCELLENT_MIN: f64 = 3.9;
pub const GPA_EXCELLENT_BOOST: f64 = 0.12;
pub const GPA_HIGH_MIN: f64 = 3.7;
pub const GPA_HIGH_BOOST: f64 = 0.07;

/// Attendance tiers (mutually exclusive, higher wins)
pub const ATTENDANCE_EXCELLENT_MIN: i32 = 98;
pub const ATTENDANCE_EXCELLENT_BOOST: f64 = 0.10;
pub const ATTENDANCE_HIGH_MIN: i32 = 95;
pub const ATTENDANCE_HIGH_BOOST: f64 = 0.05;

/// No failed or repeated courses
pub const NO_REPEAT_BOOST: f64 = 0.05;

/// Credit load
pub const CREDIT_LOAD_MIN: i32 = 140;
pub const CREDIT_LOAD_BOOST: f64 = 0.03;

/// Hard cap on the adjusted probability
pub const PROBABILITY_CEILING: f64 = 0.985;

// ============================================================================
// TIER THRESHOLDS (0-100 scale, inclusive lower bounds)
// ============================================================================

/// At or above this percentage = Low Risk
pub const LOW_RISK_MIN_PERCENT: f64 = 85.0;

/// At or above this percentage = Medium Risk
pub const MEDIUM_RISK_MIN_PERCENT: f64 = 60.0;
