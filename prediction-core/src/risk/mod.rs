//! Risk Module
//!
//! Turns a calibrated probability into an adjusted percentage, a risk tier
//! and a recommendation.
//!
//! ## Structure
//! - `types`: RiskTier, Adjustment, RiskAssessment
//! - `rules`: softboost table and tier thresholds
//! - `adjuster`: softboost
//! - `classifier`: tier mapping and the combined assessment
//!
//! ## Usage
//! ```ignore
//! use prediction_core::risk::{assess, RiskTier};
//!
//! let assessment = assess(probability, &features);
//! match assessment.tier {
//!     RiskTier::Low => println!("On track"),
//!     RiskTier::Medium => println!("Counseling"),
//!     RiskTier::High => println!("Mentoring"),
//! }
//! ```

pub mod types;
pub mod rules;
pub mod adjuster;
pub mod classifier;

pub use types::{Adjustment, AppliedBoost, BoostReason, RiskAssessment, RiskTier};
pub use rules::{LOW_RISK_MIN_PERCENT, MEDIUM_RISK_MIN_PERCENT, PROBABILITY_CEILING};
pub use adjuster::adjust;
pub use classifier::{assess, classify_risk, to_percent};
