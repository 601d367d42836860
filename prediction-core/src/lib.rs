//! On-time graduation prediction pipeline
//!
//! raw inputs -> Classifier -> Adjuster -> Tier Mapper -> PredictionRecord
//!
//! The classifier is loaded once and shared read-only. Records are
//! immutable; persistence and profile lookup sit behind the traits in
//! [`store`].

pub mod constants;
pub mod error;
pub mod features;
pub mod model;
pub mod prediction;
pub mod report;
pub mod risk;
pub mod store;

pub use error::{PredictionError, PredictionResult, StoreError, ValidationError};
pub use features::{FeatureName, FeatureOrder, FeatureVector, RawFeatures};
pub use model::{Classifier, EngineStatus, ProbabilityModel};
pub use prediction::{
    normalize_student_id, BatchError, BatchReport, BatchRowResult, PredictionRecord,
    PredictionService, RowError, StudentProfile,
};
pub use report::{RiskDistribution, RiskSummary};
pub use risk::{RiskAssessment, RiskTier};
pub use store::{PredictionStore, ProfileDirectory};
