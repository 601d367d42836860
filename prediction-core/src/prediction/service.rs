//! Prediction Orchestrator
//!
//! profile lookup -> coercion -> score -> adjust -> tier -> record

use std::sync::Arc;

use crate::error::{PredictionError, PredictionResult};
use crate::features::{FeatureVector, RawFeatures};
use crate::model::Classifier;
use crate::risk::{assess, RiskAssessment};
use crate::store::{PredictionStore, ProfileDirectory};

use super::record::{PredictionRecord, StudentProfile};

/// Stateless apart from its shared collaborators; cheap to clone
#[derive(Clone)]
pub struct PredictionService {
    classifier: Arc<Classifier>,
    profiles: Arc<dyn ProfileDirectory>,
}

impl PredictionService {
    pub fn new(classifier: Arc<Classifier>, profiles: Arc<dyn ProfileDirectory>) -> Self {
        Self { classifier, profiles }
    }

    pub fn classifier(&self) -> &Arc<Classifier> {
        &self.classifier
    }

    /// Score an already coerced vector and tier the adjusted result
    pub fn assess_features(&self, features: &FeatureVector) -> PredictionResult<RiskAssessment> {
        let probability = self.classifier.score(features)?;
        Ok(assess(probability, features))
    }

    /// Single prediction for an authenticated identity. Nothing is persisted.
    pub async fn predict(&self, username: &str, raw: &RawFeatures) -> PredictionResult<PredictionRecord> {
        let profile = self
            .profiles
            .lookup(username)
            .await?
            .ok_or_else(|| PredictionError::ProfileNotFound {
                username: username.to_string(),
            })?;

        self.predict_for_profile(username, &profile, raw)
    }

    /// Scoring chain for a caller-supplied profile (batch rows)
    pub fn predict_for_profile(
        &self,
        owner: &str,
        profile: &StudentProfile,
        raw: &RawFeatures,
    ) -> PredictionResult<PredictionRecord> {
        let features = raw.coerce()?;
        let assessment = self.assess_features(&features)?;
        let record = PredictionRecord::create(owner, profile, &features, &assessment);

        log::info!(
            "Prediction {} for student {}: {:.2}% ({})",
            record.id,
            record.student_id,
            record.probability,
            record.risk
        );

        Ok(record)
    }

    /// `predict` followed by `save`. Store errors propagate unchanged.
    pub async fn predict_and_save(
        &self,
        store: &dyn PredictionStore,
        username: &str,
        raw: &RawFeatures,
    ) -> PredictionResult<PredictionRecord> {
        let record = self.predict(username, raw).await?;
        store.save(&record).await?;
        Ok(record)
    }
}
