//! Inference Engine - Classifier lifecycle and scoring
//!
//! The trained model is loaded once at start-up. A failed load does not
//! abort anything: the classifier stays in an explicit unavailable state
//! and every scoring call returns `ModelUnavailable` with the original cause.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::error::PredictionError;
use crate::features::{FeatureOrder, FeatureVector};

// ============================================================================
// ERROR HANDLING
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("InferenceError: {0}")]
pub struct InferenceError(pub String);

// ============================================================================
// MODEL TRAIT
// ============================================================================

/// Opaque binary scoring function ("graduates on time" is class 1).
///
/// Rows arrive in the order reported by `feature_names`, or in the default
/// order when the model does not report one.
pub trait ProbabilityModel: Send + Sync {
    /// Short model family name for status output
    fn kind(&self) -> &'static str;

    /// Does the model expose class probabilities?
    fn supports_probability(&self) -> bool {
        true
    }

    /// Probability of the positive class
    fn predict_proba(&self, row: &[f64]) -> Result<f64, InferenceError>;

    /// Hard class label (0 or 1)
    fn predict_class(&self, row: &[f64]) -> Result<u8, InferenceError> {
        Ok(u8::from(self.predict_proba(row)? >= 0.5))
    }

    /// Field order used at training time, if the artifact carries it
    fn feature_names(&self) -> Option<Vec<String>> {
        None
    }
}

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// Model metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub model_path: String,
    pub model_kind: String,
    pub feature_order: Vec<String>,
    pub order_from_model: bool,
    pub probability_output: bool,
    pub loaded_at: DateTime<Utc>,
}

/// Engine status for health output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStatus {
    pub model_loaded: bool,
    pub model_name: String,
    pub feature_order: Vec<String>,
    pub scoring_count: u64,
    pub unavailable_cause: Option<String>,
}

enum ModelState {
    Ready {
        model: Box<dyn ProbabilityModel>,
        order: FeatureOrder,
        metadata: ModelMetadata,
    },
    Unavailable {
        cause: String,
    },
}

// ============================================================================
// CLASSIFIER
// ============================================================================

/// Loaded-once, read-only classifier. Safe to share across threads.
pub struct Classifier {
    state: ModelState,
    scoring_count: AtomicU64,
}

impl Classifier {
    /// Load a model artifact from disk. Never fails; see `is_available`.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        log::info!("Loading graduation model from: {}", path.display());

        match super::load_model(path) {
            Ok(model) => Self::with_source(model, &path.display().to_string()),
            Err(e) => {
                log::warn!("Graduation model unavailable ({}): {}", path.display(), e);
                Self::unavailable(e.to_string())
            }
        }
    }

    /// Wrap an already constructed model
    pub fn from_model(model: Box<dyn ProbabilityModel>) -> Self {
        Self::with_source(model, "<memory>")
    }

    fn with_source(model: Box<dyn ProbabilityModel>, source: &str) -> Self {
        let names = model.feature_names();
        let order = match FeatureOrder::resolve(names.as_deref()) {
            Ok(order) => order,
            Err(e) => {
                log::warn!("Graduation model rejected: {}", e);
                return Self::unavailable(e.to_string());
            }
        };

        let metadata = ModelMetadata {
            model_path: source.to_string(),
            model_kind: model.kind().to_string(),
            feature_order: order.names().into_iter().map(String::from).collect(),
            order_from_model: names.is_some(),
            probability_output: model.supports_probability(),
            loaded_at: Utc::now(),
        };

        log::info!(
            "Graduation model ready: kind={} order={:?} (from model: {})",
            metadata.model_kind,
            metadata.feature_order,
            metadata.order_from_model
        );

        Self {
            state: ModelState::Ready { model, order, metadata },
            scoring_count: AtomicU64::new(0),
        }
    }

    /// Explicit "no model" sentinel
    pub fn unavailable(cause: impl Into<String>) -> Self {
        Self {
            state: ModelState::Unavailable { cause: cause.into() },
            scoring_count: AtomicU64::new(0),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self.state, ModelState::Ready { .. })
    }

    pub fn unavailable_cause(&self) -> Option<&str> {
        match &self.state {
            ModelState::Ready { .. } => None,
            ModelState::Unavailable { cause } => Some(cause),
        }
    }

    /// Fail fast with the recorded cause when no model is loaded
    pub fn ensure_available(&self) -> Result<(), PredictionError> {
        match &self.state {
            ModelState::Ready { .. } => Ok(()),
            ModelState::Unavailable { cause } => Err(PredictionError::model_unavailable(cause.clone())),
        }
    }

    pub fn feature_order(&self) -> Option<FeatureOrder> {
        match &self.state {
            ModelState::Ready { order, .. } => Some(*order),
            ModelState::Unavailable { .. } => None,
        }
    }

    pub fn metadata(&self) -> Option<&ModelMetadata> {
        match &self.state {
            ModelState::Ready { metadata, .. } => Some(metadata),
            ModelState::Unavailable { .. } => None,
        }
    }

    /// Calibrated probability, 0.0 - 1.0, that the student graduates on time.
    ///
    /// Models without a probability interface contribute their hard label
    /// as 0.0 or 1.0.
    pub fn score(&self, features: &FeatureVector) -> Result<f64, PredictionError> {
        let (model, order) = match &self.state {
            ModelState::Ready { model, order, .. } => (model, order),
            ModelState::Unavailable { cause } => {
                return Err(PredictionError::model_unavailable(cause.clone()));
            }
        };

        let row = features.to_model_row(order);

        let raw = if model.supports_probability() {
            model.predict_proba(&row)
        } else {
            model.predict_class(&row).map(|label| if label >= 1 { 1.0 } else { 0.0 })
        }
        .map_err(|e| PredictionError::model_unavailable(e.to_string()))?;

        if !raw.is_finite() {
            return Err(PredictionError::model_unavailable(format!(
                "model returned a non-finite score ({})",
                raw
            )));
        }

        self.scoring_count.fetch_add(1, Ordering::Relaxed);
        Ok(raw.clamp(0.0, 1.0))
    }

    pub fn status(&self) -> EngineStatus {
        let scoring_count = self.scoring_count.load(Ordering::Relaxed);
        match &self.state {
            ModelState::Ready { metadata, .. } => EngineStatus {
                model_loaded: true,
                model_name: format!("{} ({})", metadata.model_path, metadata.model_kind),
                feature_order: metadata.feature_order.clone(),
                scoring_count,
                unavailable_cause: None,
            },
            ModelState::Unavailable { cause } => EngineStatus {
                model_loaded: false,
                model_name: "None".to_string(),
                feature_order: vec![],
                scoring_count,
                unavailable_cause: Some(cause.clone()),
            },
        }
    }
}

impl std::fmt::Debug for Classifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Classifier")
            .field("available", &self.is_available())
            .field("unavailable_cause", &self.unavailable_cause())
            .finish()
    }
}

// ============================================================================
// PROCESS-WIDE INSTANCE
// ============================================================================

static CLASSIFIER: OnceCell<Arc<Classifier>> = OnceCell::new();

/// Install the process-wide classifier. Later calls keep the first instance.
pub fn init(path: impl AsRef<Path>) -> Arc<Classifier> {
    CLASSIFIER
        .get_or_init(|| Arc::new(Classifier::load(path)))
        .clone()
}

/// The process-wide classifier, or an unavailable one before `init`
pub fn global() -> Arc<Classifier> {
    CLASSIFIER
        .get()
        .cloned()
        .unwrap_or_else(|| Arc::new(Classifier::unavailable("classifier not initialised")))
}

// ============================================================================
// TESTS
// ============================================================================
