//! JSON model artifacts
//!
//! Two families are understood:
//! - `calibrated_forest`: decision trees whose leaves hold the positive-class
//!   fraction, averaged and passed through a sigmoid (Platt) calibration.
//! - `logistic`: linear model over the four features.
//!
//! Splits follow the usual convention: `row[feature] <= threshold` goes left.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::inference::{InferenceError, ProbabilityModel};
use crate::features::FEATURE_COUNT;

// ============================================================================
// ARTIFACT FORMAT
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    CalibratedForest(ForestModel),
    Logistic(LogisticModel),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestModel {
    #[serde(default)]
    pub feature_names: Option<Vec<String>>,
    pub trees: Vec<DecisionTree>,
    #[serde(default)]
    pub calibration: Option<SigmoidCalibration>,
    /// `false` for label-only exports
    #[serde(default = "default_true")]
    pub probability_output: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

/// p = 1 / (1 + exp(a * f + b))
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SigmoidCalibration {
    pub a: f64,
    pub b: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticModel {
    #[serde(default)]
    pub feature_names: Option<Vec<String>>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

fn default_true() -> bool {
    true
}

// ============================================================================
// LOADING
// ============================================================================

/// Read and validate a JSON artifact
pub fn load_json_model(path: &Path) -> Result<Box<dyn ProbabilityModel>, InferenceError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| InferenceError(format!("Failed to read model {}: {}", path.display(), e)))?;
    parse_json_model(&raw)
}

pub fn parse_json_model(raw: &str) -> Result<Box<dyn ProbabilityModel>, InferenceError> {
    let artifact: ModelArtifact = serde_json::from_str(raw)
        .map_err(|e| InferenceError(format!("Invalid model artifact: {}", e)))?;

    match artifact {
        ModelArtifact::CalibratedForest(forest) => {
            forest.validate()?;
            Ok(Box::new(forest))
        }
        ModelArtifact::Logistic(model) => {
            model.validate()?;
            Ok(Box::new(model))
        }
    }
}

// ============================================================================
// CALIBRATED FOREST
// ============================================================================

impl ForestModel {
    fn validate(&self) -> Result<(), InferenceError> {
        if self.trees.is_empty() {
            return Err(InferenceError("Forest has no trees".to_string()));
        }
        for (t, tree) in self.trees.iter().enumerate() {
            tree.validate().map_err(|e| InferenceError(format!("Tree {}: {}", t, e.0)))?;
        }
        Ok(())
    }

    fn mean_leaf_value(&self, row: &[f64]) -> Result<f64, InferenceError> {
        let mut total = 0.0;
        for tree in &self.trees {
            total += tree.evaluate(row)?;
        }
        Ok(total / self.trees.len() as f64)
    }
}

impl DecisionTree {
    fn validate(&self) -> Result<(), InferenceError> {
        if self.nodes.is_empty() {
            return Err(InferenceError("empty tree".to_string()));
        }
        for (i, node) in self.nodes.iter().enumerate() {
            if let TreeNode::Split { feature, threshold, left, right } = node {
                if *feature >= FEATURE_COUNT {
                    return Err(InferenceError(format!("node {} splits on feature {}", i, feature)));
                }
                if !threshold.is_finite() {
                    return Err(InferenceError(format!("node {} has a non-finite threshold", i)));
                }
                // Children always come after the parent, so evaluation terminates.
                if *left <= i || *right <= i || *left >= self.nodes.len() || *right >= self.nodes.len() {
                    return Err(InferenceError(format!("node {} has invalid children", i)));
                }
            }
        }
        Ok(())
    }

    fn evaluate(&self, row: &[f64]) -> Result<f64, InferenceError> {
        let mut index = 0;
        loop {
            match self.nodes.get(index) {
                Some(TreeNode::Leaf { value }) => return Ok(*value),
                Some(TreeNode::Split { feature, threshold, left, right }) => {
                    let x = row
                        .get(*feature)
                        .ok_or_else(|| InferenceError(format!("Row has no feature {}", feature)))?;
                    index = if *x <= *threshold { *left } else { *right };
                }
                None => return Err(InferenceError(format!("Node {} out of range", index))),
            }
        }
    }
}

impl ProbabilityModel for ForestModel {
    fn kind(&self) -> &'static str {
        "calibrated_forest"
    }

    fn supports_probability(&self) -> bool {
        self.probability_output
    }

    fn predict_proba(&self, row: &[f64]) -> Result<f64, InferenceError> {
        if !self.probability_output {
            return Err(InferenceError("Model exports labels only".to_string()));
        }
        let mean = self.mean_leaf_value(row)?;
        Ok(match self.calibration {
            Some(SigmoidCalibration { a, b }) => 1.0 / (1.0 + (a * mean + b).exp()),
            None => mean,
        })
    }

    fn predict_class(&self, row: &[f64]) -> Result<u8, InferenceError> {
        Ok(u8::from(self.mean_leaf_value(row)? > 0.5))
    }

    fn feature_names(&self) -> Option<Vec<String>> {
        self.feature_names.clone()
    }
}

// ============================================================================
// LOGISTIC
// ============================================================================

impl LogisticModel {
    fn validate(&self) -> Result<(), InferenceError> {
        if self.coefficients.len() != FEATURE_COUNT {
            return Err(InferenceError(format!(
                "Logistic model has {} coefficients, expected {}",
                self.coefficients.len(),
                FEATURE_COUNT
            )));
        }
        if self.coefficients.iter().any(|c| !c.is_finite()) || !self.intercept.is_finite() {
            return Err(InferenceError("Logistic model has non-finite weights".to_string()));
        }
        Ok(())
    }
}

impl ProbabilityModel for LogisticModel {
    fn kind(&self) -> &'static str {
        "logistic"
    }

    fn predict_proba(&self, row: &[f64]) -> Result<f64, InferenceError> {
        if row.len() != self.coefficients.len() {
            return Err(InferenceError(format!("Expected {} features, got {}", self.coefficients.len(), row.len())));
        }
        let z: f64 = self.intercept + self.coefficients.iter().zip(row).map(|(w, x)| w * x).sum::<f64>();
        Ok(1.0 / (1.0 + (-z).exp()))
    }

    fn feature_names(&self) -> Option<Vec<String>> {
        self.feature_names.clone()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    // Single stump on gpa (index 0 in the default order).
    const STUMP_FOREST: &str = r#"{
        "kind": "calibrated_forest",
        "trees": [
            { "nodes": [
                { "feature": 0, "threshold": 3.0, "left": 1, "right": 2 },
                { "value": 0.2 },
                { "value": 0.9 }
            ] },
            { "nodes": [ { "value": 0.5 } ] }
        ]
    }"#;

    #[test]
    fn test_forest_averages_leaves() {
        let model = parse_json_model(STUMP_FOREST).unwrap();
        let low = model.predict_proba(&[2.5, 0.0, 80.0, 100.0]).unwrap();
        let high = model.predict_proba(&[3.5, 0.0, 80.0, 100.0]).unwrap();
        assert!((low - 0.35).abs() < 1e-12);
        assert!((high - 0.7).abs() < 1e-12);
        assert!(model.feature_names().is_none());
    }

    #[test]
    fn test_threshold_goes_left() {
        let model = parse_json_model(STUMP_FOREST).unwrap();
        let p = model.predict_proba(&[3.0, 0.0, 0.0, 0.0]).unwrap();
        assert!((p - 0.35).abs() < 1e-12);
    }

    #[test]
    fn test_calibration_applied() {
        let raw = r#"{
            "kind": "calibrated_forest",
            "trees": [ { "nodes": [ { "value": 0.5 } ] } ],
            "calibration": { "a": -4.0, "b": 2.0 }
        }"#;
        let model = parse_json_model(raw).unwrap();
        // a * 0.5 + b = 0 -> 0.5
        let p = model.predict_proba(&[0.0; 4]).unwrap();
        assert!((p - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_label_only_forest() {
        let raw = r#"{
            "kind": "calibrated_forest",
            "probability_output": false,
            "trees": [ { "nodes": [ { "value": 0.8 } ] } ]
        }"#;
        let model = parse_json_model(raw).unwrap();
        assert!(!model.supports_probability());
        assert!(model.predict_proba(&[0.0; 4]).is_err());
        assert_eq!(model.predict_class(&[0.0; 4]).unwrap(), 1);
    }

    #[test]
    fn test_logistic_with_feature_names() {
        let raw = r#"{
            "kind": "logistic",
            "feature_names": ["gpa", "credits_passed", "attendance_percent", "repeat_count"],
            "coefficients": [0.0, 0.0, 0.0, 0.0],
            "intercept": 0.0
        }"#;
        let model = parse_json_model(raw).unwrap();
        assert_eq!(model.predict_proba(&[3.0, 100.0, 90.0, 0.0]).unwrap(), 0.5);
        assert_eq!(model.feature_names().unwrap()[1], "credits_passed");
    }

    #[test]
    fn test_rejects_bad_artifacts() {
        assert!(parse_json_model("not json").is_err());
        assert!(parse_json_model(r#"{"kind": "svm"}"#).is_err());
        assert!(parse_json_model(r#"{"kind": "calibrated_forest", "trees": []}"#).is_err());
        assert!(parse_json_model(
            r#"{"kind": "logistic", "coefficients": [1.0], "intercept": 0.0}"#
        )
        .is_err());

        // Child pointing back at its parent
        let cyclic = r#"{
            "kind": "calibrated_forest",
            "trees": [ { "nodes": [ { "feature": 0, "threshold": 1.0, "left": 0, "right": 0 } ] } ]
        }"#;
        assert!(parse_json_model(cyclic).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(STUMP_FOREST.as_bytes()).unwrap();

        let model = load_json_model(file.path()).unwrap();
        assert_eq!(model.kind(), "calibrated_forest");
    }
}
