//! ONNX Runtime backend (enabled with the `onnx` feature)
//!
//! Expects a scikit-learn style export: a single float input of shape
//! `[1, 4]` in the default feature order, with `probabilities` and/or
//! `label` outputs.

use std::path::Path;

use ndarray::Array2;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;
use parking_lot::Mutex;

use super::inference::{InferenceError, ProbabilityModel};

pub struct OnnxModel {
    session: Mutex<Session>,
    probability_output: Option<String>,
    label_output: Option<String>,
}

impl OnnxModel {
    pub fn load(path: &Path) -> Result<Self, InferenceError> {
        log::info!("Loading ONNX model from: {}", path.display());

        let session = Session::builder()
            .map_err(|e| InferenceError(format!("Failed to create session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| InferenceError(format!("Failed to set optimization: {}", e)))?
            .commit_from_file(path)
            .map_err(|e| InferenceError(format!("Failed to load model: {}", e)))?;

        let names: Vec<String> = session.outputs.iter().map(|o| o.name.clone()).collect();
        let probability_output = names.iter().find(|n| n.contains("probabilit")).cloned();
        let label_output = names
            .iter()
            .find(|n| n.contains("label"))
            .cloned()
            .or_else(|| names.first().cloned());

        if probability_output.is_none() && label_output.is_none() {
            return Err(InferenceError("No output defined".to_string()));
        }

        Ok(Self {
            session: Mutex::new(session),
            probability_output,
            label_output,
        })
    }

    fn input_array(row: &[f64]) -> Result<Array2<f32>, InferenceError> {
        let data: Vec<f32> = row.iter().map(|v| *v as f32).collect();
        Array2::<f32>::from_shape_vec((1, row.len()), data)
            .map_err(|e| InferenceError(format!("Array error: {}", e)))
    }
}

impl ProbabilityModel for OnnxModel {
    fn kind(&self) -> &'static str {
        "onnx"
    }

    fn supports_probability(&self) -> bool {
        self.probability_output.is_some()
    }

    fn predict_proba(&self, row: &[f64]) -> Result<f64, InferenceError> {
        let name = self
            .probability_output
            .as_deref()
            .ok_or_else(|| InferenceError("Model has no probability output".to_string()))?;

        let input = Value::from_array(Self::input_array(row)?)
            .map_err(|e| InferenceError(format!("Tensor error: {}", e)))?;
        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| InferenceError(format!("Inference failed: {}", e)))?;
        let output = outputs
            .get(name)
            .ok_or_else(|| InferenceError("No output".to_string()))?;
        let (_, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| InferenceError(format!("Extract error: {}", e)))?;

        // [p(class 0), p(class 1)]
        data.get(1)
            .copied()
            .map(f64::from)
            .ok_or_else(|| InferenceError("Probability output has no positive class".to_string()))
    }

    fn predict_class(&self, row: &[f64]) -> Result<u8, InferenceError> {
        let name = self
            .label_output
            .as_deref()
            .ok_or_else(|| InferenceError("Model has no label output".to_string()))?;

        let input = Value::from_array(Self::input_array(row)?)
            .map_err(|e| InferenceError(format!("Tensor error: {}", e)))?;
        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| InferenceError(format!("Inference failed: {}", e)))?;
        let output = outputs
            .get(name)
            .ok_or_else(|| InferenceError("No output".to_string()))?;
        let (_, data) = output
            .try_extract_tensor::<i64>()
            .map_err(|e| InferenceError(format!("Extract error: {}", e)))?;

        data.first()
            .map(|label| u8::from(*label >= 1))
            .ok_or_else(|| InferenceError("Empty label output".to_string()))
    }
}
