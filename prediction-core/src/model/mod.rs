//! Model Module - Trained classifier loading and scoring
//!
//! Artifacts are picked by file extension: `.json` for the built-in
//! families, `.onnx` when built with the `onnx` feature.

pub mod artifact;
pub mod inference;
#[cfg(feature = "onnx")]
pub mod onnx;

use std::path::Path;

pub use inference::{
    global, init, Classifier, EngineStatus, InferenceError, ModelMetadata, ProbabilityModel,
};

pub(crate) fn load_model(path: &Path) -> Result<Box<dyn ProbabilityModel>, InferenceError> {
    if !path.exists() {
        return Err(InferenceError(format!("Model not found: {}", path.display())));
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "json" => artifact::load_json_model(path),
        #[cfg(feature = "onnx")]
        "onnx" => Ok(Box::new(onnx::OnnxModel::load(path)?)),
        #[cfg(not(feature = "onnx"))]
        "onnx" => Err(InferenceError("ONNX models require the `onnx` feature".to_string())),
        other => Err(InferenceError(format!("Unsupported model format: .{}", other))),
    }
}
