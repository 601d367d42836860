//! Features Module - model input layout and coercion
//!
//! - `layout`: feature names and the model-dependent field order
//! - `vector`: raw input coercion into a typed feature vector

pub mod layout;
pub mod vector;

pub use layout::{FeatureName, FeatureOrder, LayoutMismatchError, DEFAULT_FEATURE_ORDER, FEATURE_COUNT};
pub use vector::{FeatureVector, RawFeatures};
