//! Central Configuration Constants
//!
//! Single source of truth for pipeline defaults.

/// Default model artifact location, relative to the working directory
pub const DEFAULT_MODEL_PATH: &str = "model/graduation_model.json";

/// Default maximum data rows per batch upload
pub const DEFAULT_BATCH_MAX_ROWS: usize = 5000;

// ============================================
// Helper functions to read from env with fallback
// ============================================

/// Get model path from environment or use default
pub fn get_model_path() -> String {
    std::env::var("MODEL_PATH").unwrap_or_else(|_| DEFAULT_MODEL_PATH.to_string())
}

/// Get batch row limit from environment or use default
pub fn get_batch_max_rows() -> usize {
    std::env::var("BATCH_MAX_ROWS")
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_BATCH_MAX_ROWS)
}
