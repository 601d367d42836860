//! Prediction Module - Orchestrator, records and batch scoring

pub mod batch;
pub mod record;
pub mod service;

pub use batch::{
    parse_batch, BatchError, BatchInput, BatchReport, BatchRow, BatchRowResult, RowError,
    OPTIONAL_COLUMNS, REQUIRED_COLUMNS,
};
pub use record::{normalize_student_id, PredictionRecord, StudentProfile};
pub use service::PredictionService;
