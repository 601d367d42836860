//! Report Module - Summaries, selections and export

pub mod export;
pub mod summary;

pub use export::{export_csv, to_csv_string, CSV_HEADER};
pub use summary::{
    latest_high_risk, latest_per_student, newest_first, student_history, RecordFilter,
    RiskDistribution, RiskSummary,
};
