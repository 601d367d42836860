//! Batch CSV scoring
//!
//! Rows carry their own identity, so no profile lookup happens. Every data
//! row yields a result tagged with its 1-based position: either a record or
//! the error for that row. Nothing is persisted here.

use std::collections::HashMap;

use serde::ser::{Serialize, SerializeStruct, Serializer};

use crate::error::PredictionError;
use crate::features::RawFeatures;

use super::record::{normalize_student_id, PredictionRecord, StudentProfile};
use super::service::PredictionService;

// ============================================================================
// CONSTANTS
// ============================================================================

pub const REQUIRED_COLUMNS: [&str; 6] = [
    "name",
    "student_id",
    "gpa",
    "repeat_count",
    "attendance_percent",
    "credits_passed",
];

pub const OPTIONAL_COLUMNS: [&str; 3] = ["program", "cohort", "class"];

// ============================================================================
// ERRORS
// ============================================================================

/// Rejects the whole upload
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BatchError {
    #[error("upload is empty")]
    Empty,

    #[error("missing required column `{0}`")]
    MissingColumn(String),

    #[error("upload has {rows} data rows, the limit is {max}")]
    TooManyRows { rows: usize, max: usize },

    #[error("unterminated quoted field starting on line {line}")]
    UnterminatedQuote { line: usize },

    #[error(transparent)]
    Prediction(#[from] PredictionError),
}

/// Rejects a single row
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RowError {
    #[error("row has {found} cells, header has {expected}")]
    CellCount { expected: usize, found: usize },

    #[error("`student_id` is empty")]
    MissingStudentId,

    #[error(transparent)]
    Prediction(#[from] PredictionError),
}

impl RowError {
    pub fn kind(&self) -> &'static str {
        match self {
            RowError::CellCount { .. } => "malformed_row",
            RowError::MissingStudentId => "validation_error",
            RowError::Prediction(e) => e.kind(),
        }
    }

    /// Offending field, when there is one
    pub fn field(&self) -> Option<&str> {
        match self {
            RowError::MissingStudentId => Some("student_id"),
            RowError::Prediction(PredictionError::Validation(v)) => Some(&v.field),
            _ => None,
        }
    }
}

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// One parsed data row
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRow {
    pub profile: StudentProfile,
    pub features: RawFeatures,
}

/// Parsed upload: each entry keeps its 1-based data row number
#[derive(Debug, Clone, PartialEq)]
pub struct BatchInput {
    pub rows: Vec<(usize, Result<BatchRow, RowError>)>,
}

/// Outcome of one data row.
///
/// `index` is the 1-based position among the non-blank data rows, header
/// excluded. It is not a line number: blank lines are not counted and a
/// quoted field may span several lines.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRowResult {
    pub index: usize,
    pub outcome: Result<PredictionRecord, RowError>,
}

impl BatchRowResult {
    pub fn record(&self) -> Option<&PredictionRecord> {
        self.outcome.as_ref().ok()
    }

    pub fn error(&self) -> Option<&RowError> {
        self.outcome.as_ref().err()
    }
}

impl Serialize for BatchRowResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("BatchRowResult", 3)?;
        state.serialize_field("index", &self.index)?;
        match &self.outcome {
            Ok(record) => {
                state.serialize_field("status", "ok")?;
                state.serialize_field("record", record)?;
            }
            Err(e) => {
                state.serialize_field("status", "error")?;
                state.serialize_field(
                    "error",
                    &serde_json::json!({
                        "kind": e.kind(),
                        "field": e.field(),
                        "message": e.to_string(),
                    }),
                )?;
            }
        }
        state.end()
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct BatchReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub rows: Vec<BatchRowResult>,
}

impl BatchReport {
    pub fn records(&self) -> impl Iterator<Item = &PredictionRecord> {
        self.rows.iter().filter_map(BatchRowResult::record)
    }
}

// ============================================================================
// CSV PARSING
// ============================================================================

/// Split CSV text into records. Quoted fields may hold commas, newlines
/// and doubled quotes.
fn split_records(text: &str) -> Result<Vec<Vec<String>>, BatchError> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut quote_line = 0;
    let mut line = 1;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' => {
                in_quotes = true;
                quote_line = line;
            }
            ',' => record.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => {
                line += 1;
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(BatchError::UnterminatedQuote { line: quote_line });
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }

    Ok(records)
}

fn is_blank(record: &[String]) -> bool {
    record.iter().all(|cell| cell.trim().is_empty())
}

/// Parse an upload into rows. Header names are case-insensitive.
pub fn parse_batch(text: &str, max_rows: usize) -> Result<BatchInput, BatchError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut records = split_records(text)?.into_iter().filter(|r| !is_blank(r));

    let header = records.next().ok_or(BatchError::Empty)?;
    let columns: HashMap<String, usize> = header
        .iter()
        .enumerate()
        .map(|(i, name)| (name.trim().to_ascii_lowercase(), i))
        .collect();

    for required in REQUIRED_COLUMNS {
        if !columns.contains_key(required) {
            return Err(BatchError::MissingColumn(required.to_string()));
        }
    }

    let data: Vec<Vec<String>> = records.collect();
    if data.is_empty() {
        return Err(BatchError::Empty);
    }
    if data.len() > max_rows {
        return Err(BatchError::TooManyRows { rows: data.len(), max: max_rows });
    }

    let cell = |record: &[String], name: &str| -> String {
        columns
            .get(name)
            .and_then(|i| record.get(*i))
            .map(|s| s.trim().to_string())
            .unwrap_or_default()
    };

    let rows = data
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let index = i + 1;
            if record.len() != header.len() {
                return (
                    index,
                    Err(RowError::CellCount { expected: header.len(), found: record.len() }),
                );
            }

            let student_id = normalize_student_id(&cell(record, "student_id"));
            if student_id.is_empty() {
                return (index, Err(RowError::MissingStudentId));
            }

            let row = BatchRow {
                profile: StudentProfile {
                    name: cell(record, "name"),
                    student_id,
                    program: cell(record, "program"),
                    cohort: cell(record, "cohort"),
                    class_code: cell(record, "class"),
                },
                features: RawFeatures::from_text(
                    &cell(record, "gpa"),
                    &cell(record, "repeat_count"),
                    &cell(record, "attendance_percent"),
                    &cell(record, "credits_passed"),
                ),
            };
            (index, Ok(row))
        })
        .collect();

    Ok(BatchInput { rows })
}

// ============================================================================
// SCORING
// ============================================================================

impl PredictionService {
    /// Score parsed rows for `owner`, skipping and reporting bad rows.
    ///
    /// Fails as a whole only when the classifier is unavailable.
    pub fn predict_batch(&self, owner: &str, input: BatchInput) -> Result<BatchReport, BatchError> {
        self.classifier().ensure_available()?;

        let rows: Vec<BatchRowResult> = input
            .rows
            .into_iter()
            .map(|(index, parsed)| {
                let outcome = parsed.and_then(|row| {
                    self.predict_for_profile(owner, &row.profile, &row.features)
                        .map_err(RowError::from)
                });
                if let Err(e) = &outcome {
                    log::debug!("Batch row {} skipped: {}", index, e);
                }
                BatchRowResult { index, outcome }
            })
            .collect();

        let succeeded = rows.iter().filter(|r| r.outcome.is_ok()).count();
        let report = BatchReport {
            total: rows.len(),
            succeeded,
            failed: rows.len() - succeeded,
            rows,
        };

        log::info!(
            "Batch by {}: {} rows, {} scored, {} failed",
            owner,
            report.total,
            report.succeeded,
            report.failed
        );

        Ok(report)
    }

    /// Parse and score a CSV upload
    pub fn predict_csv(&self, owner: &str, text: &str, max_rows: usize) -> Result<BatchReport, BatchError> {
        let input = parse_batch(text, max_rows)?;
        self.predict_batch(owner, input)
    }
}

// ============================================================================
// TESTS
// ============================================================================
