//! Store boundaries consumed by the pipeline
//!
//! The pipeline never assumes a persistence technology. The dashboard
//! server backs these with PostgreSQL; tests use the in-memory versions.

pub mod memory;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreError;
use crate::prediction::{PredictionRecord, StudentProfile};

pub use memory::{MemoryPredictionStore, MemoryProfileDirectory};

/// Persistence of prediction records
#[async_trait]
pub trait PredictionStore: Send + Sync {
    async fn save(&self, record: &PredictionRecord) -> Result<(), StoreError>;

    /// All or nothing: on error no record of the slice is kept
    async fn save_all(&self, records: &[PredictionRecord]) -> Result<u64, StoreError>;

    /// Every record, oldest first
    async fn load_all(&self) -> Result<Vec<PredictionRecord>, StoreError>;

    /// Returns the number of records removed
    async fn delete_all(&self) -> Result<u64, StoreError>;

    /// `student_id` is normalised before matching
    async fn delete_by_student_id(&self, student_id: &str) -> Result<u64, StoreError>;

    async fn delete_by_record_id(&self, id: Uuid) -> Result<u64, StoreError>;
}

/// Read-only lookup of the profile behind a login
#[async_trait]
pub trait ProfileDirectory: Send + Sync {
    async fn lookup(&self, username: &str) -> Result<Option<StudentProfile>, StoreError>;
}
