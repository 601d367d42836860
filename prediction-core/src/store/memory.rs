//! In-memory store implementations

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use super::{PredictionStore, ProfileDirectory};
use crate::error::StoreError;
use crate::prediction::{normalize_student_id, PredictionRecord, StudentProfile};

/// Records kept in insertion order
#[derive(Debug, Default)]
pub struct MemoryPredictionStore {
    records: RwLock<Vec<PredictionRecord>>,
}

impl MemoryPredictionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl PredictionStore for MemoryPredictionStore {
    async fn save(&self, record: &PredictionRecord) -> Result<(), StoreError> {
        self.records.write().push(record.clone());
        Ok(())
    }

    async fn save_all(&self, records: &[PredictionRecord]) -> Result<u64, StoreError> {
        self.records.write().extend_from_slice(records);
        Ok(records.len() as u64)
    }

    async fn load_all(&self) -> Result<Vec<PredictionRecord>, StoreError> {
        let mut records = self.records.read().clone();
        // Stable: equal timestamps keep insertion order
        records.sort_by_key(|r| r.created_at);
        Ok(records)
    }

    async fn delete_all(&self) -> Result<u64, StoreError> {
        let mut records = self.records.write();
        let removed = records.len() as u64;
        records.clear();
        Ok(removed)
    }

    async fn delete_by_student_id(&self, student_id: &str) -> Result<u64, StoreError> {
        let target = normalize_student_id(student_id);
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|r| normalize_student_id(&r.student_id) != target);
        Ok((before - records.len()) as u64)
    }

    async fn delete_by_record_id(&self, id: Uuid) -> Result<u64, StoreError> {
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|r| r.id != id);
        Ok((before - records.len()) as u64)
    }
}

/// Username to profile map
#[derive(Debug, Default)]
pub struct MemoryProfileDirectory {
    profiles: RwLock<HashMap<String, StudentProfile>>,
}

impl MemoryProfileDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, username: impl Into<String>, profile: StudentProfile) {
        self.profiles.write().insert(username.into(), profile);
    }

    pub fn with_profile(self, username: impl Into<String>, profile: StudentProfile) -> Self {
        self.insert(username, profile);
        self
    }
}

#[async_trait]
impl ProfileDirectory for MemoryProfileDirectory {
    async fn lookup(&self, username: &str) -> Result<Option<StudentProfile>, StoreError> {
        Ok(self.profiles.read().get(username).cloned())
    }
}
