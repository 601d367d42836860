//! Prediction record persistence

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgExecutor, PgPool};
use uuid::Uuid;

use prediction_core::store::PredictionStore;
use prediction_core::{normalize_student_id, PredictionRecord, RiskTier, StoreError};

/// Row shape of the `predictions` table
#[derive(Debug, Clone, FromRow)]
pub struct PredictionRow {
    pub id: Uuid,
    pub username: String,
    pub student_name: String,
    pub student_id: String,
    pub program: String,
    pub cohort: String,
    pub class_code: String,
    pub gpa: f64,
    pub repeat_count: i32,
    pub attendance_percent: i32,
    pub credits_passed: i32,
    pub probability: f64,
    pub risk: String,
    pub recommendation: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<PredictionRow> for PredictionRecord {
    type Error = StoreError;

    fn try_from(row: PredictionRow) -> Result<Self, Self::Error> {
        let risk = RiskTier::parse(&row.risk).ok_or_else(|| StoreError::Corrupt {
            id: row.id.to_string(),
            reason: format!("unknown risk tier '{}'", row.risk),
        })?;

        Ok(PredictionRecord {
            id: row.id,
            username: row.username,
            student_name: row.student_name,
            student_id: row.student_id,
            program: row.program,
            cohort: row.cohort,
            class_code: row.class_code,
            gpa: row.gpa,
            repeat_count: row.repeat_count,
            attendance_percent: row.attendance_percent,
            credits_passed: row.credits_passed,
            probability: row.probability,
            risk,
            recommendation: row.recommendation,
            created_at: row.created_at,
        })
    }
}

fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

async fn insert<'e, E: PgExecutor<'e>>(executor: E, record: &PredictionRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO predictions (
            id, username, student_name, student_id, program, cohort, class_code,
            gpa, repeat_count, attendance_percent, credits_passed,
            probability, risk, recommendation, created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
        "#
    )
    .bind(record.id)
    .bind(&record.username)
    .bind(&record.student_name)
    .bind(&record.student_id)
    .bind(&record.program)
    .bind(&record.cohort)
    .bind(&record.class_code)
    .bind(record.gpa)
    .bind(record.repeat_count)
    .bind(record.attendance_percent)
    .bind(record.credits_passed)
    .bind(record.probability)
    .bind(record.risk.as_str())
    .bind(&record.recommendation)
    .bind(record.created_at)
    .execute(executor)
    .await?;

    Ok(())
}

/// `PredictionStore` backed by PostgreSQL
#[derive(Clone)]
pub struct PgPredictionStore {
    pool: PgPool,
}

impl PgPredictionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PredictionStore for PgPredictionStore {
    async fn save(&self, record: &PredictionRecord) -> Result<(), StoreError> {
        insert(&self.pool, record).await.map_err(backend)
    }

    async fn save_all(&self, records: &[PredictionRecord]) -> Result<u64, StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        for record in records {
            insert(&mut *tx, record).await.map_err(backend)?;
        }
        tx.commit().await.map_err(backend)?;
        Ok(records.len() as u64)
    }

    async fn load_all(&self) -> Result<Vec<PredictionRecord>, StoreError> {
        let rows = sqlx::query_as::<_, PredictionRow>("SELECT * FROM predictions ORDER BY created_at ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;

        rows.into_iter().map(PredictionRecord::try_from).collect()
    }

    async fn delete_all(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM predictions")
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(result.rows_affected())
    }

    async fn delete_by_student_id(&self, student_id: &str) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM predictions WHERE student_id = $1")
            .bind(normalize_student_id(student_id))
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(result.rows_affected())
    }

    async fn delete_by_record_id(&self, id: Uuid) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM predictions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prediction_core::risk::assess;
    use prediction_core::{FeatureVector, StudentProfile};

    fn record(student_id: &str) -> PredictionRecord {
        let profile = StudentProfile::new("Siti", student_id, "Informatics", "2021", "IF-A");
        let features = FeatureVector::new(3.2, 90, 80, 2);
        PredictionRecord::create("admin", &profile, &features, &assess(0.5, &features))
    }

    fn row(risk: &str) -> PredictionRow {
        PredictionRow {
            id: Uuid::new_v4(),
            username: "siti".to_string(),
            student_name: "Siti".to_string(),
            student_id: "2101001".to_string(),
            program: "Informatics".to_string(),
            cohort: "2021".to_string(),
            class_code: "IF-A".to_string(),
            gpa: 3.75,
            repeat_count: 1,
            attendance_percent: 96,
            credits_passed: 100,
            probability: 67.0,
            risk: risk.to_string(),
            recommendation: RiskTier::Medium.recommendation().to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_row_conversion() {
        let record = PredictionRecord::try_from(row("Medium Risk")).unwrap();
        assert_eq!(record.risk, RiskTier::Medium);
        assert_eq!(record.gpa, 3.75);
        assert_eq!(record.credits_passed, 100);
    }

    #[test]
    fn test_unknown_tier_is_corrupt() {
        let bad = row("Extreme Risk");
        let id = bad.id.to_string();
        match PredictionRecord::try_from(bad) {
            Err(StoreError::Corrupt { id: got, .. }) => assert_eq!(got, id),
            other => panic!("expected corrupt record, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_save_all_rolls_back_on_failure() {
        let Some(pool) = crate::db::test_pool().await else { return };
        let store = PgPredictionStore::new(pool);
        let student_id = Uuid::new_v4().simple().to_string()[..20].to_string();

        let first = record(&student_id);
        // Same primary key as `first`: the second insert fails
        let mut clash = record(&student_id);
        clash.id = first.id;

        assert!(store.save_all(&[first.clone(), clash]).await.is_err());
        let kept = store.load_all().await.unwrap();
        assert!(kept.iter().all(|r| r.student_id != student_id));

        let second = record(&student_id);
        assert_eq!(store.save_all(&[first, second]).await.unwrap(), 2);
        assert_eq!(store.delete_by_student_id(&student_id).await.unwrap(), 2);
    }
}
