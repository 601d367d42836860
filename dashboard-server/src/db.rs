//! Database module - PostgreSQL connection and migrations

use sqlx::{postgres::PgPoolOptions, PgPool};

/// Create database connection pool
pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
}

/// Advisory lock key held while the schema is applied
const SCHEMA_LOCK_KEY: i64 = 0x6772_6164_7363_6865;

/// Run database migrations
///
/// The schema holds several statements, so it goes through the simple
/// query protocol; a prepared statement accepts only one. Concurrent
/// callers are serialised by a transaction-scoped advisory lock.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(SCHEMA_LOCK_KEY)
        .execute(&mut *tx)
        .await?;

    sqlx::raw_sql(SCHEMA_SQL)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!("Database schema applied successfully");
    Ok(())
}

/// Database schema SQL
const SCHEMA_SQL: &str = r#"
-- Login accounts (student, lecturer, academic)
CREATE TABLE IF NOT EXISTS users (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    username VARCHAR(100) NOT NULL UNIQUE,
    password_hash VARCHAR(255) NOT NULL,
    name VARCHAR(255),
    role VARCHAR(20) NOT NULL DEFAULT 'student',
    is_active BOOLEAN NOT NULL DEFAULT true,
    last_login TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

-- Student profiles, optionally linked to a login and an advisor
CREATE TABLE IF NOT EXISTS students (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    user_id UUID UNIQUE REFERENCES users(id) ON DELETE SET NULL,
    advisor_id UUID REFERENCES users(id) ON DELETE SET NULL,
    student_id VARCHAR(50) NOT NULL UNIQUE,
    name VARCHAR(255) NOT NULL,
    program VARCHAR(255) NOT NULL DEFAULT '',
    cohort VARCHAR(20) NOT NULL DEFAULT '',
    class_code VARCHAR(50) NOT NULL DEFAULT '',
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

-- Prediction records (immutable)
CREATE TABLE IF NOT EXISTS predictions (
    id UUID PRIMARY KEY,
    username VARCHAR(100) NOT NULL,
    student_name VARCHAR(255) NOT NULL,
    student_id VARCHAR(50) NOT NULL,
    program VARCHAR(255) NOT NULL DEFAULT '',
    cohort VARCHAR(20) NOT NULL DEFAULT '',
    class_code VARCHAR(50) NOT NULL DEFAULT '',
    gpa DOUBLE PRECISION NOT NULL,
    repeat_count INT NOT NULL,
    attendance_percent INT NOT NULL,
    credits_passed INT NOT NULL,
    probability DOUBLE PRECISION NOT NULL,
    risk VARCHAR(20) NOT NULL,
    recommendation TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_users_role ON users(role);
CREATE INDEX IF NOT EXISTS idx_students_advisor ON students(advisor_id);
CREATE INDEX IF NOT EXISTS idx_predictions_student ON predictions(student_id);
CREATE INDEX IF NOT EXISTS idx_predictions_created ON predictions(created_at);
"#;

/// Migrated pool for database tests, when `TEST_DATABASE_URL` is set
#[cfg(test)]
pub async fn test_pool() -> Option<PgPool> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;
    let pool = create_pool(&url).await.ok()?;
    run_migrations(&pool).await.ok()?;
    Some(pool)
}
