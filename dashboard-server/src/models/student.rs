//! Student profile model

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor, PgPool};
use uuid::Uuid;
use validator::Validate;

use prediction_core::store::ProfileDirectory;
use prediction_core::{normalize_student_id, StoreError, StudentProfile};

use super::user::{CreateUser, User};

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Student {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub advisor_id: Option<Uuid>,
    pub student_id: String,
    pub name: String,
    pub program: String,
    pub cohort: String,
    pub class_code: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /academic/students`. A login is created when `password` is set.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateStudentRequest {
    #[validate(length(min = 1, max = 50))]
    pub student_id: String,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 255))]
    pub program: String,
    #[serde(default)]
    #[validate(length(max = 20))]
    pub cohort: String,
    #[serde(default)]
    #[validate(length(max = 50))]
    pub class_code: String,
    /// Login name; defaults to the student id
    #[validate(length(max = 100))]
    pub username: Option<String>,
    #[validate(length(min = 8))]
    pub password: Option<String>,
    pub advisor_id: Option<Uuid>,
}

/// Body of `PUT /academic/students/:id`. Replaces every profile field;
/// a missing `advisor_id` clears the advisor.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateStudentRequest {
    #[validate(length(min = 1, max = 50))]
    pub student_id: String,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 255))]
    pub program: String,
    #[serde(default)]
    #[validate(length(max = 20))]
    pub cohort: String,
    #[serde(default)]
    #[validate(length(max = 50))]
    pub class_code: String,
    pub advisor_id: Option<Uuid>,
}

/// Login created together with a profile
#[derive(Debug)]
pub struct NewLogin {
    pub user: CreateUser,
    pub password_hash: String,
}

#[derive(Debug, Deserialize)]
pub struct AssignAdvisorRequest {
    pub advisor_id: Uuid,
}

impl Student {
    /// Insert the profile and its optional login in one transaction
    pub async fn create_with_login(
        pool: &PgPool,
        data: &CreateStudentRequest,
        login: Option<NewLogin>,
    ) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let user_id = match login {
            Some(login) => Some(User::create(&mut *tx, login.user, login.password_hash).await?.id),
            None => None,
        };
        let student = Self::insert(&mut *tx, data, user_id).await?;

        tx.commit().await?;
        Ok(student)
    }

    async fn insert<'e, E: PgExecutor<'e>>(
        executor: E,
        data: &CreateStudentRequest,
        user_id: Option<Uuid>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Student>(
            r#"
            INSERT INTO students (user_id, advisor_id, student_id, name, program, cohort, class_code)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#
        )
        .bind(user_id)
        .bind(data.advisor_id)
        .bind(normalize_student_id(&data.student_id))
        .bind(data.name.trim())
        .bind(data.program.trim())
        .bind(data.cohort.trim())
        .bind(data.class_code.trim())
        .fetch_one(executor)
        .await
    }

    pub async fn update(pool: &PgPool, id: Uuid, data: &UpdateStudentRequest) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Student>(
            r#"
            UPDATE students
            SET student_id = $2, name = $3, program = $4, cohort = $5, class_code = $6,
                advisor_id = $7, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#
        )
        .bind(id)
        .bind(normalize_student_id(&data.student_id))
        .bind(data.name.trim())
        .bind(data.program.trim())
        .bind(data.cohort.trim())
        .bind(data.class_code.trim())
        .bind(data.advisor_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Student>("SELECT * FROM students ORDER BY student_id")
            .fetch_all(pool)
            .await
    }

    pub async fn list_by_advisor(pool: &PgPool, advisor_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Student>("SELECT * FROM students WHERE advisor_id = $1 ORDER BY student_id")
            .bind(advisor_id)
            .fetch_all(pool)
            .await
    }

    pub async fn find_by_student_id(pool: &PgPool, student_id: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Student>("SELECT * FROM students WHERE student_id = $1")
            .bind(normalize_student_id(student_id))
            .fetch_optional(pool)
            .await
    }

    /// Profile linked to a login, falling back to a student id equal to the username
    pub async fn find_for_username(pool: &PgPool, username: &str) -> Result<Option<Self>, sqlx::Error> {
        let linked = sqlx::query_as::<_, Student>(
            r#"
            SELECT s.* FROM students s
            JOIN users u ON u.id = s.user_id
            WHERE u.username = $1
            "#
        )
        .bind(username)
        .fetch_optional(pool)
        .await?;

        match linked {
            Some(student) => Ok(Some(student)),
            None => Self::find_by_student_id(pool, username).await,
        }
    }

    pub async fn assign_advisor(pool: &PgPool, id: Uuid, advisor_id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Student>(
            "UPDATE students SET advisor_id = $2, updated_at = NOW() WHERE id = $1 RETURNING *"
        )
        .bind(id)
        .bind(advisor_id)
        .fetch_optional(pool)
        .await
    }

    /// Removes the profile and its login, if any
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<u64, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let deleted: Option<(Option<Uuid>,)> =
            sqlx::query_as("DELETE FROM students WHERE id = $1 RETURNING user_id")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some((user_id,)) = deleted else {
            tx.rollback().await?;
            return Ok(0);
        };

        if let Some(user_id) = user_id {
            sqlx::query("DELETE FROM users WHERE id = $1 AND role = 'student'")
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(1)
    }

    pub fn to_profile(&self) -> StudentProfile {
        StudentProfile::new(
            self.name.clone(),
            &self.student_id,
            self.program.clone(),
            self.cohort.clone(),
            self.class_code.clone(),
        )
    }
}

/// Profile lookup backed by the `students` table
#[derive(Clone)]
pub struct PgProfileDirectory {
    pool: PgPool,
}

impl PgProfileDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileDirectory for PgProfileDirectory {
    async fn lookup(&self, username: &str) -> Result<Option<StudentProfile>, StoreError> {
        let student = Student::find_for_username(&self.pool, username)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(student.map(|s| s.to_profile()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::Role;

    fn request() -> CreateStudentRequest {
        CreateStudentRequest {
            student_id: "2101001".to_string(),
            name: "Siti".to_string(),
            program: "Informatics".to_string(),
            cohort: "2021".to_string(),
            class_code: "IF-A".to_string(),
            username: None,
            password: None,
            advisor_id: None,
        }
    }

    #[test]
    fn test_create_request_validation() {
        assert!(request().validate().is_ok());

        let mut bad = request();
        bad.student_id = String::new();
        bad.password = Some("short".to_string());
        let errors = bad.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("student_id"));
        assert!(errors.field_errors().contains_key("password"));

        let mut long_login = request();
        long_login.username = Some("u".repeat(101));
        let errors = long_login.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("username"));
    }

    #[test]
    fn test_update_request_validation() {
        let update: UpdateStudentRequest = serde_json::from_value(serde_json::json!({
            "student_id": "2101009",
            "name": "Siti Aminah"
        }))
        .unwrap();
        assert!(update.validate().is_ok());
        assert_eq!(update.program, "");
        assert!(update.advisor_id.is_none());

        let bad: UpdateStudentRequest = serde_json::from_value(serde_json::json!({
            "student_id": "",
            "name": "",
            "cohort": "x".repeat(21)
        }))
        .unwrap();
        let errors = bad.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("student_id"));
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("cohort"));
    }

    fn login(username: &str) -> Option<NewLogin> {
        Some(NewLogin {
            user: CreateUser {
                username: username.to_string(),
                name: None,
                role: Role::Student,
            },
            password_hash: "not-a-real-hash".to_string(),
        })
    }

    fn unique_request() -> (CreateStudentRequest, String) {
        let suffix = Uuid::new_v4().simple().to_string();
        let mut req = request();
        req.student_id = suffix[..12].to_string();
        (req, suffix)
    }

    #[tokio::test]
    async fn test_duplicate_student_leaves_no_login() {
        let Some(pool) = crate::db::test_pool().await else { return };
        let (req, suffix) = unique_request();
        let first_login = format!("a-{}", suffix);
        let second_login = format!("b-{}", suffix);

        let first = Student::create_with_login(&pool, &req, login(&first_login)).await.unwrap();
        assert!(first.user_id.is_some());

        let err = Student::create_with_login(&pool, &req, login(&second_login)).await.unwrap_err();
        assert!(matches!(AppError::from(err), AppError::AlreadyExists(_)));
        assert!(!User::exists(&pool, &second_login).await.unwrap());

        assert_eq!(Student::delete(&pool, first.id).await.unwrap(), 1);
        assert!(!User::exists(&pool, &first_login).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_replaces_fields() {
        let Some(pool) = crate::db::test_pool().await else { return };
        let (first_req, _) = unique_request();
        let (second_req, _) = unique_request();
        let first = Student::create_with_login(&pool, &first_req, None).await.unwrap();
        let second = Student::create_with_login(&pool, &second_req, None).await.unwrap();

        let mut update = UpdateStudentRequest {
            student_id: format!("{}.0", first.student_id),
            name: " Budi ".to_string(),
            program: "Statistics".to_string(),
            cohort: "2022".to_string(),
            class_code: "ST-B".to_string(),
            advisor_id: None,
        };
        let err = Student::update(&pool, second.id, &update).await.unwrap_err();
        assert!(matches!(AppError::from(err), AppError::AlreadyExists(_)));

        update.student_id = format!("{}.0", second.student_id);
        let updated = Student::update(&pool, second.id, &update).await.unwrap().unwrap();
        assert_eq!(updated.student_id, second.student_id);
        assert_eq!(updated.name, "Budi");
        assert_eq!(updated.class_code, "ST-B");

        assert!(Student::update(&pool, Uuid::new_v4(), &update).await.unwrap().is_none());

        Student::delete(&pool, first.id).await.unwrap();
        Student::delete(&pool, second.id).await.unwrap();
    }

    #[test]
    fn test_to_profile_normalises_id() {
        let now = Utc::now();
        let student = Student {
            id: Uuid::new_v4(),
            user_id: None,
            advisor_id: None,
            student_id: "2101001.0".to_string(),
            name: "Siti".to_string(),
            program: "Informatics".to_string(),
            cohort: "2021".to_string(),
            class_code: "IF-A".to_string(),
            created_at: now,
            updated_at: now,
        };

        let profile = student.to_profile();
        assert_eq!(profile.student_id, "2101001");
        assert_eq!(profile.class_code, "IF-A");
    }
}
