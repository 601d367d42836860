//! User model

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor, PgPool};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use validator::Validate;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: Option<String>,
    pub role: String,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Lecturer,
    Academic,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Lecturer => "lecturer",
            Self::Academic => "academic",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "student" => Some(Self::Student),
            "lecturer" => Some(Self::Lecturer),
            "academic" => Some(Self::Academic),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub struct CreateUser {
    pub username: String,
    pub name: Option<String>,
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserInfo,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserInfo {
    pub id: Uuid,
    pub username: String,
    pub name: Option<String>,
    pub role: String,
}

/// Body of `POST /academic/lecturers`
#[derive(Debug, Deserialize, Validate)]
pub struct CreateLecturerRequest {
    #[validate(length(min = 3, max = 100))]
    pub username: String,
    #[validate(length(min = 8))]
    pub password: String,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
}

/// Body of `PUT /academic/lecturers/:id`. The password is kept when absent.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateLecturerRequest {
    #[validate(length(min = 3, max = 100))]
    pub username: String,
    #[validate(length(min = 8))]
    pub password: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
}

impl User {
    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        data: CreateUser,
        password_hash: String,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, password_hash, name, role)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#
        )
        .bind(&data.username)
        .bind(&password_hash)
        .bind(&data.name)
        .bind(data.role.as_str())
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_username(pool: &PgPool, username: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1 AND is_active = true")
            .bind(username)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Whether `username` belongs to an account other than `except`
    pub async fn username_taken(pool: &PgPool, username: &str, except: Uuid) -> Result<bool, sqlx::Error> {
        let found: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE username = $1 AND id <> $2")
            .bind(username)
            .bind(except)
            .fetch_optional(pool)
            .await?;
        Ok(found.is_some())
    }

    pub async fn exists(pool: &PgPool, username: &str) -> Result<bool, sqlx::Error> {
        let found: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(pool)
            .await?;
        Ok(found.is_some())
    }

    pub async fn list_by_role(pool: &PgPool, role: Role) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE role = $1 ORDER BY username")
            .bind(role.as_str())
            .fetch_all(pool)
            .await
    }

    /// Delete only when the account has the given role
    pub async fn delete_with_role(pool: &PgPool, id: Uuid, role: Role) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1 AND role = $2")
            .bind(id)
            .bind(role.as_str())
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Rename an account of the given role; `None` keeps the stored value
    pub async fn update_with_role(
        pool: &PgPool,
        id: Uuid,
        role: Role,
        username: &str,
        name: Option<&str>,
        password_hash: Option<String>,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET username = $3,
                name = COALESCE($4, name),
                password_hash = COALESCE($5, password_hash),
                updated_at = NOW()
            WHERE id = $1 AND role = $2
            RETURNING *
            "#
        )
        .bind(id)
        .bind(role.as_str())
        .bind(username)
        .bind(name)
        .bind(password_hash)
        .fetch_optional(pool)
        .await
    }

    pub async fn update_last_login(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub fn role(&self) -> Option<Role> {
        Role::parse(&self.role)
    }

    pub fn to_info(&self) -> UserInfo {
        UserInfo {
            id: self.id,
            username: self.username.clone(),
            name: self.name.clone(),
            role: self.role.clone(),
        }
    }
}
