//! Lecturer and student directory management (academic only)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;

use prediction_core::normalize_student_id;

use crate::{AppState, AppError, AppResult};
use crate::handlers::auth::hash_password;
use crate::middleware::auth::{require_role, UserContext};
use crate::models::{
    AssignAdvisorRequest, CreateLecturerRequest, CreateStudentRequest, CreateUser, NewLogin, Role,
    Student, UpdateLecturerRequest, UpdateStudentRequest, User, UserInfo,
};

// ============================================================================
// LECTURERS
// ============================================================================

pub async fn list_lecturers(
    State(state): State<AppState>,
    user: UserContext,
) -> AppResult<Json<Vec<UserInfo>>> {
    require_role(&user, Role::Academic)?;

    let lecturers = User::list_by_role(&state.pool, Role::Lecturer).await?;
    Ok(Json(lecturers.iter().map(|u| u.to_info()).collect()))
}

pub async fn create_lecturer(
    State(state): State<AppState>,
    user: UserContext,
    Json(req): Json<CreateLecturerRequest>,
) -> AppResult<(StatusCode, Json<UserInfo>)> {
    require_role(&user, Role::Academic)?;
    req.validate()?;

    let username = req.username.trim().to_string();
    if User::exists(&state.pool, &username).await? {
        return Err(AppError::AlreadyExists(format!("Username '{}' is taken", username)));
    }

    let password_hash = hash_password(&req.password)?;
    let created = User::create(
        &state.pool,
        CreateUser {
            username,
            name: Some(req.name.trim().to_string()),
            role: Role::Lecturer,
        },
        password_hash,
    ).await?;

    tracing::info!("Lecturer {} created by {}", created.username, user.username);
    Ok((StatusCode::CREATED, Json(created.to_info())))
}

/// Rename a lecturer, optionally resetting the password
pub async fn update_lecturer(
    State(state): State<AppState>,
    user: UserContext,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateLecturerRequest>,
) -> AppResult<Json<UserInfo>> {
    require_role(&user, Role::Academic)?;
    req.validate()?;

    let username = req.username.trim().to_string();
    if username.is_empty() {
        return Err(AppError::ValidationError("username is empty".to_string()));
    }
    if User::username_taken(&state.pool, &username, id).await? {
        return Err(AppError::AlreadyExists(format!("Username '{}' is taken", username)));
    }

    let password_hash = req.password.as_deref().map(hash_password).transpose()?;
    let name = req.name.as_deref().map(str::trim);

    let updated = User::update_with_role(&state.pool, id, Role::Lecturer, &username, name, password_hash)
        .await?
        .ok_or_else(|| AppError::NotFound("Lecturer not found".to_string()))?;

    tracing::info!("Lecturer {} updated by {}", updated.username, user.username);
    Ok(Json(updated.to_info()))
}

pub async fn delete_lecturer(
    State(state): State<AppState>,
    user: UserContext,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    require_role(&user, Role::Academic)?;

    let deleted = User::delete_with_role(&state.pool, id, Role::Lecturer).await?;
    if deleted == 0 {
        return Err(AppError::NotFound("Lecturer not found".to_string()));
    }
    Ok(Json(json!({ "deleted": deleted })))
}

// ============================================================================
// STUDENTS
// ============================================================================

pub async fn list_students(
    State(state): State<AppState>,
    user: UserContext,
) -> AppResult<Json<Vec<Student>>> {
    require_role(&user, Role::Academic)?;
    Ok(Json(Student::list(&state.pool).await?))
}

pub async fn create_student(
    State(state): State<AppState>,
    user: UserContext,
    Json(req): Json<CreateStudentRequest>,
) -> AppResult<(StatusCode, Json<Student>)> {
    require_role(&user, Role::Academic)?;
    req.validate()?;

    let student_id = normalize_student_id(&req.student_id);
    if student_id.is_empty() {
        return Err(AppError::ValidationError("student_id is empty".to_string()));
    }
    if Student::find_by_student_id(&state.pool, &student_id).await?.is_some() {
        return Err(AppError::AlreadyExists(format!("Student '{}' already exists", student_id)));
    }
    if let Some(advisor_id) = req.advisor_id {
        ensure_lecturer(&state, advisor_id).await?;
    }

    let login = match &req.password {
        Some(password) => {
            let username = req
                .username
                .as_deref()
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .unwrap_or(&student_id)
                .to_string();
            if User::exists(&state.pool, &username).await? {
                return Err(AppError::AlreadyExists(format!("Username '{}' is taken", username)));
            }

            Some(NewLogin {
                user: CreateUser {
                    username,
                    name: Some(req.name.trim().to_string()),
                    role: Role::Student,
                },
                password_hash: hash_password(password)?,
            })
        }
        None => None,
    };

    let student = Student::create_with_login(&state.pool, &req, login).await?;

    tracing::info!("Student {} created by {}", student.student_id, user.username);
    Ok((StatusCode::CREATED, Json(student)))
}

/// Replace a student's profile fields and advisor
pub async fn update_student(
    State(state): State<AppState>,
    user: UserContext,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateStudentRequest>,
) -> AppResult<Json<Student>> {
    require_role(&user, Role::Academic)?;
    req.validate()?;

    let student_id = normalize_student_id(&req.student_id);
    if student_id.is_empty() {
        return Err(AppError::ValidationError("student_id is empty".to_string()));
    }
    if req.name.trim().is_empty() {
        return Err(AppError::ValidationError("name is empty".to_string()));
    }
    if let Some(existing) = Student::find_by_student_id(&state.pool, &student_id).await? {
        if existing.id != id {
            return Err(AppError::AlreadyExists(format!("Student '{}' already exists", student_id)));
        }
    }
    if let Some(advisor_id) = req.advisor_id {
        ensure_lecturer(&state, advisor_id).await?;
    }

    let student = Student::update(&state.pool, id, &req)
        .await?
        .ok_or_else(|| AppError::NotFound("Student not found".to_string()))?;

    tracing::info!("Student {} updated by {}", student.student_id, user.username);
    Ok(Json(student))
}

pub async fn delete_student(
    State(state): State<AppState>,
    user: UserContext,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    require_role(&user, Role::Academic)?;

    let deleted = Student::delete(&state.pool, id).await?;
    if deleted == 0 {
        return Err(AppError::NotFound("Student not found".to_string()));
    }
    Ok(Json(json!({ "deleted": deleted })))
}

pub async fn assign_advisor(
    State(state): State<AppState>,
    user: UserContext,
    Path(id): Path<Uuid>,
    Json(req): Json<AssignAdvisorRequest>,
) -> AppResult<Json<Student>> {
    require_role(&user, Role::Academic)?;
    ensure_lecturer(&state, req.advisor_id).await?;

    let student = Student::assign_advisor(&state.pool, id, req.advisor_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Student not found".to_string()))?;

    Ok(Json(student))
}

async fn ensure_lecturer(state: &AppState, id: Uuid) -> AppResult<()> {
    match User::find_by_id(&state.pool, id).await? {
        Some(u) if u.role() == Some(Role::Lecturer) => Ok(()),
        _ => Err(AppError::ValidationError("advisor must be a lecturer".to_string())),
    }
}
