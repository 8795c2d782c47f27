use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentAdmin;
use crate::api::pagination::{page_bounds, PaginatedResponse};
use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::User;
use crate::db::types::UserRole;
use crate::repositories;
use crate::schemas::user::{StudentCreate, StudentListQuery, StudentUpdate, UserResponse};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_students).post(create_student))
        .route("/:student_id", get(get_student).patch(update_student).delete(deactivate_student))
}

async fn list_students(
    Query(params): Query<StudentListQuery>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<PaginatedResponse<UserResponse>>, ApiError> {
    let (skip, limit) = page_bounds(params.skip, params.limit);

    let students = repositories::users::list_students(state.db(), params.is_active, skip, limit)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list students"))?;
    let total_count = repositories::users::count_students(state.db(), params.is_active)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count students"))?;

    Ok(Json(PaginatedResponse {
        items: students.into_iter().map(UserResponse::from_db).collect(),
        total_count,
        skip,
        limit,
    }))
}

async fn create_student(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<StudentCreate>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let username = payload.username.trim();

    let existing = repositories::users::exists_by_username(state.db(), username)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check existing user"))?;
    if existing.is_some() {
        return Err(ApiError::Conflict("User with this username already exists".to_string()));
    }

    let hashed_password = security::hash_password(&payload.password)
        .map_err(|e| ApiError::internal(e, "Failed to hash password"))?;

    let student = repositories::users::create(
        state.db(),
        repositories::users::CreateUser {
            id: &Uuid::new_v4().to_string(),
            username,
            hashed_password,
            full_name: payload.full_name.trim(),
            email: payload.email.as_deref(),
            role: UserRole::Student,
            is_active: payload.is_active,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create student"))?;

    tracing::info!(student_id = %student.id, admin_id = %admin.id, "Student created");
    Ok((StatusCode::CREATED, Json(UserResponse::from_db(student))))
}

async fn get_student(
    Path(student_id): Path<String>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<UserResponse>, ApiError> {
    let student = fetch_student(&state, &student_id).await?;
    Ok(Json(UserResponse::from_db(student)))
}

async fn update_student(
    Path(student_id): Path<String>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<StudentUpdate>,
) -> Result<Json<UserResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    fetch_student(&state, &student_id).await?;

    let hashed_password = match payload.password.as_deref() {
        Some(password) => Some(
            security::hash_password(password)
                .map_err(|e| ApiError::internal(e, "Failed to hash password"))?,
        ),
        None => None,
    };

    let updated = repositories::users::update(
        state.db(),
        &student_id,
        repositories::users::UpdateUser {
            full_name: payload.full_name.map(|name| name.trim().to_string()),
            email: payload.email,
            is_active: payload.is_active,
            hashed_password,
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update student"))?
    .ok_or_else(|| ApiError::NotFound("Student not found".to_string()))?;

    Ok(Json(UserResponse::from_db(updated)))
}

/// Attempts keep referencing the student, so removal only deactivates.
async fn deactivate_student(
    Path(student_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    fetch_student(&state, &student_id).await?;

    repositories::users::update(
        state.db(),
        &student_id,
        repositories::users::UpdateUser {
            full_name: None,
            email: None,
            is_active: Some(false),
            hashed_password: None,
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to deactivate student"))?;

    tracing::info!(student_id = %student_id, admin_id = %admin.id, "Student deactivated");
    Ok(StatusCode::NO_CONTENT)
}

async fn fetch_student(state: &AppState, student_id: &str) -> Result<User, ApiError> {
    repositories::users::find_by_id(state.db(), student_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch student"))?
        .filter(|user| user.role == UserRole::Student)
        .ok_or_else(|| ApiError::NotFound("Student not found".to_string()))
}
