//! User account handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;

use crate::dtos::{CreateUserRequest, UserResponse};
use crate::models::CreateUser;
use crate::startup::AppState;
use crate::utils::hash_password;

/// Register a new user account.
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    tracing::info!(email = %payload.email, "Creating user");

    let password_hash = hash_password(&payload.password)?;
    let user = state
        .store
        .create_user(&CreateUser {
            email: payload.email,
            password_hash,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// Get a user by ID.
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<UserResponse>, AppError> {
    let user = state
        .store
        .get_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User not found")))?;

    Ok(Json(UserResponse::from(user)))
}
