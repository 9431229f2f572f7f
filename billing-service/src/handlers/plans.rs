//! Plan catalog handlers.

use axum::{extract::State, Json};
use service_core::error::AppError;

use crate::models::Plan;
use crate::startup::AppState;

/// List the plan catalog.
pub async fn list_plans(State(state): State<AppState>) -> Result<Json<Vec<Plan>>, AppError> {
    let plans = state.store.list_plans().await?;
    Ok(Json(plans))
}
