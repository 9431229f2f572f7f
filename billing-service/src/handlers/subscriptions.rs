//! Subscription lifecycle handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use service_core::error::AppError;
use uuid::Uuid;

use crate::dtos::{SubscribeRequest, SubscribeResponse};
use crate::models::Subscription;
use crate::startup::AppState;

/// Subscribe a user to a plan. Issues the initial invoice immediately.
pub async fn create_subscription(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<SubscribeRequest>,
) -> Result<(StatusCode, Json<SubscribeResponse>), AppError> {
    tracing::info!(user_id = %user_id, plan_id = %payload.plan_id, "Creating subscription");

    let today = Utc::now().date_naive();
    let (subscription, initial_invoice) =
        state.engine.subscribe(user_id, payload.plan_id, today).await?;

    Ok((
        StatusCode::CREATED,
        Json(SubscribeResponse {
            subscription,
            initial_invoice,
        }),
    ))
}

/// Cancel a subscription as of today.
pub async fn cancel_subscription(
    State(state): State<AppState>,
    Path(subscription_id): Path<Uuid>,
) -> Result<Json<Subscription>, AppError> {
    tracing::info!(subscription_id = %subscription_id, "Cancelling subscription");

    let today = Utc::now().date_naive();
    let subscription = state
        .engine
        .cancel_subscription(subscription_id, today)
        .await?;

    Ok(Json(subscription))
}

/// List all subscriptions for a user.
pub async fn list_user_subscriptions(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<Subscription>>, AppError> {
    state
        .store
        .get_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User not found")))?;

    let subscriptions = state.store.list_subscriptions_for_user(user_id).await?;

    Ok(Json(subscriptions))
}
