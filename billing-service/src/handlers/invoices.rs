//! Invoice handlers.

use axum::{
    extract::{Path, State},
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;

use crate::models::Invoice;
use crate::startup::AppState;

/// Get an invoice by ID.
pub async fn get_invoice(
    State(state): State<AppState>,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<Invoice>, AppError> {
    let invoice = state
        .store
        .get_invoice(invoice_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice not found")))?;

    Ok(Json(invoice))
}

/// List all invoices for a user.
pub async fn list_user_invoices(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<Invoice>>, AppError> {
    state
        .store
        .get_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User not found")))?;

    let invoices = state.store.list_invoices_for_user(user_id).await?;

    Ok(Json(invoices))
}

/// Charge an invoice and mark it paid.
pub async fn pay_invoice(
    State(state): State<AppState>,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<Invoice>, AppError> {
    tracing::info!(invoice_id = %invoice_id, "Paying invoice");

    let invoice = state.engine.pay_invoice(invoice_id).await?;

    Ok(Json(invoice))
}
