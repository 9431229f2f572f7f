//! Invoice model.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Invoice status.
///
/// `Paid` and `Cancelled` are terminal. `Cancelled` is never set
/// automatically; it is reserved for a future refund/void flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Pending,
    Paid,
    Overdue,
    Cancelled,
}

impl InvoiceStatus {
    /// Get string representation for database and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Invoice issued for one billing cycle of a subscription.
///
/// `amount` is the plan price as of the issue date; `plan_id` and `user_id`
/// are denormalized from the subscription at creation time. At most one
/// invoice exists per `(subscription_id, issue_date)` pair.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Invoice {
    pub invoice_id: Uuid,
    pub user_id: Uuid,
    pub plan_id: Uuid,
    pub subscription_id: Uuid,
    pub amount: Decimal,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub status: InvoiceStatus,
    pub created_utc: DateTime<Utc>,
    pub paid_utc: Option<DateTime<Utc>>,
}

/// Input for creating an invoice. Status starts as `Pending`.
#[derive(Debug, Clone)]
pub struct CreateInvoice {
    pub user_id: Uuid,
    pub plan_id: Uuid,
    pub subscription_id: Uuid,
    pub amount: Decimal,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
}
