//! Billing plan model.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Billing plan. Immutable reference data; the price is consulted once at
/// invoice-generation time and snapshotted onto the invoice, so later price
/// changes never alter issued invoices.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Plan {
    pub plan_id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub description: Option<String>,
}

/// Input for creating a plan.
#[derive(Debug, Clone)]
pub struct CreatePlan {
    pub name: String,
    pub price: Decimal,
    pub description: Option<String>,
}

/// Plans seeded at startup when absent.
pub fn default_catalog() -> Vec<CreatePlan> {
    vec![
        CreatePlan {
            name: "Basic".to_string(),
            price: Decimal::new(1000, 2),
            description: Some("Basic plan with limited features".to_string()),
        },
        CreatePlan {
            name: "Pro".to_string(),
            price: Decimal::new(2500, 2),
            description: Some("Pro plan with all features".to_string()),
        },
        CreatePlan {
            name: "Enterprise".to_string(),
            price: Decimal::new(7500, 2),
            description: Some("Enterprise plan with all features and priority support".to_string()),
        },
    ]
}
