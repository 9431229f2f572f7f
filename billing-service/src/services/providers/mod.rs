pub mod notifier;
pub mod payment;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

pub use notifier::MockNotifier;
pub use payment::MockGateway;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Charge error: {0}")]
    ChargeFailed(String),

    #[error("Send error: {0}")]
    SendFailed(String),
}

#[derive(Debug, Clone)]
pub struct ChargeRequest {
    pub user_id: Uuid,
    pub invoice_id: Uuid,
    pub amount: Decimal,
}

#[derive(Debug, Clone)]
pub struct ChargeResponse {
    pub reference: Option<String>,
    pub approved: bool,
    pub message: Option<String>,
}

impl ChargeResponse {
    pub fn approved(reference: Option<String>) -> Self {
        Self {
            reference,
            approved: true,
            message: None,
        }
    }

    pub fn declined(message: String) -> Self {
        Self {
            reference: None,
            approved: false,
            message: Some(message),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReminderMessage {
    pub email: String,
    pub invoice_id: Uuid,
    pub amount: Decimal,
    pub due_date: NaiveDate,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn charge(&self, request: &ChargeRequest) -> Result<ChargeResponse, ProviderError>;
}

#[async_trait]
pub trait ReminderNotifier: Send + Sync {
    async fn send_reminder(&self, reminder: &ReminderMessage) -> Result<(), ProviderError>;
}
