//! User model.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Registered account that owns subscriptions and invoices.
///
/// Deliberately not `Serialize`: the password hash must never reach a
/// response body. Handlers convert to a response type instead.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub user_id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub created_utc: DateTime<Utc>,
}

/// Input for creating a user. The password is hashed before it gets here.
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub email: String,
    pub password_hash: String,
}
