use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Invoice, Subscription, User};

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
}

/// User view without the password hash.
#[derive(Serialize)]
pub struct UserResponse {
    pub user_id: Uuid,
    pub email: String,
    pub created_utc: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            user_id: user.user_id,
            email: user.email,
            created_utc: user.created_utc,
        }
    }
}

#[derive(Deserialize)]
pub struct SubscribeRequest {
    pub plan_id: Uuid,
}

#[derive(Serialize)]
pub struct SubscribeResponse {
    pub subscription: Subscription,
    pub initial_invoice: Invoice,
}
