//! Domain models for billing-service.

mod invoice;
mod plan;
mod subscription;
mod user;

pub use invoice::{CreateInvoice, Invoice, InvoiceStatus};
pub use plan::{CreatePlan, Plan, default_catalog};
pub use subscription::{CreateSubscription, Subscription, SubscriptionStatus};
pub use user::{CreateUser, User};
