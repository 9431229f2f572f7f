//! HTTP handlers for billing-service.

pub mod invoices;
pub mod plans;
pub mod subscriptions;
pub mod users;
