//! Services module for billing-service.

pub mod billing;
pub mod dates;
pub mod metrics;
pub mod providers;
pub mod scheduler;
pub mod store;

pub use billing::BillingEngine;
pub use metrics::{get_metrics, init_metrics};
pub use scheduler::Scheduler;
pub use store::{BillingStore, MemoryStore, PgStore};
