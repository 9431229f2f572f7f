//! Persistence abstraction for the billing ledger.
//!
//! `PgStore` is the production implementation; `MemoryStore` backs tests
//! and database-free deployments. Both uphold the same contract: each
//! method is atomic with respect to concurrent calls touching the same
//! subscription or invoice, and the `(subscription_id, issue_date)`
//! uniqueness rule is enforced inside `insert_invoice_and_advance` as the
//! backstop against duplicate billing under concurrent retries.

mod memory;
mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use service_core::error::AppError;
use uuid::Uuid;

use crate::models::{
    CreateInvoice, CreatePlan, CreateSubscription, CreateUser, Invoice, Plan, Subscription, User,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Outcome of an invoice insert attempt.
///
/// `AlreadyExists` carries the invoice that won the race; callers treat it
/// as an idempotent no-op, not a failure.
#[derive(Debug, Clone)]
pub enum InvoiceInsert {
    Created(Invoice),
    AlreadyExists(Invoice),
}

#[async_trait]
pub trait BillingStore: Send + Sync {
    async fn health_check(&self) -> Result<(), AppError>;

    // Users
    async fn create_user(&self, input: &CreateUser) -> Result<User, AppError>;
    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, AppError>;
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    // Plans
    async fn create_plan(&self, input: &CreatePlan) -> Result<Plan, AppError>;
    async fn get_plan(&self, plan_id: Uuid) -> Result<Option<Plan>, AppError>;
    async fn get_plan_by_name(&self, name: &str) -> Result<Option<Plan>, AppError>;
    async fn list_plans(&self) -> Result<Vec<Plan>, AppError>;

    // Subscriptions
    async fn create_subscription(
        &self,
        input: &CreateSubscription,
    ) -> Result<Subscription, AppError>;
    async fn get_subscription(
        &self,
        subscription_id: Uuid,
    ) -> Result<Option<Subscription>, AppError>;
    async fn list_subscriptions_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<Subscription>, AppError>;
    /// Find the user's active subscription to a plan, if any.
    async fn find_active_subscription(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
    ) -> Result<Option<Subscription>, AppError>;
    /// All active subscriptions whose next billing date is exactly `day`.
    async fn list_subscriptions_due(&self, day: NaiveDate) -> Result<Vec<Subscription>, AppError>;
    /// Cancel an active subscription: set end date, clear the next billing
    /// date. Returns `None` when the subscription is missing or no longer
    /// active, leaving the row untouched.
    async fn cancel_subscription(
        &self,
        subscription_id: Uuid,
        end_date: NaiveDate,
    ) -> Result<Option<Subscription>, AppError>;
    /// Compare-and-set advance of `next_billing_date` from `expected` to
    /// `next` on an active subscription. Returns whether a row changed.
    async fn advance_next_billing_date(
        &self,
        subscription_id: Uuid,
        expected: NaiveDate,
        next: NaiveDate,
    ) -> Result<bool, AppError>;

    // Invoices
    async fn get_invoice(&self, invoice_id: Uuid) -> Result<Option<Invoice>, AppError>;
    async fn find_invoice_for_date(
        &self,
        subscription_id: Uuid,
        issue_date: NaiveDate,
    ) -> Result<Option<Invoice>, AppError>;
    async fn list_invoices_for_user(&self, user_id: Uuid) -> Result<Vec<Invoice>, AppError>;
    /// Insert a pending invoice and advance the subscription's next billing
    /// date as one atomic unit. A duplicate `(subscription_id, issue_date)`
    /// yields `InvoiceInsert::AlreadyExists` with nothing written.
    async fn insert_invoice_and_advance(
        &self,
        input: &CreateInvoice,
        next_billing_date: NaiveDate,
    ) -> Result<InvoiceInsert, AppError>;
    /// Pending invoices whose due date has passed as of `today`.
    async fn list_overdue_candidates(&self, today: NaiveDate) -> Result<Vec<Invoice>, AppError>;
    /// Transition one invoice pending -> overdue. Returns false when the
    /// invoice was not pending anymore, which keeps repeated sweeps
    /// idempotent.
    async fn mark_invoice_overdue(&self, invoice_id: Uuid) -> Result<bool, AppError>;
    /// Reminder candidates: pending invoices due exactly on `due_on`, plus
    /// every overdue invoice. The grouping is deliberate: overdue invoices
    /// are reminded on every run regardless of due date.
    async fn list_reminder_candidates(&self, due_on: NaiveDate)
    -> Result<Vec<Invoice>, AppError>;
    /// Transition pending/overdue -> paid with the payment timestamp.
    /// Returns `None` when the invoice is missing or already terminal.
    async fn mark_invoice_paid(
        &self,
        invoice_id: Uuid,
        paid_utc: DateTime<Utc>,
    ) -> Result<Option<Invoice>, AppError>;
}
