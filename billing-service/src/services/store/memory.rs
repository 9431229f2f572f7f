//! In-memory implementation of the billing store.
//!
//! Used for local runs without a database and for integration tests. All
//! operations take a single lock, so each store call is atomic just like
//! its PostgreSQL counterpart.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use service_core::error::AppError;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::models::{
    CreateInvoice, CreatePlan, CreateSubscription, CreateUser, Invoice, InvoiceStatus, Plan,
    Subscription, SubscriptionStatus, User,
};
use crate::services::store::{BillingStore, InvoiceInsert};

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    plans: HashMap<Uuid, Plan>,
    subscriptions: HashMap<Uuid, Subscription>,
    invoices: HashMap<Uuid, Invoice>,
}

/// Billing store backed by process memory.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BillingStore for MemoryStore {
    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn create_user(&self, input: &CreateUser) -> Result<User, AppError> {
        let mut inner = self.inner.lock().await;

        if inner.users.values().any(|u| u.email == input.email) {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Email already registered"
            )));
        }

        let user = User {
            user_id: Uuid::new_v4(),
            email: input.email.clone(),
            password_hash: input.password_hash.clone(),
            created_utc: Utc::now(),
        };
        inner.users.insert(user.user_id, user.clone());

        Ok(user)
    }

    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, AppError> {
        let inner = self.inner.lock().await;
        Ok(inner.users.get(&user_id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let inner = self.inner.lock().await;
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn create_plan(&self, input: &CreatePlan) -> Result<Plan, AppError> {
        let mut inner = self.inner.lock().await;

        if inner.plans.values().any(|p| p.name == input.name) {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Plan name already exists"
            )));
        }

        let plan = Plan {
            plan_id: Uuid::new_v4(),
            name: input.name.clone(),
            price: input.price,
            description: input.description.clone(),
        };
        inner.plans.insert(plan.plan_id, plan.clone());

        Ok(plan)
    }

    async fn get_plan(&self, plan_id: Uuid) -> Result<Option<Plan>, AppError> {
        let inner = self.inner.lock().await;
        Ok(inner.plans.get(&plan_id).cloned())
    }

    async fn get_plan_by_name(&self, name: &str) -> Result<Option<Plan>, AppError> {
        let inner = self.inner.lock().await;
        Ok(inner.plans.values().find(|p| p.name == name).cloned())
    }

    async fn list_plans(&self) -> Result<Vec<Plan>, AppError> {
        let inner = self.inner.lock().await;
        let mut plans: Vec<Plan> = inner.plans.values().cloned().collect();
        plans.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(plans)
    }

    async fn create_subscription(
        &self,
        input: &CreateSubscription,
    ) -> Result<Subscription, AppError> {
        let mut inner = self.inner.lock().await;

        let now = Utc::now();
        let subscription = Subscription {
            subscription_id: Uuid::new_v4(),
            user_id: input.user_id,
            plan_id: input.plan_id,
            start_date: input.start_date,
            end_date: None,
            status: SubscriptionStatus::Active,
            next_billing_date: Some(input.next_billing_date),
            created_utc: now,
            updated_utc: now,
        };
        inner
            .subscriptions
            .insert(subscription.subscription_id, subscription.clone());

        Ok(subscription)
    }

    async fn get_subscription(
        &self,
        subscription_id: Uuid,
    ) -> Result<Option<Subscription>, AppError> {
        let inner = self.inner.lock().await;
        Ok(inner.subscriptions.get(&subscription_id).cloned())
    }

    async fn list_subscriptions_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<Subscription>, AppError> {
        let inner = self.inner.lock().await;
        let mut subscriptions: Vec<Subscription> = inner
            .subscriptions
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        subscriptions.sort_by_key(|s| s.created_utc);
        Ok(subscriptions)
    }

    async fn find_active_subscription(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
    ) -> Result<Option<Subscription>, AppError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .subscriptions
            .values()
            .find(|s| {
                s.user_id == user_id
                    && s.plan_id == plan_id
                    && s.status == SubscriptionStatus::Active
            })
            .cloned())
    }

    async fn list_subscriptions_due(&self, day: NaiveDate) -> Result<Vec<Subscription>, AppError> {
        let inner = self.inner.lock().await;
        let mut subscriptions: Vec<Subscription> = inner
            .subscriptions
            .values()
            .filter(|s| {
                s.status == SubscriptionStatus::Active && s.next_billing_date == Some(day)
            })
            .cloned()
            .collect();
        subscriptions.sort_by_key(|s| s.created_utc);
        Ok(subscriptions)
    }

    async fn cancel_subscription(
        &self,
        subscription_id: Uuid,
        end_date: NaiveDate,
    ) -> Result<Option<Subscription>, AppError> {
        let mut inner = self.inner.lock().await;

        let Some(subscription) = inner.subscriptions.get_mut(&subscription_id) else {
            return Ok(None);
        };
        if subscription.status != SubscriptionStatus::Active {
            return Ok(None);
        }

        subscription.status = SubscriptionStatus::Cancelled;
        subscription.end_date = Some(end_date);
        subscription.next_billing_date = None;
        subscription.updated_utc = Utc::now();

        Ok(Some(subscription.clone()))
    }

    async fn advance_next_billing_date(
        &self,
        subscription_id: Uuid,
        expected: NaiveDate,
        next: NaiveDate,
    ) -> Result<bool, AppError> {
        let mut inner = self.inner.lock().await;

        let Some(subscription) = inner.subscriptions.get_mut(&subscription_id) else {
            return Ok(false);
        };
        if subscription.status != SubscriptionStatus::Active
            || subscription.next_billing_date != Some(expected)
        {
            return Ok(false);
        }

        subscription.next_billing_date = Some(next);
        subscription.updated_utc = Utc::now();

        Ok(true)
    }

    async fn get_invoice(&self, invoice_id: Uuid) -> Result<Option<Invoice>, AppError> {
        let inner = self.inner.lock().await;
        Ok(inner.invoices.get(&invoice_id).cloned())
    }

    async fn find_invoice_for_date(
        &self,
        subscription_id: Uuid,
        issue_date: NaiveDate,
    ) -> Result<Option<Invoice>, AppError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .invoices
            .values()
            .find(|i| i.subscription_id == subscription_id && i.issue_date == issue_date)
            .cloned())
    }

    async fn list_invoices_for_user(&self, user_id: Uuid) -> Result<Vec<Invoice>, AppError> {
        let inner = self.inner.lock().await;
        let mut invoices: Vec<Invoice> = inner
            .invoices
            .values()
            .filter(|i| i.user_id == user_id)
            .cloned()
            .collect();
        invoices.sort_by_key(|i| i.issue_date);
        Ok(invoices)
    }

    async fn insert_invoice_and_advance(
        &self,
        input: &CreateInvoice,
        next_billing_date: NaiveDate,
    ) -> Result<InvoiceInsert, AppError> {
        let mut inner = self.inner.lock().await;

        // Same guarantee as the unique index on (subscription_id, issue_date).
        if let Some(existing) = inner
            .invoices
            .values()
            .find(|i| {
                i.subscription_id == input.subscription_id && i.issue_date == input.issue_date
            })
            .cloned()
        {
            return Ok(InvoiceInsert::AlreadyExists(existing));
        }

        let invoice = Invoice {
            invoice_id: Uuid::new_v4(),
            user_id: input.user_id,
            plan_id: input.plan_id,
            subscription_id: input.subscription_id,
            amount: input.amount,
            issue_date: input.issue_date,
            due_date: input.due_date,
            status: InvoiceStatus::Pending,
            created_utc: Utc::now(),
            paid_utc: None,
        };
        inner.invoices.insert(invoice.invoice_id, invoice.clone());

        if let Some(subscription) = inner.subscriptions.get_mut(&input.subscription_id) {
            if subscription.status == SubscriptionStatus::Active {
                subscription.next_billing_date = Some(next_billing_date);
                subscription.updated_utc = Utc::now();
            }
        }

        Ok(InvoiceInsert::Created(invoice))
    }

    async fn list_overdue_candidates(&self, today: NaiveDate) -> Result<Vec<Invoice>, AppError> {
        let inner = self.inner.lock().await;
        let mut invoices: Vec<Invoice> = inner
            .invoices
            .values()
            .filter(|i| i.status == InvoiceStatus::Pending && i.due_date < today)
            .cloned()
            .collect();
        invoices.sort_by_key(|i| i.due_date);
        Ok(invoices)
    }

    async fn mark_invoice_overdue(&self, invoice_id: Uuid) -> Result<bool, AppError> {
        let mut inner = self.inner.lock().await;

        let Some(invoice) = inner.invoices.get_mut(&invoice_id) else {
            return Ok(false);
        };
        if invoice.status != InvoiceStatus::Pending {
            return Ok(false);
        }

        invoice.status = InvoiceStatus::Overdue;

        Ok(true)
    }

    async fn list_reminder_candidates(&self, due_on: NaiveDate) -> Result<Vec<Invoice>, AppError> {
        let inner = self.inner.lock().await;
        let mut invoices: Vec<Invoice> = inner
            .invoices
            .values()
            .filter(|i| {
                (i.status == InvoiceStatus::Pending && i.due_date == due_on)
                    || i.status == InvoiceStatus::Overdue
            })
            .cloned()
            .collect();
        invoices.sort_by_key(|i| i.due_date);
        Ok(invoices)
    }

    async fn mark_invoice_paid(
        &self,
        invoice_id: Uuid,
        paid_utc: DateTime<Utc>,
    ) -> Result<Option<Invoice>, AppError> {
        let mut inner = self.inner.lock().await;

        let Some(invoice) = inner.invoices.get_mut(&invoice_id) else {
            return Ok(None);
        };
        match invoice.status {
            InvoiceStatus::Pending | InvoiceStatus::Overdue => {
                invoice.status = InvoiceStatus::Paid;
                invoice.paid_utc = Some(paid_utc);
                Ok(Some(invoice.clone()))
            }
            InvoiceStatus::Paid | InvoiceStatus::Cancelled => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn seeded_subscription(store: &MemoryStore) -> (Uuid, Uuid, Uuid) {
        let user = store
            .create_user(&CreateUser {
                email: "test@example.com".to_string(),
                password_hash: "hash".to_string(),
            })
            .await
            .unwrap();
        let plan = store
            .create_plan(&CreatePlan {
                name: "Pro".to_string(),
                price: Decimal::new(2500, 2),
                description: None,
            })
            .await
            .unwrap();
        let subscription = store
            .create_subscription(&CreateSubscription {
                user_id: user.user_id,
                plan_id: plan.plan_id,
                start_date: date(2024, 3, 10),
                next_billing_date: date(2024, 3, 10),
            })
            .await
            .unwrap();
        (user.user_id, plan.plan_id, subscription.subscription_id)
    }

    fn invoice_input(
        user_id: Uuid,
        plan_id: Uuid,
        subscription_id: Uuid,
        issue_date: NaiveDate,
    ) -> CreateInvoice {
        CreateInvoice {
            user_id,
            plan_id,
            subscription_id,
            amount: Decimal::new(2500, 2),
            issue_date,
            due_date: issue_date + chrono::Duration::days(15),
        }
    }

    #[tokio::test]
    async fn test_duplicate_invoice_insert_returns_existing() {
        let store = MemoryStore::new();
        let (user_id, plan_id, subscription_id) = seeded_subscription(&store).await;
        let input = invoice_input(user_id, plan_id, subscription_id, date(2024, 3, 10));

        let first = store
            .insert_invoice_and_advance(&input, date(2024, 4, 10))
            .await
            .unwrap();
        let InvoiceInsert::Created(created) = first else {
            panic!("first insert should create");
        };

        let second = store
            .insert_invoice_and_advance(&input, date(2024, 4, 10))
            .await
            .unwrap();
        let InvoiceInsert::AlreadyExists(existing) = second else {
            panic!("second insert should hit the duplicate");
        };
        assert_eq!(existing.invoice_id, created.invoice_id);
    }

    #[tokio::test]
    async fn test_insert_advances_next_billing_date() {
        let store = MemoryStore::new();
        let (user_id, plan_id, subscription_id) = seeded_subscription(&store).await;
        let input = invoice_input(user_id, plan_id, subscription_id, date(2024, 3, 10));

        store
            .insert_invoice_and_advance(&input, date(2024, 4, 10))
            .await
            .unwrap();

        let subscription = store
            .get_subscription(subscription_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(subscription.next_billing_date, Some(date(2024, 4, 10)));
    }

    #[tokio::test]
    async fn test_advance_requires_expected_date() {
        let store = MemoryStore::new();
        let (_, _, subscription_id) = seeded_subscription(&store).await;

        let advanced = store
            .advance_next_billing_date(subscription_id, date(2024, 3, 11), date(2024, 4, 11))
            .await
            .unwrap();
        assert!(!advanced, "stale expected date must not advance");

        let advanced = store
            .advance_next_billing_date(subscription_id, date(2024, 3, 10), date(2024, 4, 10))
            .await
            .unwrap();
        assert!(advanced);
    }

    #[tokio::test]
    async fn test_cancel_subscription_only_once() {
        let store = MemoryStore::new();
        let (_, _, subscription_id) = seeded_subscription(&store).await;

        let cancelled = store
            .cancel_subscription(subscription_id, date(2024, 3, 15))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cancelled.status, SubscriptionStatus::Cancelled);
        assert_eq!(cancelled.end_date, Some(date(2024, 3, 15)));
        assert_eq!(cancelled.next_billing_date, None);

        let again = store
            .cancel_subscription(subscription_id, date(2024, 3, 16))
            .await
            .unwrap();
        assert!(again.is_none());
    }

    #[tokio::test]
    async fn test_create_user_duplicate_email_rejected() {
        let store = MemoryStore::new();
        let input = CreateUser {
            email: "dup@example.com".to_string(),
            password_hash: "hash".to_string(),
        };

        store.create_user(&input).await.unwrap();
        let result = store.create_user(&input).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_mark_paid_is_terminal() {
        let store = MemoryStore::new();
        let (user_id, plan_id, subscription_id) = seeded_subscription(&store).await;
        let input = invoice_input(user_id, plan_id, subscription_id, date(2024, 3, 10));

        let InvoiceInsert::Created(invoice) = store
            .insert_invoice_and_advance(&input, date(2024, 4, 10))
            .await
            .unwrap()
        else {
            panic!("insert should create");
        };

        let paid = store
            .mark_invoice_paid(invoice.invoice_id, Utc::now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(paid.status, InvoiceStatus::Paid);
        assert!(paid.paid_utc.is_some());

        let again = store
            .mark_invoice_paid(invoice.invoice_id, Utc::now())
            .await
            .unwrap();
        assert!(again.is_none());

        let overdue = store.mark_invoice_overdue(invoice.invoice_id).await.unwrap();
        assert!(!overdue, "paid invoices must not become overdue");
    }
}
