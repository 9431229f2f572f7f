//! PostgreSQL implementation of the billing store.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::models::{
    CreateInvoice, CreatePlan, CreateSubscription, CreateUser, Invoice, InvoiceStatus, Plan,
    Subscription, SubscriptionStatus, User,
};
use crate::services::metrics::DB_QUERY_DURATION;
use crate::services::store::{BillingStore, InvoiceInsert};

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "billing-service"))]
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }
}

#[async_trait]
impl BillingStore for PgStore {
    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["health_check"])
            .start_timer();

        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;

        timer.observe_duration();
        Ok(())
    }

    #[instrument(skip(self, input), fields(email = %input.email))]
    async fn create_user(&self, input: &CreateUser) -> Result<User, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_user"])
            .start_timer();

        let user_id = Uuid::new_v4();
        let result = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (user_id, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING user_id, email, password_hash, created_utc
            "#,
        )
        .bind(user_id)
        .bind(&input.email)
        .bind(&input.password_hash)
        .fetch_one(&self.pool)
        .await;

        let user = match result {
            Ok(user) => user,
            Err(sqlx::Error::Database(ref db_err)) if db_err.is_unique_violation() => {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "Email already registered"
                )));
            }
            Err(e) => {
                return Err(AppError::DatabaseError(anyhow::anyhow!(
                    "Failed to create user: {}",
                    e
                )));
            }
        };

        timer.observe_duration();
        info!(user_id = %user.user_id, "User created");

        Ok(user)
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_user"])
            .start_timer();

        let user = sqlx::query_as::<_, User>(
            "SELECT user_id, email, password_hash, created_utc FROM users WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get user: {}", e)))?;

        timer.observe_duration();

        Ok(user)
    }

    #[instrument(skip(self, email))]
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_user_by_email"])
            .start_timer();

        let user = sqlx::query_as::<_, User>(
            "SELECT user_id, email, password_hash, created_utc FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get user: {}", e)))?;

        timer.observe_duration();

        Ok(user)
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    async fn create_plan(&self, input: &CreatePlan) -> Result<Plan, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_plan"])
            .start_timer();

        let plan_id = Uuid::new_v4();
        let result = sqlx::query_as::<_, Plan>(
            r#"
            INSERT INTO plans (plan_id, name, price, description)
            VALUES ($1, $2, $3, $4)
            RETURNING plan_id, name, price, description
            "#,
        )
        .bind(plan_id)
        .bind(&input.name)
        .bind(input.price)
        .bind(&input.description)
        .fetch_one(&self.pool)
        .await;

        let plan = match result {
            Ok(plan) => plan,
            Err(sqlx::Error::Database(ref db_err)) if db_err.is_unique_violation() => {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "Plan name already exists"
                )));
            }
            Err(e) => {
                return Err(AppError::DatabaseError(anyhow::anyhow!(
                    "Failed to create plan: {}",
                    e
                )));
            }
        };

        timer.observe_duration();
        info!(plan_id = %plan.plan_id, name = %plan.name, "Plan created");

        Ok(plan)
    }

    #[instrument(skip(self), fields(plan_id = %plan_id))]
    async fn get_plan(&self, plan_id: Uuid) -> Result<Option<Plan>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_plan"])
            .start_timer();

        let plan = sqlx::query_as::<_, Plan>(
            "SELECT plan_id, name, price, description FROM plans WHERE plan_id = $1",
        )
        .bind(plan_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get plan: {}", e)))?;

        timer.observe_duration();

        Ok(plan)
    }

    #[instrument(skip(self, name))]
    async fn get_plan_by_name(&self, name: &str) -> Result<Option<Plan>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_plan_by_name"])
            .start_timer();

        let plan = sqlx::query_as::<_, Plan>(
            "SELECT plan_id, name, price, description FROM plans WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get plan: {}", e)))?;

        timer.observe_duration();

        Ok(plan)
    }

    #[instrument(skip(self))]
    async fn list_plans(&self) -> Result<Vec<Plan>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_plans"])
            .start_timer();

        let plans = sqlx::query_as::<_, Plan>(
            "SELECT plan_id, name, price, description FROM plans ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list plans: {}", e)))?;

        timer.observe_duration();

        Ok(plans)
    }

    #[instrument(skip(self, input), fields(user_id = %input.user_id, plan_id = %input.plan_id))]
    async fn create_subscription(
        &self,
        input: &CreateSubscription,
    ) -> Result<Subscription, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_subscription"])
            .start_timer();

        let subscription_id = Uuid::new_v4();
        let subscription = sqlx::query_as::<_, Subscription>(
            r#"
            INSERT INTO subscriptions (subscription_id, user_id, plan_id, start_date, status, next_billing_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING subscription_id, user_id, plan_id, start_date, end_date, status,
                      next_billing_date, created_utc, updated_utc
            "#,
        )
        .bind(subscription_id)
        .bind(input.user_id)
        .bind(input.plan_id)
        .bind(input.start_date)
        .bind(SubscriptionStatus::Active)
        .bind(input.next_billing_date)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to create subscription: {}", e))
        })?;

        timer.observe_duration();
        info!(subscription_id = %subscription.subscription_id, "Subscription created");

        Ok(subscription)
    }

    #[instrument(skip(self), fields(subscription_id = %subscription_id))]
    async fn get_subscription(
        &self,
        subscription_id: Uuid,
    ) -> Result<Option<Subscription>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_subscription"])
            .start_timer();

        let subscription = sqlx::query_as::<_, Subscription>(
            r#"
            SELECT subscription_id, user_id, plan_id, start_date, end_date, status,
                   next_billing_date, created_utc, updated_utc
            FROM subscriptions
            WHERE subscription_id = $1
            "#,
        )
        .bind(subscription_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to get subscription: {}", e))
        })?;

        timer.observe_duration();

        Ok(subscription)
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn list_subscriptions_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<Subscription>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_subscriptions_for_user"])
            .start_timer();

        let subscriptions = sqlx::query_as::<_, Subscription>(
            r#"
            SELECT subscription_id, user_id, plan_id, start_date, end_date, status,
                   next_billing_date, created_utc, updated_utc
            FROM subscriptions
            WHERE user_id = $1
            ORDER BY created_utc
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to list subscriptions: {}", e))
        })?;

        timer.observe_duration();

        Ok(subscriptions)
    }

    #[instrument(skip(self), fields(user_id = %user_id, plan_id = %plan_id))]
    async fn find_active_subscription(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
    ) -> Result<Option<Subscription>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["find_active_subscription"])
            .start_timer();

        let subscription = sqlx::query_as::<_, Subscription>(
            r#"
            SELECT subscription_id, user_id, plan_id, start_date, end_date, status,
                   next_billing_date, created_utc, updated_utc
            FROM subscriptions
            WHERE user_id = $1 AND plan_id = $2 AND status = $3
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(plan_id)
        .bind(SubscriptionStatus::Active)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to find subscription: {}", e))
        })?;

        timer.observe_duration();

        Ok(subscription)
    }

    #[instrument(skip(self), fields(day = %day))]
    async fn list_subscriptions_due(&self, day: NaiveDate) -> Result<Vec<Subscription>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_subscriptions_due"])
            .start_timer();

        let subscriptions = sqlx::query_as::<_, Subscription>(
            r#"
            SELECT subscription_id, user_id, plan_id, start_date, end_date, status,
                   next_billing_date, created_utc, updated_utc
            FROM subscriptions
            WHERE status = $1 AND next_billing_date = $2
            ORDER BY created_utc
            "#,
        )
        .bind(SubscriptionStatus::Active)
        .bind(day)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to list due subscriptions: {}", e))
        })?;

        timer.observe_duration();

        Ok(subscriptions)
    }

    #[instrument(skip(self), fields(subscription_id = %subscription_id))]
    async fn cancel_subscription(
        &self,
        subscription_id: Uuid,
        end_date: NaiveDate,
    ) -> Result<Option<Subscription>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["cancel_subscription"])
            .start_timer();

        let subscription = sqlx::query_as::<_, Subscription>(
            r#"
            UPDATE subscriptions
            SET status = $3, end_date = $2, next_billing_date = NULL, updated_utc = now()
            WHERE subscription_id = $1 AND status = $4
            RETURNING subscription_id, user_id, plan_id, start_date, end_date, status,
                      next_billing_date, created_utc, updated_utc
            "#,
        )
        .bind(subscription_id)
        .bind(end_date)
        .bind(SubscriptionStatus::Cancelled)
        .bind(SubscriptionStatus::Active)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to cancel subscription: {}", e))
        })?;

        timer.observe_duration();

        if let Some(sub) = &subscription {
            info!(
                subscription_id = %sub.subscription_id,
                end_date = %end_date,
                "Subscription cancelled"
            );
        }

        Ok(subscription)
    }

    #[instrument(skip(self), fields(subscription_id = %subscription_id, next = %next))]
    async fn advance_next_billing_date(
        &self,
        subscription_id: Uuid,
        expected: NaiveDate,
        next: NaiveDate,
    ) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["advance_next_billing_date"])
            .start_timer();

        let result = sqlx::query(
            r#"
            UPDATE subscriptions
            SET next_billing_date = $3, updated_utc = now()
            WHERE subscription_id = $1 AND next_billing_date = $2 AND status = $4
            "#,
        )
        .bind(subscription_id)
        .bind(expected)
        .bind(next)
        .bind(SubscriptionStatus::Active)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to advance billing date: {}", e))
        })?;

        timer.observe_duration();

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    async fn get_invoice(&self, invoice_id: Uuid) -> Result<Option<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_invoice"])
            .start_timer();

        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT invoice_id, user_id, plan_id, subscription_id, amount, issue_date,
                   due_date, status, created_utc, paid_utc
            FROM invoices
            WHERE invoice_id = $1
            "#,
        )
        .bind(invoice_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get invoice: {}", e)))?;

        timer.observe_duration();

        Ok(invoice)
    }

    #[instrument(skip(self), fields(subscription_id = %subscription_id, issue_date = %issue_date))]
    async fn find_invoice_for_date(
        &self,
        subscription_id: Uuid,
        issue_date: NaiveDate,
    ) -> Result<Option<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["find_invoice_for_date"])
            .start_timer();

        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT invoice_id, user_id, plan_id, subscription_id, amount, issue_date,
                   due_date, status, created_utc, paid_utc
            FROM invoices
            WHERE subscription_id = $1 AND issue_date = $2
            "#,
        )
        .bind(subscription_id)
        .bind(issue_date)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to find invoice: {}", e)))?;

        timer.observe_duration();

        Ok(invoice)
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn list_invoices_for_user(&self, user_id: Uuid) -> Result<Vec<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_invoices_for_user"])
            .start_timer();

        let invoices = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT invoice_id, user_id, plan_id, subscription_id, amount, issue_date,
                   due_date, status, created_utc, paid_utc
            FROM invoices
            WHERE user_id = $1
            ORDER BY issue_date
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list invoices: {}", e)))?;

        timer.observe_duration();

        Ok(invoices)
    }

    #[instrument(
        skip(self, input),
        fields(subscription_id = %input.subscription_id, issue_date = %input.issue_date)
    )]
    async fn insert_invoice_and_advance(
        &self,
        input: &CreateInvoice,
        next_billing_date: NaiveDate,
    ) -> Result<InvoiceInsert, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["insert_invoice_and_advance"])
            .start_timer();

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let invoice_id = Uuid::new_v4();
        let result = sqlx::query_as::<_, Invoice>(
            r#"
            INSERT INTO invoices (invoice_id, user_id, plan_id, subscription_id, amount,
                                  issue_date, due_date, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING invoice_id, user_id, plan_id, subscription_id, amount, issue_date,
                      due_date, status, created_utc, paid_utc
            "#,
        )
        .bind(invoice_id)
        .bind(input.user_id)
        .bind(input.plan_id)
        .bind(input.subscription_id)
        .bind(input.amount)
        .bind(input.issue_date)
        .bind(input.due_date)
        .bind(InvoiceStatus::Pending)
        .fetch_one(&mut *tx)
        .await;

        let invoice = match result {
            Ok(invoice) => invoice,
            Err(sqlx::Error::Database(ref db_err)) if db_err.is_unique_violation() => {
                // A concurrent run won the race for this issue date. The
                // winner advanced the subscription; nothing left to write.
                tx.rollback().await.ok();
                let existing = self
                    .find_invoice_for_date(input.subscription_id, input.issue_date)
                    .await?
                    .ok_or_else(|| {
                        AppError::DatabaseError(anyhow::anyhow!(
                            "Duplicate invoice reported but none found for subscription {} on {}",
                            input.subscription_id,
                            input.issue_date
                        ))
                    })?;
                timer.observe_duration();
                return Ok(InvoiceInsert::AlreadyExists(existing));
            }
            Err(e) => {
                return Err(AppError::DatabaseError(anyhow::anyhow!(
                    "Failed to insert invoice: {}",
                    e
                )));
            }
        };

        sqlx::query(
            r#"
            UPDATE subscriptions
            SET next_billing_date = $2, updated_utc = now()
            WHERE subscription_id = $1 AND status = $3
            "#,
        )
        .bind(input.subscription_id)
        .bind(next_billing_date)
        .bind(SubscriptionStatus::Active)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to advance billing date: {}", e))
        })?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })?;

        timer.observe_duration();

        info!(
            invoice_id = %invoice.invoice_id,
            subscription_id = %invoice.subscription_id,
            amount = %invoice.amount,
            due_date = %invoice.due_date,
            "Invoice created"
        );

        Ok(InvoiceInsert::Created(invoice))
    }

    #[instrument(skip(self), fields(today = %today))]
    async fn list_overdue_candidates(&self, today: NaiveDate) -> Result<Vec<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_overdue_candidates"])
            .start_timer();

        let invoices = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT invoice_id, user_id, plan_id, subscription_id, amount, issue_date,
                   due_date, status, created_utc, paid_utc
            FROM invoices
            WHERE status = $1 AND due_date < $2
            "#,
        )
        .bind(InvoiceStatus::Pending)
        .bind(today)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to list overdue candidates: {}", e))
        })?;

        timer.observe_duration();

        Ok(invoices)
    }

    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    async fn mark_invoice_overdue(&self, invoice_id: Uuid) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["mark_invoice_overdue"])
            .start_timer();

        let result =
            sqlx::query("UPDATE invoices SET status = $2 WHERE invoice_id = $1 AND status = $3")
                .bind(invoice_id)
                .bind(InvoiceStatus::Overdue)
                .bind(InvoiceStatus::Pending)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow::anyhow!(
                        "Failed to mark invoice overdue: {}",
                        e
                    ))
                })?;

        timer.observe_duration();

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), fields(due_on = %due_on))]
    async fn list_reminder_candidates(&self, due_on: NaiveDate) -> Result<Vec<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_reminder_candidates"])
            .start_timer();

        let invoices = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT invoice_id, user_id, plan_id, subscription_id, amount, issue_date,
                   due_date, status, created_utc, paid_utc
            FROM invoices
            WHERE (status = $1 AND due_date = $2) OR status = $3
            ORDER BY due_date
            "#,
        )
        .bind(InvoiceStatus::Pending)
        .bind(due_on)
        .bind(InvoiceStatus::Overdue)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to list reminder candidates: {}", e))
        })?;

        timer.observe_duration();

        Ok(invoices)
    }

    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    async fn mark_invoice_paid(
        &self,
        invoice_id: Uuid,
        paid_utc: DateTime<Utc>,
    ) -> Result<Option<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["mark_invoice_paid"])
            .start_timer();

        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            UPDATE invoices
            SET status = $2, paid_utc = $3
            WHERE invoice_id = $1 AND status IN ($4, $5)
            RETURNING invoice_id, user_id, plan_id, subscription_id, amount, issue_date,
                      due_date, status, created_utc, paid_utc
            "#,
        )
        .bind(invoice_id)
        .bind(InvoiceStatus::Paid)
        .bind(paid_utc)
        .bind(InvoiceStatus::Pending)
        .bind(InvoiceStatus::Overdue)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to mark invoice paid: {}", e))
        })?;

        timer.observe_duration();

        if let Some(inv) = &invoice {
            info!(invoice_id = %inv.invoice_id, amount = %inv.amount, "Invoice paid");
        }

        Ok(invoice)
    }
}
