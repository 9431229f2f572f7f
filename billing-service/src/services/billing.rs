//! Billing cycle engine.
//!
//! Owns the subscription lifecycle and the monthly invoice cycle: initial
//! and renewal invoice generation, the overdue sweep, payment reminders
//! and charge capture. Every operation takes the business date it should
//! act on, so callers decide what "today" means and tests can replay any
//! calendar scenario.

use chrono::{NaiveDate, Utc};
use service_core::error::AppError;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::models::{
    CreateInvoice, CreateSubscription, Invoice, InvoiceStatus, Subscription, SubscriptionStatus,
};
use crate::services::dates::{
    due_date, next_billing_date, reminder_target, BILLING_PERIOD_MONTHS, PAYMENT_TERMS_DAYS,
};
use crate::services::metrics;
use crate::services::providers::{ChargeRequest, PaymentGateway, ReminderMessage, ReminderNotifier};
use crate::services::store::{BillingStore, InvoiceInsert};

pub struct BillingEngine {
    store: Arc<dyn BillingStore>,
    gateway: Arc<dyn PaymentGateway>,
    notifier: Arc<dyn ReminderNotifier>,
}

impl BillingEngine {
    pub fn new(
        store: Arc<dyn BillingStore>,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn ReminderNotifier>,
    ) -> Self {
        Self {
            store,
            gateway,
            notifier,
        }
    }

    /// Subscribe a user to a plan and issue the first invoice.
    ///
    /// The subscription starts today and bills today, so the initial
    /// invoice is generated immediately and the next billing date lands
    /// one month out.
    #[instrument(skip(self), fields(user_id = %user_id, plan_id = %plan_id, today = %today))]
    pub async fn subscribe(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
        today: NaiveDate,
    ) -> Result<(Subscription, Invoice), AppError> {
        self.store
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User {} not found", user_id)))?;
        let plan = self
            .store
            .get_plan(plan_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Plan {} not found", plan_id)))?;

        if self
            .store
            .find_active_subscription(user_id, plan_id)
            .await?
            .is_some()
        {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "User already has an active subscription to this plan"
            )));
        }

        let subscription = self
            .store
            .create_subscription(&CreateSubscription {
                user_id,
                plan_id,
                start_date: today,
                next_billing_date: today,
            })
            .await?;

        let invoice = self
            .generate_invoice(subscription.subscription_id, today)
            .await?;

        // Re-read to pick up the billing date advanced by the invoice.
        let subscription = self
            .store
            .get_subscription(subscription.subscription_id)
            .await?
            .ok_or_else(|| {
                AppError::InternalError(anyhow::anyhow!(
                    "Subscription {} missing after initial invoice",
                    subscription.subscription_id
                ))
            })?;

        info!(
            subscription_id = %subscription.subscription_id,
            plan = %plan.name,
            invoice_id = %invoice.invoice_id,
            "User subscribed"
        );

        Ok((subscription, invoice))
    }

    /// Cancel an active subscription as of today.
    ///
    /// Sets the end date and clears the next billing date, which takes the
    /// subscription out of every future generation run.
    #[instrument(skip(self), fields(subscription_id = %subscription_id, today = %today))]
    pub async fn cancel_subscription(
        &self,
        subscription_id: Uuid,
        today: NaiveDate,
    ) -> Result<Subscription, AppError> {
        let subscription = self
            .store
            .get_subscription(subscription_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(anyhow::anyhow!(
                    "Subscription {} not found",
                    subscription_id
                ))
            })?;

        match subscription.status {
            SubscriptionStatus::Cancelled => Err(AppError::BadRequest(anyhow::anyhow!(
                "Subscription is already cancelled"
            ))),
            SubscriptionStatus::Expired => Err(AppError::BadRequest(anyhow::anyhow!(
                "Subscription is not active"
            ))),
            SubscriptionStatus::Active => {
                let cancelled = self
                    .store
                    .cancel_subscription(subscription_id, today)
                    .await?
                    .ok_or_else(|| {
                        AppError::BadRequest(anyhow::anyhow!("Subscription is not active"))
                    })?;
                Ok(cancelled)
            }
        }
    }

    /// Generate the invoice for a subscription on the given issue date.
    ///
    /// Idempotent per (subscription, issue date): if the invoice already
    /// exists it is returned as-is. A run that created the invoice but
    /// died before moving the billing date forward is repaired here, so a
    /// retry on the same day still pushes the subscription into the next
    /// period instead of re-billing it forever.
    #[instrument(skip(self), fields(subscription_id = %subscription_id, issue_date = %issue_date))]
    pub async fn generate_invoice(
        &self,
        subscription_id: Uuid,
        issue_date: NaiveDate,
    ) -> Result<Invoice, AppError> {
        let subscription = self
            .store
            .get_subscription(subscription_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(anyhow::anyhow!(
                    "Subscription {} not found",
                    subscription_id
                ))
            })?;

        if let Some(existing) = self
            .store
            .find_invoice_for_date(subscription_id, issue_date)
            .await?
        {
            if subscription.next_billing_date == Some(issue_date) {
                let next = next_billing_date(issue_date, BILLING_PERIOD_MONTHS);
                let advanced = self
                    .store
                    .advance_next_billing_date(subscription_id, issue_date, next)
                    .await?;
                if advanced {
                    info!(
                        subscription_id = %subscription_id,
                        next_billing_date = %next,
                        "Billing date repaired for already-invoiced period"
                    );
                }
            }
            debug!(
                invoice_id = %existing.invoice_id,
                "Invoice already exists for this issue date"
            );
            return Ok(existing);
        }

        match subscription.status {
            SubscriptionStatus::Active => {}
            SubscriptionStatus::Cancelled | SubscriptionStatus::Expired => {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "Subscription {} is not active",
                    subscription_id
                )));
            }
        }

        let plan = self
            .store
            .get_plan(subscription.plan_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(anyhow::anyhow!("Plan {} not found", subscription.plan_id))
            })?;

        // Snapshot the plan price; later plan changes must not touch
        // invoices that were already issued.
        let input = CreateInvoice {
            user_id: subscription.user_id,
            plan_id: plan.plan_id,
            subscription_id,
            amount: plan.price,
            issue_date,
            due_date: due_date(issue_date, PAYMENT_TERMS_DAYS),
        };
        let next = next_billing_date(issue_date, BILLING_PERIOD_MONTHS);

        match self.store.insert_invoice_and_advance(&input, next).await? {
            InvoiceInsert::Created(invoice) => {
                let trigger = if issue_date == subscription.start_date {
                    "initial"
                } else {
                    "renewal"
                };
                metrics::record_invoice_generated(trigger);
                info!(
                    invoice_id = %invoice.invoice_id,
                    amount = %invoice.amount,
                    due_date = %invoice.due_date,
                    next_billing_date = %next,
                    trigger = trigger,
                    "Invoice generated"
                );
                Ok(invoice)
            }
            InvoiceInsert::AlreadyExists(invoice) => {
                debug!(
                    invoice_id = %invoice.invoice_id,
                    "Lost the insert race; returning existing invoice"
                );
                Ok(invoice)
            }
        }
    }

    /// Generate invoices for every subscription due today.
    ///
    /// One failing subscription is logged and skipped; the rest of the
    /// batch still runs. Returns how many invoices were handled.
    #[instrument(skip(self), fields(today = %today))]
    pub async fn generate_due_invoices(&self, today: NaiveDate) -> Result<usize, AppError> {
        let due = self.store.list_subscriptions_due(today).await?;
        let candidates = due.len();

        let mut generated = 0;
        for subscription in due {
            match self
                .generate_invoice(subscription.subscription_id, today)
                .await
            {
                Ok(_) => generated += 1,
                Err(e) => {
                    tracing::error!(
                        subscription_id = %subscription.subscription_id,
                        error = %e,
                        "Invoice generation failed; continuing with remaining subscriptions"
                    );
                }
            }
        }

        info!(candidates, generated, "Invoice generation run complete");

        Ok(generated)
    }

    /// Flag every pending invoice whose due date has passed as overdue.
    ///
    /// Safe to run repeatedly: invoices that already left the pending
    /// state are untouched.
    #[instrument(skip(self), fields(today = %today))]
    pub async fn sweep_overdue(&self, today: NaiveDate) -> Result<usize, AppError> {
        let candidates = self.store.list_overdue_candidates(today).await?;

        let mut marked = 0;
        for invoice in candidates {
            match self.store.mark_invoice_overdue(invoice.invoice_id).await {
                Ok(true) => {
                    marked += 1;
                    metrics::record_invoice_overdue();
                    info!(
                        invoice_id = %invoice.invoice_id,
                        due_date = %invoice.due_date,
                        "Invoice marked overdue"
                    );
                }
                Ok(false) => {
                    // Paid or cancelled between the listing and the update.
                    debug!(invoice_id = %invoice.invoice_id, "Invoice left pending state; skipped");
                }
                Err(e) => {
                    tracing::error!(
                        invoice_id = %invoice.invoice_id,
                        error = %e,
                        "Failed to mark invoice overdue; continuing with remaining invoices"
                    );
                }
            }
        }

        info!(marked, "Overdue sweep complete");

        Ok(marked)
    }

    /// Send payment reminders for invoices due soon and for overdue ones.
    ///
    /// Pending invoices are reminded once, three days before their due
    /// date. Overdue invoices are reminded on every run until they are
    /// paid, deliberately at-least-once.
    #[instrument(skip(self), fields(today = %today))]
    pub async fn send_reminders(&self, today: NaiveDate) -> Result<usize, AppError> {
        let due_on = reminder_target(today);
        let candidates = self.store.list_reminder_candidates(due_on).await?;

        let mut sent = 0;
        for invoice in candidates {
            let reason = match invoice.status {
                InvoiceStatus::Pending => "due_soon",
                InvoiceStatus::Overdue => "overdue",
                InvoiceStatus::Paid | InvoiceStatus::Cancelled => continue,
            };

            let user = match self.store.get_user(invoice.user_id).await {
                Ok(Some(user)) => user,
                Ok(None) => {
                    warn!(
                        invoice_id = %invoice.invoice_id,
                        user_id = %invoice.user_id,
                        "Reminder skipped: user not found"
                    );
                    continue;
                }
                Err(e) => {
                    tracing::error!(
                        invoice_id = %invoice.invoice_id,
                        error = %e,
                        "Failed to load user for reminder; continuing with remaining invoices"
                    );
                    continue;
                }
            };

            let reminder = ReminderMessage {
                email: user.email,
                invoice_id: invoice.invoice_id,
                amount: invoice.amount,
                due_date: invoice.due_date,
            };
            match self.notifier.send_reminder(&reminder).await {
                Ok(()) => {
                    sent += 1;
                    metrics::record_reminder_sent(reason);
                }
                Err(e) => {
                    tracing::error!(
                        invoice_id = %invoice.invoice_id,
                        error = %e,
                        "Failed to send reminder; continuing with remaining invoices"
                    );
                }
            }
        }

        info!(sent, "Reminder run complete");

        Ok(sent)
    }

    /// Charge an invoice and mark it paid.
    ///
    /// A declined or failed charge leaves the invoice exactly as it was;
    /// the caller gets a payment-required error and may retry.
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn pay_invoice(&self, invoice_id: Uuid) -> Result<Invoice, AppError> {
        let invoice = self
            .store
            .get_invoice(invoice_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice {} not found", invoice_id)))?;

        match invoice.status {
            InvoiceStatus::Paid => {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "Invoice is already paid"
                )));
            }
            InvoiceStatus::Cancelled => {
                return Err(AppError::BadRequest(anyhow::anyhow!("Invoice is cancelled")));
            }
            InvoiceStatus::Pending | InvoiceStatus::Overdue => {}
        }

        let request = ChargeRequest {
            user_id: invoice.user_id,
            invoice_id,
            amount: invoice.amount,
        };
        let response = match self.gateway.charge(&request).await {
            Ok(response) => response,
            Err(e) => {
                metrics::record_charge("error");
                warn!(invoice_id = %invoice_id, error = %e, "Charge failed; invoice left unpaid");
                return Err(AppError::PaymentRequired(anyhow::anyhow!(
                    "Charge failed: {}",
                    e
                )));
            }
        };

        if !response.approved {
            metrics::record_charge("declined");
            warn!(
                invoice_id = %invoice_id,
                reason = response.message.as_deref().unwrap_or("none given"),
                "Charge declined; invoice left unpaid"
            );
            return Err(AppError::PaymentRequired(anyhow::anyhow!(
                "Charge declined: {}",
                response.message.as_deref().unwrap_or("no reason given")
            )));
        }

        metrics::record_charge("approved");

        let paid = self
            .store
            .mark_invoice_paid(invoice_id, Utc::now())
            .await?
            .ok_or_else(|| {
                AppError::BadRequest(anyhow::anyhow!("Invoice cannot be paid in its current state"))
            })?;

        Ok(paid)
    }
}
