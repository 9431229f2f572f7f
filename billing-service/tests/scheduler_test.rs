//! Scheduler integration tests for billing-service.
//!
//! Exercises the daily cycle against the engine with fixed business
//! dates; the timer loop itself stays off (scheduler disabled in the
//! test config) so nothing fires on wall-clock time.

mod common;

use billing_service::models::{CreateSubscription, InvoiceStatus};
use billing_service::services::scheduler::{DailyJob, Scheduler};
use chrono::NaiveDate;
use common::{unique_email, TestApp};

fn d(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid test date")
}

#[tokio::test]
async fn daily_cycle_generates_invoices_for_due_subscriptions() {
    let app = TestApp::spawn().await;
    let scheduler = Scheduler::new(app.engine.clone(), 1);

    let user_id = app.seed_user(&unique_email("sched-generate")).await;
    let plan = app.store.get_plan_by_name("Basic").await.unwrap().unwrap();

    // A subscription mid-cycle, due for renewal today, with no invoice yet.
    let subscription = app
        .store
        .create_subscription(&CreateSubscription {
            user_id,
            plan_id: plan.plan_id,
            start_date: d(2024, 3, 10),
            next_billing_date: d(2024, 4, 10),
        })
        .await
        .expect("Failed to create subscription");

    scheduler.run_daily_cycle(d(2024, 4, 10)).await;

    let invoice = app
        .store
        .find_invoice_for_date(subscription.subscription_id, d(2024, 4, 10))
        .await
        .expect("Failed to look up invoice")
        .expect("Cycle should have generated the renewal invoice");
    assert_eq!(invoice.status, InvoiceStatus::Pending);
    assert_eq!(invoice.amount, plan.price);
    assert_eq!(invoice.due_date, d(2024, 4, 25));

    let subscription = app
        .store
        .get_subscription(subscription.subscription_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(subscription.next_billing_date, Some(d(2024, 5, 10)));
}

#[tokio::test]
async fn daily_cycle_sweeps_then_reminds_in_the_same_run() {
    let app = TestApp::spawn().await;
    let scheduler = Scheduler::new(app.engine.clone(), 1);

    let user_id = app.seed_user(&unique_email("sched-sweep")).await;
    let plan_id = app.plan_id("Pro").await;

    let (_, invoice) = app
        .engine
        .subscribe(user_id, plan_id, d(2024, 3, 10))
        .await
        .expect("Failed to subscribe");

    // Due 2024-03-25. One cycle the day after both flags the invoice
    // overdue and sends its first overdue reminder.
    scheduler.run_daily_cycle(d(2024, 3, 26)).await;

    let invoice = app
        .store
        .get_invoice(invoice.invoice_id)
        .await
        .unwrap()
        .expect("Invoice should exist");
    assert_eq!(invoice.status, InvoiceStatus::Overdue);

    let reminders = app.notifier.sent().await;
    assert_eq!(reminders.len(), 1);
    assert_eq!(reminders[0].invoice_id, invoice.invoice_id);
}

#[tokio::test]
async fn daily_cycle_is_idempotent_for_the_same_day() {
    let app = TestApp::spawn().await;
    let scheduler = Scheduler::new(app.engine.clone(), 1);

    let user_id = app.seed_user(&unique_email("sched-replay")).await;
    let plan_id = app.plan_id("Basic").await;

    let (subscription, _) = app
        .engine
        .subscribe(user_id, plan_id, d(2024, 3, 10))
        .await
        .expect("Failed to subscribe");

    // Replaying the renewal day produces one invoice, not three.
    scheduler.run_daily_cycle(d(2024, 4, 10)).await;
    scheduler.run_daily_cycle(d(2024, 4, 10)).await;
    scheduler.run_daily_cycle(d(2024, 4, 10)).await;

    let invoices = app.store.list_invoices_for_user(user_id).await.unwrap();
    assert_eq!(invoices.len(), 2); // initial + one renewal

    let subscription = app
        .store
        .get_subscription(subscription.subscription_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(subscription.next_billing_date, Some(d(2024, 5, 10)));
}

#[tokio::test]
async fn individual_jobs_report_how_much_they_handled() {
    let app = TestApp::spawn().await;
    let scheduler = Scheduler::new(app.engine.clone(), 1);

    let user_id = app.seed_user(&unique_email("sched-jobs")).await;
    let plan_id = app.plan_id("Pro").await;

    app.engine
        .subscribe(user_id, plan_id, d(2024, 3, 10))
        .await
        .expect("Failed to subscribe");

    let generated = scheduler
        .run_job(DailyJob::GenerateInvoices, d(2024, 3, 11))
        .await
        .expect("Generation job failed");
    assert_eq!(generated, 0); // nothing due the day after subscribing

    let marked = scheduler
        .run_job(DailyJob::SweepOverdue, d(2024, 3, 26))
        .await
        .expect("Sweep job failed");
    assert_eq!(marked, 1);

    let sent = scheduler
        .run_job(DailyJob::SendReminders, d(2024, 3, 26))
        .await
        .expect("Reminder job failed");
    assert_eq!(sent, 1);
}
