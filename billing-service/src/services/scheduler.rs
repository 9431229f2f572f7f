//! Daily billing scheduler.
//!
//! Runs the billing cycle once a day at a configured UTC hour. The cycle
//! is three jobs in a fixed order; the sweep runs before reminders so an
//! invoice that went overdue today is reminded in the same run.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use service_core::error::AppError;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument};

use crate::services::billing::BillingEngine;
use crate::services::metrics;

/// The jobs of the daily billing cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DailyJob {
    GenerateInvoices,
    SweepOverdue,
    SendReminders,
}

impl DailyJob {
    pub fn name(&self) -> &'static str {
        match self {
            DailyJob::GenerateInvoices => "generate_invoices",
            DailyJob::SweepOverdue => "sweep_overdue",
            DailyJob::SendReminders => "send_reminders",
        }
    }
}

/// Execution order of the daily cycle.
pub const DAILY_JOBS: [DailyJob; 3] = [
    DailyJob::GenerateInvoices,
    DailyJob::SweepOverdue,
    DailyJob::SendReminders,
];

pub struct Scheduler {
    engine: Arc<BillingEngine>,
    hour_utc: u32,
}

impl Scheduler {
    pub fn new(engine: Arc<BillingEngine>, hour_utc: u32) -> Self {
        Self {
            engine,
            hour_utc: hour_utc.min(23),
        }
    }

    /// Run a single job for the given business date.
    pub async fn run_job(&self, job: DailyJob, today: NaiveDate) -> Result<usize, AppError> {
        match job {
            DailyJob::GenerateInvoices => self.engine.generate_due_invoices(today).await,
            DailyJob::SweepOverdue => self.engine.sweep_overdue(today).await,
            DailyJob::SendReminders => self.engine.send_reminders(today).await,
        }
    }

    /// Run the full daily cycle in order.
    ///
    /// A failing job is recorded and the rest of the cycle still runs;
    /// one bad job must not stall the whole billing day.
    #[instrument(skip(self), fields(today = %today))]
    pub async fn run_daily_cycle(&self, today: NaiveDate) {
        for job in DAILY_JOBS {
            match self.run_job(job, today).await {
                Ok(handled) => {
                    metrics::record_scheduler_run(job.name(), "completed");
                    info!(job = job.name(), handled, "Scheduler job completed");
                }
                Err(e) => {
                    metrics::record_scheduler_run(job.name(), "failed");
                    error!(
                        job = job.name(),
                        error = %e,
                        "Scheduler job failed; continuing cycle"
                    );
                }
            }
        }
    }

    fn duration_until_next_run(&self, now: DateTime<Utc>) -> Duration {
        let run_time = NaiveTime::from_hms_opt(self.hour_utc, 0, 0).unwrap_or(NaiveTime::MIN);
        let today_run = now.date_naive().and_time(run_time).and_utc();
        let next_run = if today_run > now {
            today_run
        } else {
            (now.date_naive() + chrono::Duration::days(1))
                .and_time(run_time)
                .and_utc()
        };
        (next_run - now).to_std().unwrap_or(Duration::from_secs(60))
    }

    /// Spawn the daily loop on the runtime.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(hour_utc = self.hour_utc, "Billing scheduler started");
            loop {
                let wait = self.duration_until_next_run(Utc::now());
                tokio::time::sleep(wait).await;

                let today = Utc::now().date_naive();
                info!(today = %today, "Starting daily billing cycle");
                self.run_daily_cycle(today).await;
            }
        })
    }
}
