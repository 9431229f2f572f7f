//! Metrics module for billing-service.
//! Provides Prometheus metrics for the billing cycle: invoice generation,
//! overdue sweeps, reminders, charges and scheduler runs.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;
use prometheus::{
    histogram_opts, opts, register_histogram_vec, register_int_counter, register_int_counter_vec,
    Encoder, HistogramVec, IntCounter, IntCounterVec, TextEncoder,
};
use std::sync::OnceLock;

/// Recorder handle for the HTTP-layer metrics emitted via the `metrics` facade.
pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Database query duration histogram
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        histogram_opts!(
            "billing_db_query_duration_seconds",
            "Database query duration"
        ),
        &["operation"]
    )
    .expect("Failed to register DB_QUERY_DURATION")
});

/// Invoices generated counter
pub static INVOICES_GENERATED_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Invoices marked overdue counter
pub static INVOICES_OVERDUE_TOTAL: OnceLock<IntCounter> = OnceLock::new();

/// Payment reminders sent counter
pub static REMINDERS_SENT_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Charge attempts counter
pub static CHARGES_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Scheduler job runs counter
pub static SCHEDULER_RUNS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Initialize all metrics. Call once at startup.
pub fn init_metrics() {
    let builder = PrometheusBuilder::new();
    let handle = builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    if METRICS_HANDLE.set(handle).is_err() {
        panic!("failed to set metrics handle: already initialized");
    }

    INVOICES_GENERATED_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "billing_invoices_generated_total",
                "Total invoices generated by trigger"
            ),
            &["trigger"]
        )
        .expect("Failed to register INVOICES_GENERATED_TOTAL")
    });

    INVOICES_OVERDUE_TOTAL.get_or_init(|| {
        register_int_counter!(opts!(
            "billing_invoices_overdue_total",
            "Total invoices marked overdue"
        ))
        .expect("Failed to register INVOICES_OVERDUE_TOTAL")
    });

    REMINDERS_SENT_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "billing_reminders_sent_total",
                "Total payment reminders sent by reason"
            ),
            &["reason"]
        )
        .expect("Failed to register REMINDERS_SENT_TOTAL")
    });

    CHARGES_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!("billing_charges_total", "Total charge attempts by outcome"),
            &["outcome"]
        )
        .expect("Failed to register CHARGES_TOTAL")
    });

    SCHEDULER_RUNS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "billing_scheduler_runs_total",
                "Total scheduler job runs by job and status"
            ),
            &["job", "status"]
        )
        .expect("Failed to register SCHEDULER_RUNS_TOTAL")
    });

    // Force initialization of lazy statics
    let _ = &*DB_QUERY_DURATION;
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let mut output = METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string());

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).ok();
    if let Ok(custom_metrics) = String::from_utf8(buffer) {
        output.push_str(&custom_metrics);
    }

    output
}

/// Record a generated invoice.
pub fn record_invoice_generated(trigger: &str) {
    if let Some(counter) = INVOICES_GENERATED_TOTAL.get() {
        counter.with_label_values(&[trigger]).inc();
    }
}

/// Record an invoice transitioning to overdue.
pub fn record_invoice_overdue() {
    if let Some(counter) = INVOICES_OVERDUE_TOTAL.get() {
        counter.inc();
    }
}

/// Record a payment reminder.
pub fn record_reminder_sent(reason: &str) {
    if let Some(counter) = REMINDERS_SENT_TOTAL.get() {
        counter.with_label_values(&[reason]).inc();
    }
}

/// Record a charge attempt.
pub fn record_charge(outcome: &str) {
    if let Some(counter) = CHARGES_TOTAL.get() {
        counter.with_label_values(&[outcome]).inc();
    }
}

/// Record a scheduler job run.
pub fn record_scheduler_run(job: &str, status: &str) {
    if let Some(counter) = SCHEDULER_RUNS_TOTAL.get() {
        counter.with_label_values(&[job, status]).inc();
    }
}
