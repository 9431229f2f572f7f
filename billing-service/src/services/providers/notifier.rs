use super::{ProviderError, ReminderMessage, ReminderNotifier};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

/// Mock reminder notifier for local runs and testing.
///
/// Records every reminder it is asked to send so tests can assert on
/// exactly which invoices were flagged.
#[derive(Default)]
pub struct MockNotifier {
    send_count: AtomicU64,
    sent: Mutex<Vec<ReminderMessage>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn send_count(&self) -> u64 {
        self.send_count.load(Ordering::SeqCst)
    }

    pub async fn sent(&self) -> Vec<ReminderMessage> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl ReminderNotifier for MockNotifier {
    async fn send_reminder(&self, reminder: &ReminderMessage) -> Result<(), ProviderError> {
        self.send_count.fetch_add(1, Ordering::SeqCst);
        self.sent.lock().await.push(reminder.clone());

        tracing::info!(
            to = %reminder.email,
            invoice_id = %reminder.invoice_id,
            amount = %reminder.amount,
            due_date = %reminder.due_date,
            "[MOCK] Payment reminder would be sent"
        );

        Ok(())
    }
}
