use super::{ChargeRequest, ChargeResponse, PaymentGateway, ProviderError};
use async_trait::async_trait;
use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};

/// Mock payment gateway for local runs and testing.
///
/// Approves a configurable fraction of charges; the rest come back
/// declined, which leaves the invoice unpaid.
pub struct MockGateway {
    success_rate: f64,
    approved_count: AtomicU64,
    declined_count: AtomicU64,
}

impl MockGateway {
    pub fn new(success_rate: f64) -> Self {
        Self {
            success_rate: success_rate.clamp(0.0, 1.0),
            approved_count: AtomicU64::new(0),
            declined_count: AtomicU64::new(0),
        }
    }

    /// Gateway that approves every charge.
    pub fn approving() -> Self {
        Self::new(1.0)
    }

    /// Gateway that declines every charge.
    pub fn declining() -> Self {
        Self::new(0.0)
    }

    pub fn approved_count(&self) -> u64 {
        self.approved_count.load(Ordering::SeqCst)
    }

    pub fn declined_count(&self) -> u64 {
        self.declined_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn charge(&self, request: &ChargeRequest) -> Result<ChargeResponse, ProviderError> {
        let approved = rand::thread_rng().gen::<f64>() < self.success_rate;

        if approved {
            let count = self.approved_count.fetch_add(1, Ordering::SeqCst) + 1;

            tracing::info!(
                user_id = %request.user_id,
                invoice_id = %request.invoice_id,
                amount = %request.amount,
                "[MOCK] Charge would be captured"
            );

            Ok(ChargeResponse::approved(Some(format!(
                "mock-charge-{}",
                count
            ))))
        } else {
            self.declined_count.fetch_add(1, Ordering::SeqCst);

            tracing::warn!(
                user_id = %request.user_id,
                invoice_id = %request.invoice_id,
                amount = %request.amount,
                "[MOCK] Charge would be declined"
            );

            Ok(ChargeResponse::declined("Card declined".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn request() -> ChargeRequest {
        ChargeRequest {
            user_id: Uuid::new_v4(),
            invoice_id: Uuid::new_v4(),
            amount: Decimal::new(2500, 2),
        }
    }

    #[tokio::test]
    async fn test_approving_gateway_always_approves() {
        let gateway = MockGateway::approving();

        for _ in 0..10 {
            let response = gateway.charge(&request()).await.unwrap();
            assert!(response.approved);
            assert!(response.reference.is_some());
        }

        assert_eq!(gateway.approved_count(), 10);
        assert_eq!(gateway.declined_count(), 0);
    }

    #[tokio::test]
    async fn test_declining_gateway_always_declines() {
        let gateway = MockGateway::declining();

        for _ in 0..10 {
            let response = gateway.charge(&request()).await.unwrap();
            assert!(!response.approved);
            assert!(response.message.is_some());
        }

        assert_eq!(gateway.approved_count(), 0);
        assert_eq!(gateway.declined_count(), 10);
    }

    #[test]
    fn test_success_rate_is_clamped() {
        let gateway = MockGateway::new(1.5);
        assert_eq!(gateway.success_rate, 1.0);

        let gateway = MockGateway::new(-0.5);
        assert_eq!(gateway.success_rate, 0.0);
    }
}
