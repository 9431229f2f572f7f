//! Test helper module for billing-service integration tests.
//!
//! Spawns the application on the in-memory store so tests need no
//! external services, and hands out the engine and provider mocks so
//! date-sensitive scenarios can be driven directly.

#![allow(dead_code)]

use billing_service::config::{BillingConfig, PaymentConfig, SchedulerConfig};
use billing_service::models::CreateUser;
use billing_service::services::providers::{MockGateway, MockNotifier};
use billing_service::services::{BillingEngine, BillingStore};
use billing_service::startup::Application;
use service_core::config::Config as CoreConfig;
use std::sync::Arc;
use uuid::Uuid;

/// Test application wrapper for integration tests.
pub struct TestApp {
    pub http_address: String,
    pub port: u16,
    pub client: reqwest::Client,
    pub engine: Arc<BillingEngine>,
    pub store: Arc<dyn BillingStore>,
    pub gateway: Arc<MockGateway>,
    pub notifier: Arc<MockNotifier>,
}

impl TestApp {
    /// Spawn a test application whose gateway approves every charge.
    pub async fn spawn() -> Self {
        Self::spawn_with_success_rate(1.0).await
    }

    /// Spawn a test application whose gateway declines every charge.
    pub async fn spawn_declining() -> Self {
        Self::spawn_with_success_rate(0.0).await
    }

    async fn spawn_with_success_rate(success_rate: f64) -> Self {
        let config = BillingConfig {
            common: CoreConfig {
                port: 0, // Random port
                log_level: "warn".to_string(),
            },
            service_name: "billing-service-test".to_string(),
            otlp_endpoint: None,
            database: None, // In-memory store
            scheduler: SchedulerConfig {
                enabled: false,
                hour_utc: 1,
            },
            payment: PaymentConfig { success_rate },
        };

        let app = Application::build(config)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let http_address = format!("http://127.0.0.1:{}", port);
        let engine = app.engine();
        let store = app.store();
        let gateway = app.gateway();
        let notifier = app.notifier();

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for HTTP server to be ready by polling health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("http://127.0.0.1:{}/health", port);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            http_address,
            port,
            client,
            engine,
            store,
            gateway,
            notifier,
        }
    }

    /// Create a user directly in the store, skipping password hashing.
    pub async fn seed_user(&self, email: &str) -> Uuid {
        let user = self
            .store
            .create_user(&CreateUser {
                email: email.to_string(),
                password_hash: "$argon2id$test-only$not-a-real-hash".to_string(),
            })
            .await
            .expect("Failed to seed user");
        user.user_id
    }

    /// Look up a seeded catalog plan by name.
    pub async fn plan_id(&self, name: &str) -> Uuid {
        self.store
            .get_plan_by_name(name)
            .await
            .expect("Failed to look up plan")
            .unwrap_or_else(|| panic!("Plan {} not seeded", name))
            .plan_id
    }
}

/// Unique email per test so runs never collide on the unique constraint.
pub fn unique_email(prefix: &str) -> String {
    format!("{}-{}@example.com", prefix, Uuid::new_v4())
}
