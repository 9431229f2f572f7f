use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub service_name: String,
    pub otlp_endpoint: Option<String>,
    /// When absent, the service runs on the in-memory store.
    pub database: Option<DatabaseConfig>,
    pub scheduler: SchedulerConfig,
    pub payment: PaymentConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub hour_utc: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    pub success_rate: f64,
}

impl BillingConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        let database = match env::var("DATABASE_URL") {
            Ok(url) => Some(DatabaseConfig {
                url,
                max_connections: get_env("DATABASE_MAX_CONNECTIONS", Some("5"), is_prod)?
                    .parse()
                    .unwrap_or(5),
                min_connections: get_env("DATABASE_MIN_CONNECTIONS", Some("1"), is_prod)?
                    .parse()
                    .unwrap_or(1),
            }),
            Err(_) if is_prod => {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "DATABASE_URL is required in production but not set"
                )));
            }
            Err(_) => None,
        };

        Ok(BillingConfig {
            common: common_config,
            service_name: get_env("SERVICE_NAME", Some("billing-service"), is_prod)?,
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok(),
            database,
            scheduler: SchedulerConfig {
                enabled: env::var("SCHEDULER_ENABLED")
                    .unwrap_or_else(|_| "true".to_string())
                    .parse()
                    .unwrap_or(true),
                hour_utc: get_env("SCHEDULER_HOUR_UTC", Some("1"), is_prod)?
                    .parse()
                    .unwrap_or(1),
            },
            payment: PaymentConfig {
                success_rate: get_env("PAYMENT_SUCCESS_RATE", Some("0.9"), is_prod)?
                    .parse()
                    .unwrap_or(0.9),
            },
        })
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}
