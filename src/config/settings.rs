use std::env;
use crate::error::AppError;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppSettings {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub razorpay: RazorpayConfig,
    pub reconciliation: ReconciliationConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    pub name: String,
    pub environment: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

/// Gateway credentials. Loaded from the environment at startup and injected
/// into the client; never embedded in source.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RazorpayConfig {
    pub key_id: String,
    pub key_secret: String,
    pub base_url: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReconciliationConfig {
    pub enabled: bool,
    /// Six-field cron expression (with seconds) for the sweep job.
    pub schedule: String,
    /// Intents pending for longer than this are queried against the gateway.
    pub pending_max_age_minutes: i64,
    /// Intents the gateway still reports unpaid after this age are abandoned.
    pub abandon_after_minutes: i64,
    pub batch_size: i64,
}

impl AppSettings {
    pub fn from_env() -> Result<Self, AppError> {
        // App config
        let app_name = env::var("APP_NAME").unwrap_or_else(|_| "givecart-payments".to_string());
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        // Database config
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| AppError::Configuration("DATABASE_URL must be set".to_string()))?;

        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<u32>()
            .map_err(|_| AppError::Configuration("DATABASE_MAX_CONNECTIONS must be a valid number".to_string()))?;

        // Server config
        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .map_err(|_| AppError::Configuration("SERVER_PORT must be a valid port number".to_string()))?;

        // CORS origins. The checkout endpoints are called straight from the
        // storefront, so the default stays permissive.
        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        // Razorpay configuration
        let razorpay_key_id = env::var("RAZORPAY_KEY_ID")
            .map_err(|_| AppError::Configuration("RAZORPAY_KEY_ID must be set".to_string()))?;

        let razorpay_key_secret = env::var("RAZORPAY_KEY_SECRET")
            .map_err(|_| AppError::Configuration("RAZORPAY_KEY_SECRET must be set".to_string()))?;

        let razorpay_base_url = env::var("RAZORPAY_BASE_URL")
            .unwrap_or_else(|_| "https://api.razorpay.com/v1".to_string());

        // Reconciliation sweep
        let reconciliation_enabled = env::var("RECONCILIATION_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse::<bool>()
            .map_err(|_| AppError::Configuration("RECONCILIATION_ENABLED must be true or false".to_string()))?;

        let reconciliation_schedule = env::var("RECONCILIATION_SCHEDULE")
            .unwrap_or_else(|_| "0 */10 * * * *".to_string());

        let pending_max_age_minutes = env::var("RECONCILIATION_PENDING_MAX_AGE_MINUTES")
            .unwrap_or_else(|_| "30".to_string())
            .parse::<i64>()
            .map_err(|_| AppError::Configuration("RECONCILIATION_PENDING_MAX_AGE_MINUTES must be a valid number".to_string()))?;

        let abandon_after_minutes = env::var("RECONCILIATION_ABANDON_AFTER_MINUTES")
            .unwrap_or_else(|_| "1440".to_string())
            .parse::<i64>()
            .map_err(|_| AppError::Configuration("RECONCILIATION_ABANDON_AFTER_MINUTES must be a valid number".to_string()))?;

        let batch_size = env::var("RECONCILIATION_BATCH_SIZE")
            .unwrap_or_else(|_| "50".to_string())
            .parse::<i64>()
            .map_err(|_| AppError::Configuration("RECONCILIATION_BATCH_SIZE must be a valid number".to_string()))?;

        Ok(Self {
            app: AppConfig {
                name: app_name,
                environment,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: database_max_connections,
            },
            server: ServerConfig {
                host: server_host,
                port: server_port,
                cors_origins,
            },
            razorpay: RazorpayConfig {
                key_id: razorpay_key_id,
                key_secret: razorpay_key_secret,
                base_url: razorpay_base_url,
            },
            reconciliation: ReconciliationConfig {
                enabled: reconciliation_enabled,
                schedule: reconciliation_schedule,
                pending_max_age_minutes,
                abandon_after_minutes,
                batch_size,
            },
        })
    }
}
