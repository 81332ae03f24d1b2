use canteiro_billing::BillingConfig;
use canteiro_events::EmailConfig;

use crate::auth::jwt::JwtConfig;

/// Which storage backend serves attachment bytes.
#[derive(Debug, Clone)]
pub enum StorageBackend {
    /// S3 bucket name.
    S3(String),
    /// Local directory root.
    Local(String),
}

/// Server configuration loaded from environment variables.
///
/// All fields except secrets have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Maximum accepted attachment upload in bytes (default: 25 MiB).
    pub max_upload_bytes: usize,
    /// JWT token configuration (secret, expiry durations).
    pub jwt: JwtConfig,
    /// Stripe configuration; `None` disables the webhook endpoint.
    pub billing: Option<BillingConfig>,
    /// SMTP configuration; `None` disables email notifications.
    pub email: Option<EmailConfig>,
    /// Attachment storage backend.
    pub storage: StorageBackend,
}

const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                 |
    /// |------------------------|-------------------------|
    /// | `HOST`                 | `0.0.0.0`               |
    /// | `PORT`                 | `3000`                  |
    /// | `CORS_ORIGINS`         | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                    |
    /// | `MAX_UPLOAD_BYTES`     | `26214400`              |
    /// | `S3_BUCKET`            | — (unset selects local) |
    /// | `LOCAL_STORAGE_DIR`    | `./data/attachments`    |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let max_upload_bytes: usize = std::env::var("MAX_UPLOAD_BYTES")
            .unwrap_or_else(|_| DEFAULT_MAX_UPLOAD_BYTES.to_string())
            .parse()
            .expect("MAX_UPLOAD_BYTES must be a valid usize");

        let storage = match std::env::var("S3_BUCKET") {
            Ok(bucket) => StorageBackend::S3(bucket),
            Err(_) => StorageBackend::Local(
                std::env::var("LOCAL_STORAGE_DIR")
                    .unwrap_or_else(|_| "./data/attachments".into()),
            ),
        };

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            max_upload_bytes,
            jwt: JwtConfig::from_env(),
            billing: BillingConfig::from_env(),
            email: EmailConfig::from_env(),
            storage,
        }
    }
}
