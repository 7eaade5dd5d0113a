//! Server configuration loaded from environment variables.
//!
//! Everything is read once at startup and carried in explicit config
//! structs; handlers and domain code never touch the process
//! environment themselves.

use runbridge_cloud::S3Config;
use runbridge_core::urls::{StorageAddressing, StorageUrlConfig};

/// Server configuration.
///
/// All fields except the storage credentials have defaults suitable for
/// local development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Public origin of this service, used to build the callback
    /// endpoints handed to machines (default: `http://localhost:3000`).
    pub public_origin: String,
    /// HMAC secret for API-token validation.
    pub token_secret: String,
    /// Object storage connection settings.
    pub s3: S3Config,
    /// Public URL derivation settings.
    pub urls: StorageUrlConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                 |
    /// |-------------------------|-------------------------|
    /// | `HOST`                  | `0.0.0.0`               |
    /// | `PORT`                  | `3000`                  |
    /// | `CORS_ORIGINS`          | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`  | `30`                    |
    /// | `PUBLIC_ORIGIN`         | `http://localhost:3000` |
    /// | `TOKEN_SECRET`          | **required**            |
    /// | `STORAGE_ENDPOINT`      | **required**            |
    /// | `STORAGE_CDN_ENDPOINT`  | **required**            |
    /// | `STORAGE_BUCKET`        | **required**            |
    /// | `STORAGE_REGION`        | `auto`                  |
    /// | `STORAGE_ACCESS_KEY`    | **required**            |
    /// | `STORAGE_SECRET_KEY`    | **required**            |
    /// | `STORAGE_ADDRESSING`    | `path-style`            |
    ///
    /// # Panics
    ///
    /// Panics on missing required variables or unparseable values --
    /// misconfiguration should fail fast at startup.
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

        let public_origin = std::env::var("PUBLIC_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:3000".into());

        let token_secret =
            std::env::var("TOKEN_SECRET").expect("TOKEN_SECRET must be set in the environment");
        assert!(!token_secret.is_empty(), "TOKEN_SECRET must not be empty");

        let addressing = StorageAddressing::from_name(
            &std::env::var("STORAGE_ADDRESSING").unwrap_or_else(|_| "path-style".into()),
        )
        .expect("STORAGE_ADDRESSING must be a valid addressing mode");

        let endpoint =
            std::env::var("STORAGE_ENDPOINT").expect("STORAGE_ENDPOINT must be set");
        let cdn_endpoint =
            std::env::var("STORAGE_CDN_ENDPOINT").expect("STORAGE_CDN_ENDPOINT must be set");
        let bucket = std::env::var("STORAGE_BUCKET").expect("STORAGE_BUCKET must be set");

        let s3 = S3Config {
            endpoint: endpoint.clone(),
            region: std::env::var("STORAGE_REGION").unwrap_or_else(|_| "auto".into()),
            access_key: std::env::var("STORAGE_ACCESS_KEY")
                .expect("STORAGE_ACCESS_KEY must be set"),
            secret_key: std::env::var("STORAGE_SECRET_KEY")
                .expect("STORAGE_SECRET_KEY must be set"),
            bucket: bucket.clone(),
            force_path_style: addressing == StorageAddressing::PathStyle,
        };

        let urls = StorageUrlConfig {
            endpoint,
            cdn_endpoint,
            bucket,
            addressing,
        };

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            public_origin,
            token_secret,
            s3,
            urls,
        }
    }
}
