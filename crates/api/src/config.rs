use std::path::PathBuf;

use obra_events::VapidConfig;

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields except the secrets have defaults suitable for local
/// development. In production, override via environment variables.
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
    /// Directory holding the local cache files (default: `.cache/obra`).
    pub cache_dir: PathBuf,
    /// Lifetime of the cached gallery feed in minutes (default: `30`).
    pub projects_cache_ttl_mins: u64,
    /// Seconds between pending-quote reminders (default: `86400`).
    pub reminder_interval_secs: u64,
    /// Access token verification settings.
    pub jwt: JwtConfig,
    /// Web Push key pair.
    pub vapid: VapidConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default                 |
    /// |---------------------------|-------------------------|
    /// | `HOST`                    | `0.0.0.0`               |
    /// | `PORT`                    | `3000`                  |
    /// | `CORS_ORIGINS`            | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`    | `30`                    |
    /// | `CACHE_DIR`               | `.cache/obra`           |
    /// | `PROJECTS_CACHE_TTL_MINS` | `30`                    |
    /// | `REMINDER_INTERVAL_SECS`  | `86400`                 |
    ///
    /// # Panics
    ///
    /// Panics on unparseable values, or if `JWT_SECRET`, `VAPID_PUBLIC_KEY`
    /// or `VAPID_PRIVATE_KEY` is missing.
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

        let cache_dir = std::env::var("CACHE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(".cache/obra"));

        let projects_cache_ttl_mins: u64 = std::env::var("PROJECTS_CACHE_TTL_MINS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("PROJECTS_CACHE_TTL_MINS must be a valid u64");

        let reminder_interval_secs: u64 = std::env::var("REMINDER_INTERVAL_SECS")
            .unwrap_or_else(|_| "86400".into())
            .parse()
            .expect("REMINDER_INTERVAL_SECS must be a valid u64");
        assert!(reminder_interval_secs > 0, "REMINDER_INTERVAL_SECS must be positive");

        let jwt = JwtConfig::from_env();

        let vapid = VapidConfig::from_env()
            .expect("VAPID_PUBLIC_KEY and VAPID_PRIVATE_KEY must be set in the environment");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            cache_dir,
            projects_cache_ttl_mins,
            reminder_interval_secs,
            jwt,
            vapid,
        }
    }
}
