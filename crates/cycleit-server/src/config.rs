//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;

use cycleit_shared::constants::{DEFAULT_HTTP_PORT, DEFAULT_SESSION_TTL_HOURS, MAX_IMAGE_SIZE};

/// Accepted range for `SESSION_TTL_HOURS`: one hour up to one year.
const SESSION_TTL_RANGE_HOURS: std::ops::RangeInclusive<i64> = 1..=24 * 365;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// SQLite database file.
    /// Env: `DATABASE_PATH`
    /// Default: `None` (platform data directory).
    pub database_path: Option<PathBuf>,

    /// Root directory of the object store. One sub-directory per bucket.
    /// Env: `BLOB_STORAGE_PATH`
    /// Default: `./storage`
    pub blob_storage_path: PathBuf,

    /// Base of the public object URLs handed to clients.
    /// Env: `PUBLIC_BASE_URL`
    /// Default: `http://localhost:8080`
    pub public_base_url: String,

    /// Largest accepted image, in bytes.
    /// Env: `MAX_IMAGE_SIZE`
    pub max_image_size: usize,

    /// Session lifetime, clamped to one hour up to one year.
    /// Env: `SESSION_TTL_HOURS`
    pub session_ttl_hours: i64,

    /// Sustained requests per second per client IP.
    /// Env: `RATE_LIMIT_PER_SEC`
    pub rate_limit_per_sec: f64,

    /// Burst size per client IP.
    /// Env: `RATE_LIMIT_BURST`
    pub rate_limit_burst: f64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            database_path: None,
            blob_storage_path: PathBuf::from("./storage"),
            public_base_url: format!("http://localhost:{DEFAULT_HTTP_PORT}"),
            max_image_size: MAX_IMAGE_SIZE,
            session_ttl_hours: DEFAULT_SESSION_TTL_HOURS,
            rate_limit_per_sec: 10.0,
            rate_limit_burst: 30.0,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ServerConfig::from_env`] with an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = lookup("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default");
            }
        }

        if let Some(path) = lookup("DATABASE_PATH") {
            if !path.is_empty() {
                config.database_path = Some(PathBuf::from(path));
            }
        }

        if let Some(path) = lookup("BLOB_STORAGE_PATH") {
            config.blob_storage_path = PathBuf::from(path);
        }

        if let Some(url) = lookup("PUBLIC_BASE_URL") {
            config.public_base_url = url.trim_end_matches('/').to_string();
        }

        parse_into(&lookup, "MAX_IMAGE_SIZE", &mut config.max_image_size);
        parse_into(&lookup, "SESSION_TTL_HOURS", &mut config.session_ttl_hours);
        if !SESSION_TTL_RANGE_HOURS.contains(&config.session_ttl_hours) {
            let clamped = config
                .session_ttl_hours
                .clamp(*SESSION_TTL_RANGE_HOURS.start(), *SESSION_TTL_RANGE_HOURS.end());
            tracing::warn!(
                requested = config.session_ttl_hours,
                clamped,
                "SESSION_TTL_HOURS out of range"
            );
            config.session_ttl_hours = clamped;
        }
        parse_into(&lookup, "RATE_LIMIT_PER_SEC", &mut config.rate_limit_per_sec);
        parse_into(&lookup, "RATE_LIMIT_BURST", &mut config.rate_limit_burst);

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }
}

fn parse_into<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    slot: &mut T,
) {
    if let Some(raw) = lookup(key) {
        match raw.trim().parse::<T>() {
            Ok(value) => *slot = value,
            Err(_) => tracing::warn!(key, value = %raw, "Invalid value, using default"),
        }
    }
}
