// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration loading from environment variables.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use roster_core::persistence::{self, PoolSettings};
use roster_core::{PostgresStore, Store};
use sqlx::postgres::{PgConnectOptions, PgSslMode};

/// Where the store lives.
#[derive(Clone)]
pub enum DatabaseConfig {
    /// A full `postgres://` or `sqlite:` URL.
    Url(String),
    /// PostgreSQL connection parts. TLS is required but the server
    /// certificate is not verified.
    Parts {
        /// Database host.
        host: String,
        /// Database port.
        port: u16,
        /// Login user.
        username: String,
        /// Login password.
        password: String,
        /// Database name.
        database: String,
    },
}

impl DatabaseConfig {
    /// Open a pooled store for this configuration.
    pub async fn connect(&self, settings: &PoolSettings) -> roster_core::Result<Arc<dyn Store>> {
        match self {
            Self::Url(url) => persistence::connect(url, settings).await,
            Self::Parts {
                host,
                port,
                username,
                password,
                database,
            } => {
                let options = PgConnectOptions::new()
                    .host(host)
                    .port(*port)
                    .username(username)
                    .password(password)
                    .database(database)
                    .ssl_mode(PgSslMode::Require);
                let store = PostgresStore::connect_with(options, settings).await?;
                Ok(Arc::new(store))
            }
        }
    }
}

// Credentials stay out of logs.
impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => {
                let scheme = url.split(':').next().unwrap_or_default();
                f.debug_tuple("Url").field(&format!("{}:…", scheme)).finish()
            }
            Self::Parts {
                host,
                port,
                username,
                database,
                ..
            } => {
                let mut parts = f.debug_struct("Parts");
                parts.field("host", host);
                parts.field("port", port);
                parts.field("username", username);
                parts.field("password", &"***");
                parts.field("database", database);
                parts.finish()
            }
        }
    }
}

/// Roster server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Store location
    pub database: DatabaseConfig,
    /// HTTP listen address
    pub http_addr: SocketAddr,
    /// Maximum pooled database connections
    pub max_connections: u32,
    /// How long a request waits for a pooled connection
    pub acquire_timeout: Duration,
    /// Create the collection tables on startup if missing
    pub bootstrap_schema: bool,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Database (one of):
    /// - `ROSTER_DATABASE_URL`: PostgreSQL or SQLite connection string
    /// - `DB_HOST`, `DB_USERNAME`, `DB_PASSWORD`, `DB_NAME` (and optional
    ///   `DB_PORT`, default 5432): PostgreSQL connection parts
    ///
    /// Optional (with defaults):
    /// - `ROSTER_HTTP_PORT`: HTTP server port (default: 3500)
    /// - `ROSTER_DB_MAX_CONNECTIONS`: Pool size (default: 10)
    /// - `ROSTER_DB_ACQUIRE_TIMEOUT_SECS`: Pool acquire timeout (default: 30)
    /// - `ROSTER_BOOTSTRAP_SCHEMA`: Create tables if missing (default: false)
    pub fn from_env() -> Result<Self, ConfigError> {
        let database = match std::env::var("ROSTER_DATABASE_URL") {
            Ok(url) => DatabaseConfig::Url(url),
            Err(_) => DatabaseConfig::Parts {
                host: required("DB_HOST")?,
                port: parsed("DB_PORT", 5432, "must be a valid port number")?,
                username: required("DB_USERNAME")?,
                password: required("DB_PASSWORD")?,
                database: required("DB_NAME")?,
            },
        };

        let http_port: u16 = parsed("ROSTER_HTTP_PORT", 3500, "must be a valid port number")?;

        let max_connections: u32 = parsed(
            "ROSTER_DB_MAX_CONNECTIONS",
            10,
            "must be a positive integer",
        )?;
        if max_connections == 0 {
            return Err(ConfigError::Invalid(
                "ROSTER_DB_MAX_CONNECTIONS",
                "must be a positive integer",
            ));
        }

        let acquire_timeout_secs: u64 = parsed(
            "ROSTER_DB_ACQUIRE_TIMEOUT_SECS",
            30,
            "must be a non-negative integer",
        )?;

        let bootstrap_schema = match std::env::var("ROSTER_BOOTSTRAP_SCHEMA") {
            Err(_) => false,
            Ok(raw) => match raw.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" | "" => false,
                _ => {
                    return Err(ConfigError::Invalid(
                        "ROSTER_BOOTSTRAP_SCHEMA",
                        "must be true or false",
                    ));
                }
            },
        };

        Ok(Self {
            database,
            http_addr: SocketAddr::from(([0, 0, 0, 0], http_port)),
            max_connections,
            acquire_timeout: Duration::from_secs(acquire_timeout_secs),
            bootstrap_schema,
        })
    }

    /// Pool settings derived from this configuration.
    pub fn pool_settings(&self) -> PoolSettings {
        PoolSettings {
            max_connections: self.max_connections,
            acquire_timeout: self.acquire_timeout,
        }
    }
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::Missing(key))
}

fn parsed<T: std::str::FromStr>(
    key: &'static str,
    default: T,
    expectation: &'static str,
) -> Result<T, ConfigError> {
    let Ok(raw) = std::env::var(key) else {
        return Ok(default);
    };
    let invalid = ConfigError::Invalid(key, expectation);
    raw.parse().map_err(|_| invalid)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),

    /// An environment variable has an invalid value.
    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, &'static str),
}
