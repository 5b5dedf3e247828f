use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;
use sqlx::postgres::PgConnectOptions;
use sqlx::ConnectOptions;

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Full connection string; takes precedence over the discrete fields.
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
    pub max_connections: u32,
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: "localhost".into(),
            port: 5435,
            user: "postgres".into(),
            password: "example".into(),
            name: "order-data".into(),
            max_connections: 10,
            retry_attempts: 3,
            retry_delay_ms: 3000,
        }
    }
}

impl DatabaseConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Builds connect options, with statement logging only outside production.
    pub fn connect_options(&self, log_statements: bool) -> anyhow::Result<PgConnectOptions> {
        let opts = match &self.url {
            Some(url) => url
                .parse::<PgConnectOptions>()
                .context("parse DATABASE_URL")?,
            None => PgConnectOptions::new()
                .host(&self.host)
                .port(self.port)
                .username(&self.user)
                .password(&self.password)
                .database(&self.name),
        };
        Ok(if log_statements {
            opts
        } else {
            opts.disable_statement_logging()
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub environment: String,
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(get: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = DatabaseConfig::default();
        let database = DatabaseConfig {
            url: get("DATABASE_URL").filter(|v| !v.is_empty()),
            host: get("DATABASE_HOST").unwrap_or(defaults.host),
            port: parse_or(get("DATABASE_PORT"), defaults.port),
            user: get("DATABASE_USER").unwrap_or(defaults.user),
            password: get("DATABASE_PASSWORD").unwrap_or(defaults.password),
            name: get("DATABASE_NAME").unwrap_or(defaults.name),
            max_connections: parse_or(get("DATABASE_MAX_CONNECTIONS"), defaults.max_connections),
            retry_attempts: parse_or(get("DATABASE_RETRY_ATTEMPTS"), defaults.retry_attempts),
            retry_delay_ms: parse_or(get("DATABASE_RETRY_DELAY_MS"), defaults.retry_delay_ms),
        };

        let port = match get("APP_PORT") {
            Some(v) => v.parse::<u16>().with_context(|| format!("invalid APP_PORT {v:?}"))?,
            None => 8080,
        };

        Ok(Self {
            database,
            environment: get("APP_ENV")
                .or_else(|| get("NODE_ENV"))
                .unwrap_or_else(|| "development".into()),
            host: get("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.parse::<T>().ok()).unwrap_or(default)
}
