use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::{info, warn};

use crate::config::AppConfig;

/// Opens the shared pool, retrying the initial connect as configured.
pub async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
    let db = &config.database;
    let options = db.connect_options(!config.is_production())?;
    let attempts = db.retry_attempts.max(1);

    let mut attempt = 1;
    loop {
        let result = PgPoolOptions::new()
            .max_connections(db.max_connections)
            .connect_with(options.clone())
            .await;

        match result {
            Ok(pool) => {
                info!(attempt, "connected to database");
                return Ok(pool);
            }
            Err(e) if attempt < attempts => {
                warn!(
                    error = %e,
                    attempt,
                    attempts,
                    delay_ms = db.retry_delay_ms,
                    "database connect failed; retrying"
                );
                tokio::time::sleep(db.retry_delay()).await;
                attempt += 1;
            }
            Err(e) => {
                return Err(e).with_context(|| format!("connect to database after {attempts} attempts"));
            }
        }
    }
}

/// Applies the embedded migrations. Failure is logged and startup continues.
pub async fn migrate(pool: &PgPool) {
    if let Err(e) = sqlx::migrate!("./migrations").run(pool).await {
        warn!(error = %e, "migration failed; continuing");
    }
}
