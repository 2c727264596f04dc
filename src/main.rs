use anyhow::{Context, bail};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use poslicense::config::Config;
use poslicense::db::{self, queries};
use poslicense::models::MessageStatus;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("poslicense=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    let pool = db::create_pool(&config.database_path, config.db_pool_size)
        .with_context(|| format!("opening database at {}", config.database_path))?;
    let conn = pool.get()?;

    if config.init_db {
        db::init_db(&conn).context("applying schema")?;
        tracing::info!(path = %config.database_path, "Database schema created");
    }

    let report = db::verify_schema(&conn)?;
    if !report.is_complete() {
        tracing::error!(
            missing_tables = ?report.missing_tables,
            missing_columns = ?report.missing_columns,
            missing_indexes = ?report.missing_indexes,
            "Database schema is incomplete (set INIT_DB=true to create it)"
        );
        bail!("database schema verification failed");
    }

    let queued = queries::count_messages_by_status(&conn, MessageStatus::Queued.as_ref())?;
    tracing::info!(
        path = %config.database_path,
        queued_messages = queued,
        "Database schema verified"
    );

    Ok(())
}
