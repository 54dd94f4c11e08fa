use std::time::Duration;

use anyhow::{Context, Result, bail};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
use tracing::info;

use crate::config::DatabaseConfig;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const SQLITE_BUSY_TIMEOUT_MS: u64 = 5_000;
const ENTITY_REGISTRY_PATH: &str = "pdfquiz_server::db::entities::*";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbFlavor {
    Postgres,
    Sqlite,
}

impl DbFlavor {
    pub fn from_url(url: &str) -> Result<Self> {
        let normalized = url.trim().to_ascii_lowercase();
        if normalized.starts_with("postgres://") || normalized.starts_with("postgresql://") {
            return Ok(Self::Postgres);
        }
        if normalized.starts_with("sqlite:") {
            return Ok(Self::Sqlite);
        }
        bail!(
            "unsupported database url '{}'; expected scheme postgres://, postgresql://, or sqlite:",
            redact_url(url)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DbFlavor::Postgres => "postgres",
            DbFlavor::Sqlite => "sqlite",
        }
    }
}

/// Opens the pool, applies per-backend session settings and syncs the schema
/// from the entity registry.
pub async fn connect(cfg: &DatabaseConfig) -> Result<DatabaseConnection> {
    let flavor = DbFlavor::from_url(&cfg.url)?;

    let mut options = ConnectOptions::new(cfg.url.clone());
    options
        .max_connections(cfg.max_connections)
        .min_connections(cfg.min_idle)
        .connect_timeout(CONNECT_TIMEOUT)
        .sqlx_logging(false);

    let db = Database::connect(options)
        .await
        .with_context(|| format!("failed to connect to {} database", flavor.as_str()))?;

    if flavor == DbFlavor::Sqlite {
        db.execute_unprepared("PRAGMA foreign_keys = ON").await?;
        db.execute_unprepared(&format!("PRAGMA busy_timeout = {SQLITE_BUSY_TIMEOUT_MS}"))
            .await?;
    }

    info!(backend = flavor.as_str(), "syncing database schema from entities");
    db.get_schema_registry(ENTITY_REGISTRY_PATH)
        .sync(&db)
        .await
        .context("failed to sync database schema")?;
    Ok(db)
}

fn redact_url(url: &str) -> String {
    let trimmed = url.trim();
    if let Some((scheme, _)) = trimmed.split_once("://") {
        format!("{scheme}://<redacted>")
    } else if let Some((scheme, _)) = trimmed.split_once(':') {
        format!("{scheme}:<redacted>")
    } else {
        "<invalid-url>".to_string()
    }
}
