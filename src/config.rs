use anyhow::Context;
use serde::Deserialize;

use crate::import::ConflictResolution;

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    pub filter: String,
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "mealmind_import=debug,sqlx=warn".into(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImportConfig {
    pub default_resolution: ConflictResolution,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub log: LogConfig,
    pub import: ImportConfig,
}

impl AppConfig {
    /// Reads `.env` (if present) and the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let database_url = var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let db_max_connections = match var("DB_MAX_CONNECTIONS") {
            Some(v) => v
                .parse::<u32>()
                .with_context(|| format!("DB_MAX_CONNECTIONS is not a number: {v}"))?,
            None => 5,
        };
        let log = LogConfig {
            filter: var("RUST_LOG").unwrap_or_else(|| LogConfig::default().filter),
            json: var("LOG_FORMAT").map(|v| v == "json").unwrap_or(false),
        };
        let default_resolution = match var("IMPORT_DEFAULT_RESOLUTION") {
            Some(v) => v.parse::<ConflictResolution>().map_err(anyhow::Error::msg)?,
            None => ConflictResolution::default(),
        };

        Ok(Self {
            database_url,
            db_max_connections,
            log,
            import: ImportConfig { default_resolution },
        })
    }
}
