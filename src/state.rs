use std::sync::Arc;

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::import::ImportSessionManager;
use crate::storage::PgEntryStore;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Connects to Postgres and applies pending migrations.
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let db = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;

        sqlx::migrate!("./migrations")
            .run(&db)
            .await
            .context("run migrations")?;

        Ok(Self { db, config })
    }

    pub fn from_parts(db: PgPool, config: Arc<AppConfig>) -> Self {
        Self { db, config }
    }

    pub fn entry_store(&self, user_id: Uuid) -> PgEntryStore {
        PgEntryStore::new(self.db.clone(), user_id)
    }

    /// Session manager writing into `user_id`'s food log.
    pub fn import_manager(&self, user_id: Uuid) -> ImportSessionManager<PgEntryStore> {
        ImportSessionManager::new(Arc::new(self.entry_store(user_id)))
            .with_default_resolution(self.config.import.default_resolution)
    }
}
