use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::AppConfig;
use crate::rate_limit::{CounterStore, InMemoryCounterStore};

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<AppConfig>,
    pub limiter: Arc<dyn CounterStore>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let db = crate::db::connect(&config.database_url).await?;
        Ok(Self::from_parts(db, config))
    }

    pub fn from_parts(db: SqlitePool, config: Arc<AppConfig>) -> Self {
        let limiter =
            Arc::new(InMemoryCounterStore::new(config.rate_limit.clone())) as Arc<dyn CounterStore>;
        Self {
            db,
            config,
            limiter,
        }
    }
}
