use crate::auth::repo::{PgUserStore, UserStore};
use crate::config::AppConfig;
use crate::memory::{MemoryTaskStore, MemoryUserStore};
use crate::tasks::repo::{PgTaskStore, TaskStore};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
    pub tasks: Arc<dyn TaskStore>,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let config = Arc::new(config);

        if config.uses_memory_store() {
            tracing::warn!("DATABASE_URL=memory; data will not survive a restart");
            return Ok(Self::from_parts(
                config,
                Arc::new(MemoryUserStore::default()),
                Arc::new(MemoryTaskStore::default()),
            ));
        }

        let db = crate::db::connect(&config.database_url).await?;
        crate::db::migrate(&db).await;

        Ok(Self::from_parts(
            config,
            Arc::new(PgUserStore::new(db.clone())),
            Arc::new(PgTaskStore::new(db)),
        ))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserStore>,
        tasks: Arc<dyn TaskStore>,
    ) -> Self {
        Self {
            config,
            users,
            tasks,
        }
    }

    /// Fresh in-memory stores with [`AppConfig::for_tests`].
    pub fn in_memory() -> Self {
        Self::from_parts(
            Arc::new(AppConfig::for_tests()),
            Arc::new(MemoryUserStore::default()),
            Arc::new(MemoryTaskStore::default()),
        )
    }
}
