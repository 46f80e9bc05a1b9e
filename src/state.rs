use std::sync::Arc;

use tracing::warn;

use crate::{
    articles::repo::{ArticleStore, PgArticleStore},
    auth::repo::{PgUserStore, UserStore},
    config::AppConfig,
    db,
    memory::MemoryStore,
};

/// Per-process handles shared by all requests. Stores are injected, so the
/// same router runs on Postgres or on the in-memory stores.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
    pub articles: Arc<dyn ArticleStore>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let Some(url) = config.database_url.clone() else {
            warn!("DATABASE_URL not set; using in-memory stores, data is lost on restart");
            return Ok(Self::in_memory(config));
        };

        let pool = db::connect(&url, &config.db).await?;
        db::run_migrations(&pool).await;

        Ok(Self::from_parts(
            config,
            Arc::new(PgUserStore::new(pool.clone())),
            Arc::new(PgArticleStore::new(pool)),
        ))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserStore>,
        articles: Arc<dyn ArticleStore>,
    ) -> Self {
        Self {
            config,
            users,
            articles,
        }
    }

    pub fn in_memory(config: Arc<AppConfig>) -> Self {
        let store = Arc::new(MemoryStore::default());
        Self::from_parts(config, store.clone(), store)
    }
}
