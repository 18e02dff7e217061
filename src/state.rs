use std::sync::Arc;

use tracing::{info, warn};

use crate::auth::{
    jwt::JwtKeys,
    repo::{MemoryUserStore, PgUserStore, UserStore},
};
use crate::config::AppConfig;
use crate::contact::repo::{ContactStore, MemoryContactStore, PgContactStore};
use crate::db;
use crate::products::repo::{MemoryProductStore, PgProductStore, ProductStore};
use crate::storage::{self, BlobStore, MemoryStorage};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub jwt: JwtKeys,
    pub users: Arc<dyn UserStore>,
    pub products: Arc<dyn ProductStore>,
    pub contacts: Arc<dyn ContactStore>,
    pub storage: Arc<dyn BlobStore>,
}

impl AppState {
    /// Builds the long-lived collaborators once: the database pool (plus
    /// migrations) and the blob store named by the config.
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let storage = storage::from_config(&config.storage).await?;

        let Some(database_url) = config.database_url.clone() else {
            warn!("DATABASE_URL not set; using in-memory stores, data will not survive a restart");
            return Ok(Self::from_parts(
                config,
                Arc::new(MemoryUserStore::default()),
                Arc::new(MemoryProductStore::default()),
                Arc::new(MemoryContactStore::default()),
                storage,
            ));
        };

        let pool = db::connect(&database_url).await?;
        if let Err(e) = db::migrate(&pool).await {
            warn!(error = %e, "migration failed; continuing");
        }
        info!("persistence ready");

        Ok(Self::from_parts(
            config,
            Arc::new(PgUserStore::new(pool.clone())),
            Arc::new(PgProductStore::new(pool.clone())),
            Arc::new(PgContactStore::new(pool)),
            storage,
        ))
    }

    pub fn from_parts(
        config: AppConfig,
        users: Arc<dyn UserStore>,
        products: Arc<dyn ProductStore>,
        contacts: Arc<dyn ContactStore>,
        storage: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            jwt: JwtKeys::from(&config.jwt),
            config: Arc::new(config),
            users,
            products,
            contacts,
            storage,
        }
    }

    /// Everything in process memory; used by tests.
    pub fn in_memory(config: AppConfig) -> Self {
        Self::from_parts(
            config,
            Arc::new(MemoryUserStore::default()),
            Arc::new(MemoryProductStore::default()),
            Arc::new(MemoryContactStore::default()),
            Arc::new(MemoryStorage::default()),
        )
    }
}
