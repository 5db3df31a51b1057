use std::sync::Arc;
use tokio::sync::RwLock;

use crate::auth::{PasswordHasher, TokenIssuer};
use crate::config::Config;
use crate::db::Store;
use crate::services::{AuthService, SeaOrmAuthService};

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub store: Store,

    pub auth_service: Arc<dyn AuthService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.database.url,
            config.database.max_connections,
            config.database.min_connections,
        )
        .await?;

        let hasher = PasswordHasher::new(
            config.auth.argon2_memory_cost_kib,
            config.auth.argon2_time_cost,
            config.auth.argon2_parallelism,
        )?;
        let tokens = TokenIssuer::new(
            &config.auth.token_secret,
            chrono::Duration::days(config.auth.token_ttl_days),
        );

        let auth_service = Arc::new(SeaOrmAuthService::new(
            store.clone(),
            hasher,
            tokens,
            config.auth.default_nickname.clone(),
        )) as Arc<dyn AuthService + Send + Sync + 'static>;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            store,
            auth_service,
        })
    }
}
