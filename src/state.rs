use std::{convert::Infallible, sync::Arc};

use warp::Filter;

use crate::{
    authentication::{cryptography::generate_secret, jwt::TokenSigner},
    config::Config,
    database::{
        actions::PgStore,
        connection::{migrate, wait_for_db},
        error::QueryError,
        memory::MemoryStore,
        store::Store,
    },
    error::Error,
    services::media::MediaStorage,
};

/// Shared handles every request handler receives.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub tokens: Arc<TokenSigner>,
    pub media: Arc<MediaStorage>,
}

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Storage(#[from] QueryError),

    #[error("Invalid token configuration: {0}")]
    Tokens(Error),
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, tokens: TokenSigner, media: MediaStorage) -> Self {
        Self {
            store,
            tokens: Arc::new(tokens),
            media: Arc::new(media),
        }
    }

    /// Builds the state described by `config`, waiting for and migrating the
    /// database when a PostgreSQL url is configured.
    pub async fn from_config(config: &Config) -> Result<Self, StartupError> {
        let store: Arc<dyn Store> = if config.uses_memory_store() {
            log::warn!("DATABASE_URL is \"memory\", data will not survive a restart");
            Arc::new(MemoryStore::new())
        } else {
            let pool =
                wait_for_db(&config.database_url, config.max_connections, config.db_wait).await?;
            migrate(&pool).await?;
            Arc::new(PgStore::new(pool))
        };

        let secret = config.jwt_secret.to_owned().unwrap_or_else(|| {
            log::warn!("JWT_SECRET is not set, issued tokens will not survive a restart");
            generate_secret()
        });
        let tokens =
            TokenSigner::new(secret.as_bytes(), config.token_ttl).map_err(StartupError::Tokens)?;

        Ok(Self::new(store, tokens, MediaStorage::new(&config.media_root)))
    }
}

pub fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}
