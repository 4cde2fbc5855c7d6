/// Application context and dependency injection
use crate::{
    config::RegistryConfig,
    crypto::ServerKeeper,
    error::RegistryResult,
    exchange::MessageExchange,
    offers::OfferMachine,
    registry::Registry,
    store::{self, Store},
    tracks::TrackRecorder,
};
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<RegistryConfig>,
    pub store: Arc<Store>,
    pub keeper: Arc<ServerKeeper>,
    pub registry: Arc<Registry>,
    pub exchange: Arc<MessageExchange>,
    pub offers: Arc<OfferMachine>,
    pub tracks: Arc<TrackRecorder>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: RegistryConfig) -> RegistryResult<Self> {
        config.validate()?;

        if !config.storage.data_directory.exists() {
            tokio::fs::create_dir_all(&config.storage.data_directory).await?;
        }

        let pool = store::create_pool(
            &config.storage.registry_db,
            store::DatabaseOptions::default(),
        )
        .await?;
        let store = Arc::new(Store::new(pool).await?);

        // the server identity is an injected capability, not ambient state
        let keeper = match &config.keys.server_seed {
            Some(seed) => Arc::new(ServerKeeper::from_seed_hex(seed)?),
            None => {
                tracing::warn!(
                    "no REGISTRY_SERVER_SEED_HEX configured; using an ephemeral server key"
                );
                Arc::new(ServerKeeper::generate())
            }
        };
        keeper.ensure_registered(&store).await?;

        let registry = Arc::new(Registry::new(Arc::clone(&store)));
        let exchange = Arc::new(MessageExchange::new(Arc::clone(&store)));
        let offers = Arc::new(OfferMachine::new(Arc::clone(&store), Arc::clone(&keeper)));
        let tracks = Arc::new(TrackRecorder::new(
            Arc::clone(&store),
            config.tracks.expiration_delay,
        ));

        Ok(Self {
            config: Arc::new(config),
            store,
            keeper,
            registry,
            exchange,
            offers,
            tracks,
        })
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }

    /// Get the server's own DID
    pub fn server_did(&self) -> &str {
        self.keeper.did()
    }
}
