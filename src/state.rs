use std::sync::Arc;

use crate::config::Config;
use crate::db::Store;
use crate::services::{
    AccountService, EventService, PictureService, PolicyTable, ReferenceCache, RoleGate,
    SeaOrmAccountService, SeaOrmEventService, SessionManager,
};

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub store: Store,

    pub reference: Arc<ReferenceCache>,

    pub gate: Arc<RoleGate>,

    pub sessions: Arc<SessionManager>,

    pub pictures: Arc<PictureService>,

    pub account_service: Arc<dyn AccountService>,

    pub event_service: Arc<dyn EventService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let state = Self::with_store(config, store);
        state.reference.load().await?;
        Ok(state)
    }

    #[must_use]
    pub fn with_store(config: Config, store: Store) -> Self {
        let config = Arc::new(config);

        let reference = Arc::new(ReferenceCache::new(store.clone()));
        let gate = Arc::new(RoleGate::new(
            reference.clone(),
            PolicyTable::from_config(&config.policy),
        ));
        let sessions = Arc::new(SessionManager::new(store.clone(), &config.security));
        let pictures = Arc::new(PictureService::new(&config.general.images_path));

        let account_service = Arc::new(SeaOrmAccountService::new(
            store.clone(),
            config.clone(),
            sessions.clone(),
            gate.clone(),
            reference.clone(),
        )) as Arc<dyn AccountService>;

        let event_service = Arc::new(SeaOrmEventService::new(
            store.clone(),
            gate.clone(),
            pictures.clone(),
        )) as Arc<dyn EventService>;

        Self {
            config,
            store,
            reference,
            gate,
            sessions,
            pictures,
            account_service,
            event_service,
        }
    }
}
