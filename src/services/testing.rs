//! Service wiring over an in-memory store, shared by the service tests.

use std::sync::Arc;

use crate::config::Config;
use crate::db::Store;
use crate::domain::ClientInfo;
use crate::services::account_service::{Account, AccountService, Registration};
use crate::services::authorization::{PolicyTable, RoleGate};
use crate::services::picture::PictureService;
use crate::services::reference::ReferenceCache;
use crate::services::session::{KeySource, SessionManager};
use crate::services::{SeaOrmAccountService, SeaOrmEventService};

pub const PASSWORD: &str = "hunter22";

/// Defaults with argon2 costs low enough for tests.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    config.general.images_path = std::env::temp_dir()
        .join("campus-test-images")
        .to_string_lossy()
        .into_owned();
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;
    config
}

pub fn registration(email: &str, university_id: i32) -> Registration {
    Registration {
        first_name: "Test".to_string(),
        second_name: "User".to_string(),
        third_name: String::new(),
        email: email.to_string(),
        password: PASSWORD.to_string(),
        university_id,
    }
}

pub struct Harness {
    pub store: Store,
    pub accounts: SeaOrmAccountService,
    pub events: SeaOrmEventService,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    pub async fn with_config(config: Config) -> Self {
        Self::build(config, None).await
    }

    /// Harness whose sessions draw raw keys from `keys`.
    pub async fn with_key_source(keys: Arc<dyn KeySource>) -> Self {
        Self::build(test_config(), Some(keys)).await
    }

    async fn build(config: Config, keys: Option<Arc<dyn KeySource>>) -> Self {
        let store = Store::new(&config.general.database_path).await.unwrap();
        let config = Arc::new(config);

        let reference = Arc::new(ReferenceCache::new(store.clone()));
        let gate = Arc::new(RoleGate::new(
            Arc::clone(&reference),
            PolicyTable::from_config(&config.policy),
        ));
        let sessions = Arc::new(match keys {
            Some(keys) => SessionManager::with_key_source(store.clone(), &config.security, keys),
            None => SessionManager::new(store.clone(), &config.security),
        });
        let pictures = Arc::new(PictureService::new(&config.general.images_path));

        Self {
            accounts: SeaOrmAccountService::new(
                store.clone(),
                Arc::clone(&config),
                sessions,
                Arc::clone(&gate),
                reference,
            ),
            events: SeaOrmEventService::new(store.clone(), gate, pictures),
            store,
        }
    }

    pub async fn student(&self, email: &str) -> Account {
        let key = self
            .accounts
            .register(registration(email, 1), &ClientInfo::default())
            .await
            .unwrap();
        let id = self.accounts.resolve_session(&key).await.unwrap().unwrap();
        self.accounts.get_account(id).await.unwrap()
    }

    pub async fn with_role(&self, email: &str, role: &str) -> Account {
        self.student(email).await;
        self.accounts.grant_role(email, role).await.unwrap()
    }
}
