//! API key issuance and resolution.
//!
//! A raw key is `<prefix><random alphanumerics>`. Only its SHA-512 hex digest
//! is stored; the raw form leaves the process exactly once, as the return
//! value of [`SessionManager::issue`].

use rand::{Rng, distr::Alphanumeric};
use sea_orm::ConnectionTrait;
use sha2::{Digest, Sha512};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::SecurityConfig;
use crate::db::repositories::session as session_repo;
use crate::db::{SessionRow, Store};
use crate::domain::{ClientInfo, UserId};
use crate::services::ServiceError;

/// Longest raw key accepted for lookup.
const MAX_RAW_KEY_LEN: usize = 256;

/// Source of candidate raw keys.
pub trait KeySource: Send + Sync {
    fn next_key(&self) -> String;
}

/// Thread-local CSPRNG backed key source.
pub struct RandomKeySource {
    prefix: String,
    length: usize,
}

impl RandomKeySource {
    #[must_use]
    pub fn new(prefix: impl Into<String>, length: usize) -> Self {
        Self {
            prefix: prefix.into(),
            length,
        }
    }
}

impl KeySource for RandomKeySource {
    fn next_key(&self) -> String {
        let body: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(self.length)
            .map(char::from)
            .collect();
        format!("{}{body}", self.prefix)
    }
}

/// One-way digest used as the stored form of a raw key.
#[must_use]
pub fn hash_key(raw_key: &str) -> String {
    hex::encode(Sha512::digest(raw_key.as_bytes()))
}

pub struct SessionManager {
    store: Store,
    keys: Arc<dyn KeySource>,
    prefix: String,
    max_attempts: u32,
}

impl SessionManager {
    #[must_use]
    pub fn new(store: Store, config: &SecurityConfig) -> Self {
        let keys = Arc::new(RandomKeySource::new(
            config.api_key_prefix.clone(),
            config.api_key_length,
        ));
        Self::with_key_source(store, config, keys)
    }

    #[must_use]
    pub fn with_key_source(
        store: Store,
        config: &SecurityConfig,
        keys: Arc<dyn KeySource>,
    ) -> Self {
        Self {
            store,
            keys,
            prefix: config.api_key_prefix.clone(),
            max_attempts: config.max_key_generation_attempts,
        }
    }

    /// Cheap shape check so garbage never reaches storage.
    #[must_use]
    pub fn is_well_formed(&self, raw_key: &str) -> bool {
        raw_key.len() <= MAX_RAW_KEY_LEN
            && raw_key.strip_prefix(self.prefix.as_str()).is_some_and(|body| {
                !body.is_empty() && body.chars().all(|c| c.is_ascii_alphanumeric())
            })
    }

    pub async fn issue(&self, user_id: UserId, client: &ClientInfo) -> Result<String, ServiceError> {
        self.issue_with(&self.store.conn, user_id, client).await
    }

    /// Issues a session on `conn`, which may be an open transaction.
    ///
    /// A candidate whose digest already exists is discarded and a new one
    /// drawn; after `max_key_generation_attempts` collisions issuance fails.
    pub async fn issue_with<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: UserId,
        client: &ClientInfo,
    ) -> Result<String, ServiceError> {
        for attempt in 1..=self.max_attempts {
            let raw_key = self.keys.next_key();
            let key_hash = hash_key(&raw_key);

            if session_repo::hash_exists(conn, &key_hash).await? {
                warn!(attempt, "Generated API key collided with an existing session");
                continue;
            }

            session_repo::insert(
                conn,
                key_hash,
                user_id.value(),
                client.ip_address.clone(),
                client.user_agent.clone(),
            )
            .await?;

            debug!(user_id = %user_id, "Issued session");
            return Ok(raw_key);
        }

        Err(ServiceError::Storage(format!(
            "No unique API key after {} attempts",
            self.max_attempts
        )))
    }

    /// Maps a presented key to its session. Malformed and unknown keys are
    /// both `None`.
    pub async fn resolve(&self, raw_key: &str) -> Result<Option<SessionRow>, ServiceError> {
        if !self.is_well_formed(raw_key) {
            return Ok(None);
        }

        Ok(self.store.find_session(&hash_key(raw_key)).await?)
    }

    pub async fn touch(&self, session: &SessionRow, client: &ClientInfo) -> Result<(), ServiceError> {
        self.store
            .touch_session(session.id, &client.ip_address, &client.user_agent)
            .await?;
        Ok(())
    }

    pub async fn revoke(&self, raw_key: &str) -> Result<bool, ServiceError> {
        if !self.is_well_formed(raw_key) {
            return Ok(false);
        }

        Ok(self.store.delete_session(&hash_key(raw_key)).await?)
    }

    pub async fn list(&self, user_id: UserId) -> Result<Vec<SessionRow>, ServiceError> {
        Ok(self.store.list_sessions(user_id.value()).await?)
    }
}
