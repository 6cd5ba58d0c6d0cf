//! Process-wide cache of role and university reference data.
//!
//! Loaded lazily on first use and kept until [`ReferenceCache::invalidate`]
//! is called, after which the next reader reloads from storage.

use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use crate::db::Store;
use crate::services::ServiceError;

#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    pub roles: BTreeMap<i32, String>,
    pub universities: BTreeMap<i32, String>,
}

impl ReferenceData {
    #[must_use]
    pub fn role_name(&self, role_id: i32) -> Option<&str> {
        self.roles.get(&role_id).map(String::as_str)
    }

    #[must_use]
    pub fn role_id(&self, name: &str) -> Option<i32> {
        self.roles
            .iter()
            .find_map(|(id, role)| (role == name).then_some(*id))
    }

    #[must_use]
    pub fn has_university(&self, university_id: i32) -> bool {
        self.universities.contains_key(&university_id)
    }
}

pub struct ReferenceCache {
    store: Store,
    data: RwLock<Option<Arc<ReferenceData>>>,
}

impl ReferenceCache {
    #[must_use]
    pub fn new(store: Store) -> Self {
        Self {
            store,
            data: RwLock::new(None),
        }
    }

    /// Returns the cached snapshot, loading it if nothing is cached.
    pub async fn get(&self) -> Result<Arc<ReferenceData>, ServiceError> {
        if let Some(data) = self.data.read().await.as_ref() {
            return Ok(Arc::clone(data));
        }

        let mut slot = self.data.write().await;
        if let Some(data) = slot.as_ref() {
            return Ok(Arc::clone(data));
        }

        let data = Arc::new(self.fetch().await?);
        *slot = Some(Arc::clone(&data));
        Ok(data)
    }

    /// Replaces the cached snapshot with a fresh read from storage.
    pub async fn load(&self) -> Result<Arc<ReferenceData>, ServiceError> {
        let data = Arc::new(self.fetch().await?);
        *self.data.write().await = Some(Arc::clone(&data));
        Ok(data)
    }

    pub async fn invalidate(&self) {
        *self.data.write().await = None;
        info!("Reference data cache invalidated");
    }

    async fn fetch(&self) -> Result<ReferenceData, ServiceError> {
        let roles = self.store.list_roles().await?;
        let universities = self.store.list_universities().await?;

        info!(
            roles = roles.len(),
            universities = universities.len(),
            "Loaded reference data"
        );

        Ok(ReferenceData {
            roles: roles.into_iter().map(|r| (r.id, r.name)).collect(),
            universities: universities.into_iter().map(|u| (u.id, u.name)).collect(),
        })
    }
}
