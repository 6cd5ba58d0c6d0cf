use anyhow::Result;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DatabaseTransaction, DbErr,
    Statement, TransactionTrait,
};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::entities::{competencies, events, indicators, roles, universities, users};

pub mod migrator;
pub mod repositories;

pub use repositories::event::{EventChanges, NewEvent};
pub use repositories::session::SessionRow;
pub use repositories::user::{CompetenceScore, NewUser, UserChanges};

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        let path_str = db_url.trim_start_matches("sqlite:");
        let in_memory = path_str.starts_with(":memory:");

        if !in_memory {
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        // Every pooled connection to an in-memory database would see its own
        // empty schema, so those run on a single connection.
        let max_connections = if in_memory { 1 } else { max_connections };
        let min_connections = min_connections.min(max_connections);

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    pub async fn begin(&self) -> Result<DatabaseTransaction, DbErr> {
        self.conn.begin().await
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn session_repo(&self) -> repositories::session::SessionRepository {
        repositories::session::SessionRepository::new(self.conn.clone())
    }

    fn indicator_repo(&self) -> repositories::indicator::IndicatorRepository {
        repositories::indicator::IndicatorRepository::new(self.conn.clone())
    }

    fn event_repo(&self) -> repositories::event::EventRepository {
        repositories::event::EventRepository::new(self.conn.clone())
    }

    fn reference_repo(&self) -> repositories::reference::ReferenceRepository {
        repositories::reference::ReferenceRepository::new(self.conn.clone())
    }

    pub async fn get_user(&self, id: i32) -> Result<Option<users::Model>, DbErr> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<users::Model>, DbErr> {
        self.user_repo().get_by_email(email).await
    }

    pub async fn update_user(&self, id: i32, changes: UserChanges) -> Result<(), DbErr> {
        self.user_repo().update(id, changes).await
    }

    pub async fn set_user_role(&self, id: i32, role_id: i32) -> Result<(), DbErr> {
        self.user_repo().set_role(id, role_id).await
    }

    pub async fn user_competencies(&self, user_id: i32) -> Result<Vec<CompetenceScore>, DbErr> {
        self.user_repo().competencies(user_id).await
    }

    pub async fn user_preference_competencies(&self, user_id: i32) -> Result<Vec<i32>, DbErr> {
        self.user_repo().preference_competencies(user_id).await
    }

    pub async fn existing_competence_ids(&self, ids: &[i32]) -> Result<Vec<i32>, DbErr> {
        self.user_repo().existing_competence_ids(ids).await
    }

    pub async fn find_session(&self, key_hash: &str) -> Result<Option<SessionRow>, DbErr> {
        self.session_repo().find_by_hash(key_hash).await
    }

    pub async fn touch_session(
        &self,
        id: i32,
        ip_address: &str,
        user_agent: &str,
    ) -> Result<(), DbErr> {
        self.session_repo().touch(id, ip_address, user_agent).await
    }

    pub async fn delete_session(&self, key_hash: &str) -> Result<bool, DbErr> {
        self.session_repo().delete_by_hash(key_hash).await
    }

    pub async fn list_sessions(&self, user_id: i32) -> Result<Vec<SessionRow>, DbErr> {
        self.session_repo().list_for_user(user_id).await
    }

    pub async fn is_known_ip(&self, user_id: i32, ip_address: &str) -> Result<bool, DbErr> {
        self.session_repo().is_known_ip(user_id, ip_address).await
    }

    pub async fn list_indicators(&self) -> Result<Vec<indicators::Model>, DbErr> {
        self.indicator_repo().list_all().await
    }

    pub async fn get_indicators(&self, ids: &[i32]) -> Result<Vec<indicators::Model>, DbErr> {
        self.indicator_repo().get_by_ids(ids).await
    }

    pub async fn add_indicator(&self, name: &str, positive: bool) -> Result<i32, DbErr> {
        self.indicator_repo().add(name, positive).await
    }

    pub async fn user_indicators(&self, user_id: i32) -> Result<Vec<indicators::Model>, DbErr> {
        self.indicator_repo().for_user(user_id).await
    }

    pub async fn get_event(&self, id: i32) -> Result<Option<events::Model>, DbErr> {
        self.event_repo().get(id).await
    }

    pub async fn list_events(&self) -> Result<Vec<events::Model>, DbErr> {
        self.event_repo().list_all().await
    }

    pub async fn list_verified_events(&self) -> Result<Vec<events::Model>, DbErr> {
        self.event_repo().list_verified().await
    }

    pub async fn event_indicators(
        &self,
        event_ids: &[i32],
    ) -> Result<Vec<(i32, indicators::Model)>, DbErr> {
        self.event_repo().indicators_for(event_ids).await
    }

    pub async fn event_picture_path(&self, event_id: i32) -> Result<Option<String>, DbErr> {
        self.event_repo().picture_path(event_id).await
    }

    pub async fn verify_event(&self, id: i32) -> Result<bool, DbErr> {
        self.event_repo().set_verified(id).await
    }

    pub async fn list_roles(&self) -> Result<Vec<roles::Model>, DbErr> {
        self.reference_repo().roles().await
    }

    pub async fn list_universities(&self) -> Result<Vec<universities::Model>, DbErr> {
        self.reference_repo().universities().await
    }

    pub async fn list_competencies(&self) -> Result<Vec<competencies::Model>, DbErr> {
        self.reference_repo().competencies().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_store_is_migrated_and_seeded() {
        let store = Store::new("sqlite::memory:").await.unwrap();
        store.ping().await.unwrap();

        let roles = store.list_roles().await.unwrap();
        let names: Vec<&str> = roles.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["Student", "Organizer", "Assessor"]);

        assert_eq!(store.list_universities().await.unwrap().len(), 5);
        assert!(!store.list_indicators().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn added_indicator_gets_fresh_id() {
        let store = Store::new("sqlite::memory:").await.unwrap();
        let before = store.list_indicators().await.unwrap().len();

        let id = store.add_indicator("Robotics", true).await.unwrap();
        let all = store.list_indicators().await.unwrap();

        assert_eq!(all.len(), before + 1);
        let added = all.iter().find(|i| i.id == id).unwrap();
        assert_eq!(added.name, "Robotics");
        assert!(added.positive);
    }
}
