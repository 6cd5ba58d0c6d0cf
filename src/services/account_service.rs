//! Domain service for accounts: registration, login, sessions and profiles.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::db::{CompetenceScore, SessionRow};
use crate::domain::{ClientInfo, UserId};
use crate::entities::indicators;
use crate::services::ServiceError;

/// A loaded user with its role name already resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: UserId,
    pub first_name: String,
    pub second_name: String,
    pub third_name: String,
    pub email: String,
    pub university_id: i32,
    pub role_id: i32,
    pub role_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub first_name: String,
    pub second_name: String,
    #[serde(default)]
    pub third_name: String,
    pub email: String,
    pub password: String,
    pub university_id: i32,
}

/// Partial profile update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileEdit {
    pub first_name: Option<String>,
    pub second_name: Option<String>,
    pub third_name: Option<String>,
    pub email: Option<String>,
    pub university_id: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompetenceView {
    pub competence_id: i32,
    pub name: String,
    pub points: i32,
}

impl From<CompetenceScore> for CompetenceView {
    fn from(score: CompetenceScore) -> Self {
        Self {
            competence_id: score.competence_id,
            name: score.name,
            points: score.points,
        }
    }
}

/// Role-scoped projection of an account. `competencies` is absent from the
/// JSON entirely when the viewing role may not see it.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    pub user_id: UserId,
    pub first_name: String,
    pub second_name: String,
    pub third_name: String,
    pub email: String,
    pub university_id: i32,
    pub role_id: i32,
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub competencies: Option<Vec<CompetenceView>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndicatorDto {
    pub indicator_id: i32,
    pub name: String,
    #[serde(rename = "type")]
    pub positive: bool,
}

impl From<indicators::Model> for IndicatorDto {
    fn from(model: indicators::Model) -> Self {
        Self {
            indicator_id: model.id,
            name: model.name,
            positive: model.positive,
        }
    }
}

/// Session metadata. Never carries key material.
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub session_id: i32,
    pub ip_address: String,
    pub user_agent: String,
    pub last_access: String,
    pub created_at: String,
}

impl From<SessionRow> for SessionInfo {
    fn from(row: SessionRow) -> Self {
        Self {
            session_id: row.id,
            ip_address: row.ip_address,
            user_agent: row.last_useragent,
            last_access: row.last_access,
            created_at: row.created_at,
        }
    }
}

#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,7}$")
            .expect("Invalid email regex")
    })
    .is_match(email)
}

/// Removes repeated ids, keeping the first occurrence of each.
#[must_use]
pub fn dedup_ids(ids: &[i32]) -> Vec<i32> {
    let mut seen = std::collections::HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

#[async_trait::async_trait]
pub trait AccountService: Send + Sync {
    /// Creates a Student account and logs it in, returning the raw API key.
    ///
    /// # Errors
    ///
    /// [`ServiceError::InvalidUniversity`] for an unknown university and
    /// [`ServiceError::DuplicateAccount`] when the email is taken. Nothing is
    /// persisted on failure.
    async fn register(
        &self,
        registration: Registration,
        client: &ClientInfo,
    ) -> Result<String, ServiceError>;

    /// Returns a fresh raw API key. Unknown email and wrong password fail
    /// identically with [`ServiceError::InvalidCredentials`].
    async fn login(
        &self,
        email: &str,
        password: &str,
        client: &ClientInfo,
    ) -> Result<String, ServiceError>;

    async fn resolve_session(&self, raw_key: &str) -> Result<Option<UserId>, ServiceError>;

    /// Resolves the key, refreshes the session's metadata and loads the
    /// owning account.
    async fn authenticate(
        &self,
        raw_key: &str,
        client: &ClientInfo,
    ) -> Result<Option<Account>, ServiceError>;

    async fn logout(&self, raw_key: &str) -> Result<(), ServiceError>;

    async fn list_sessions(&self, account: &Account) -> Result<Vec<SessionInfo>, ServiceError>;

    async fn get_account(&self, id: UserId) -> Result<Account, ServiceError>;

    /// Applies the present fields. An out-of-range university is ignored.
    async fn edit_profile(&self, account: &Account, edit: ProfileEdit) -> Result<(), ServiceError>;

    /// Replaces the account's indicator set atomically.
    async fn set_indicators(&self, account: &Account, ids: &[i32]) -> Result<(), ServiceError>;

    async fn indicators(&self, account: &Account) -> Result<Vec<IndicatorDto>, ServiceError>;

    async fn set_preference_competencies(
        &self,
        account: &Account,
        ids: &[i32],
    ) -> Result<(), ServiceError>;

    async fn preference_competencies(&self, account: &Account) -> Result<Vec<i32>, ServiceError>;

    async fn render_self(&self, account: &Account) -> Result<ProfileView, ServiceError>;

    async fn render_profile(
        &self,
        account: &Account,
        viewer_role: &str,
    ) -> Result<ProfileView, ServiceError>;

    /// Renders `target` as `as_role`, defaulting to the requester's own role.
    async fn view_profile(
        &self,
        requester: &Account,
        target: UserId,
        as_role: Option<&str>,
    ) -> Result<ProfileView, ServiceError>;

    async fn grant_role(&self, email: &str, role: &str) -> Result<Account, ServiceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_pattern() {
        assert!(is_valid_email("ada@example.com"));
        assert!(is_valid_email("first.last+tag@uni.edu.ru"));
        assert!(!is_valid_email("ada@example"));
        assert!(!is_valid_email("no-at-sign.com"));
        assert!(!is_valid_email("ada@example.c"));
        assert!(!is_valid_email(" ada@example.com"));
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        assert_eq!(dedup_ids(&[3, 1, 3, 2, 1]), vec![3, 1, 2]);
        assert!(dedup_ids(&[]).is_empty());
    }

    #[test]
    fn hidden_competencies_are_omitted_from_json() {
        let view = ProfileView {
            user_id: UserId::new(1),
            first_name: "Ada".to_string(),
            second_name: "Lovelace".to_string(),
            third_name: String::new(),
            email: "ada@example.com".to_string(),
            university_id: 2,
            role_id: 1,
            role: "Student".to_string(),
            competencies: None,
        };
        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("competencies").is_none());
        assert_eq!(json["user_id"], 1);
    }
}
