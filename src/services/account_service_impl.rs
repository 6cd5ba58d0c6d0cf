//! `SeaORM` implementation of the `AccountService` trait.

use async_trait::async_trait;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::db::repositories::{indicator as indicator_repo, user as user_repo};
use crate::db::{NewUser, Store, UserChanges};
use crate::domain::{ClientInfo, UserId};
use crate::entities::users;
use crate::services::ServiceError;
use crate::services::account_service::{
    Account, AccountService, IndicatorDto, ProfileEdit, ProfileView, Registration, SessionInfo,
    dedup_ids, is_valid_email,
};
use crate::services::authorization::{ProfileScope, RoleGate};
use crate::services::reference::ReferenceCache;
use crate::services::session::SessionManager;

pub struct SeaOrmAccountService {
    store: Store,
    config: Arc<Config>,
    sessions: Arc<SessionManager>,
    gate: Arc<RoleGate>,
    reference: Arc<ReferenceCache>,
    /// Hash verified against when a login names no account, so both
    /// failure paths cost one argon2 verification.
    decoy_hash: OnceLock<String>,
}

impl SeaOrmAccountService {
    #[must_use]
    pub const fn new(
        store: Store,
        config: Arc<Config>,
        sessions: Arc<SessionManager>,
        gate: Arc<RoleGate>,
        reference: Arc<ReferenceCache>,
    ) -> Self {
        Self {
            store,
            config,
            sessions,
            gate,
            reference,
            decoy_hash: OnceLock::new(),
        }
    }

    async fn decoy_hash(&self) -> Result<String, ServiceError> {
        if let Some(hash) = self.decoy_hash.get() {
            return Ok(hash.clone());
        }

        let security = self.config.security.clone();
        let hash = tokio::task::spawn_blocking(move || {
            user_repo::hash_password("campus-login-decoy", &security)
        })
        .await?
        .map_err(|e| ServiceError::Storage(format!("Password hashing failed: {e}")))?;

        Ok(self.decoy_hash.get_or_init(|| hash).clone())
    }

    async fn to_account(&self, user: users::Model) -> Result<Account, ServiceError> {
        let role_name = self.gate.name_of(user.role_id).await?;
        Ok(Account {
            id: UserId::new(user.id),
            first_name: user.first_name,
            second_name: user.second_name,
            third_name: user.third_name,
            email: user.email,
            university_id: user.university_id,
            role_id: user.role_id,
            role_name,
        })
    }

    async fn accepts_university(&self, university_id: i32) -> Result<bool, ServiceError> {
        if !(1..=self.config.policy.max_university_id).contains(&university_id) {
            return Ok(false);
        }
        Ok(self.reference.get().await?.has_university(university_id))
    }
}

/// Fails with a validation error naming any id that has no indicator row.
pub(crate) async fn check_indicator_ids(store: &Store, ids: &[i32]) -> Result<(), ServiceError> {
    if ids.is_empty() {
        return Ok(());
    }

    let found: Vec<i32> = store.get_indicators(ids).await?.iter().map(|i| i.id).collect();
    let missing: Vec<String> = ids
        .iter()
        .filter(|id| !found.contains(id))
        .map(ToString::to_string)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ServiceError::validation(format!(
            "Unknown indicator id(s): {}",
            missing.join(", ")
        )))
    }
}

fn required(field: &str, value: &str) -> Result<String, ServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::validation(format!("{field} cannot be empty")));
    }
    Ok(trimmed.to_string())
}

fn checked_email(value: &str) -> Result<String, ServiceError> {
    let email = value.trim();
    if !is_valid_email(email) {
        return Err(ServiceError::validation("Invalid email format"));
    }
    Ok(email.to_string())
}

#[async_trait]
impl AccountService for SeaOrmAccountService {
    async fn register(
        &self,
        registration: Registration,
        client: &ClientInfo,
    ) -> Result<String, ServiceError> {
        let email = checked_email(&registration.email)?;
        let first_name = required("first_name", &registration.first_name)?;
        let second_name = required("second_name", &registration.second_name)?;
        if registration.password.is_empty() {
            return Err(ServiceError::validation("password cannot be empty"));
        }

        if !self.accepts_university(registration.university_id).await? {
            return Err(ServiceError::InvalidUniversity);
        }

        let role_id = self.gate.role_id_of(&self.config.policy.default_role).await?;

        let security = self.config.security.clone();
        let password = registration.password;
        let password_hash =
            tokio::task::spawn_blocking(move || user_repo::hash_password(&password, &security))
                .await?
                .map_err(|e| ServiceError::Storage(format!("Password hashing failed: {e}")))?;

        let txn = self.store.begin().await?;

        let user_id = user_repo::insert(
            &txn,
            NewUser {
                first_name,
                second_name,
                third_name: registration.third_name.trim().to_string(),
                email,
                password_hash,
                university_id: registration.university_id,
                role_id,
            },
        )
        .await?;
        let user_id = UserId::new(user_id);

        let raw_key = self.sessions.issue_with(&txn, user_id, client).await?;

        txn.commit().await?;

        info!(user_id = %user_id, ip = %client.ip_address, "Registered new account");
        Ok(raw_key)
    }

    async fn login(
        &self,
        email: &str,
        password: &str,
        client: &ClientInfo,
    ) -> Result<String, ServiceError> {
        let user = self.store.get_user_by_email(email.trim()).await?;

        let stored_hash = match &user {
            Some(user) => user.password_hash.clone(),
            None => self.decoy_hash().await?,
        };
        let password = password.to_string();
        let verified =
            tokio::task::spawn_blocking(move || user_repo::verify_password(&password, &stored_hash))
                .await?;

        let Some(user) = user else {
            debug!("Login attempt for unknown email");
            return Err(ServiceError::InvalidCredentials);
        };

        match verified {
            Ok(true) => {}
            Ok(false) => return Err(ServiceError::InvalidCredentials),
            Err(e) => {
                warn!(user_id = user.id, error = %e, "Stored password hash is unreadable");
                return Err(ServiceError::InvalidCredentials);
            }
        }

        let user_id = UserId::new(user.id);

        if !self.store.is_known_ip(user.id, &client.ip_address).await? {
            warn!(user_id = %user_id, ip = %client.ip_address, "Login from a new IP address");
        }

        let raw_key = self.sessions.issue(user_id, client).await?;
        info!(user_id = %user_id, "User logged in");
        Ok(raw_key)
    }

    async fn resolve_session(&self, raw_key: &str) -> Result<Option<UserId>, ServiceError> {
        Ok(self
            .sessions
            .resolve(raw_key)
            .await?
            .map(|session| UserId::new(session.user_id)))
    }

    async fn authenticate(
        &self,
        raw_key: &str,
        client: &ClientInfo,
    ) -> Result<Option<Account>, ServiceError> {
        let Some(session) = self.sessions.resolve(raw_key).await? else {
            return Ok(None);
        };

        let Some(user) = self.store.get_user(session.user_id).await? else {
            return Ok(None);
        };

        self.sessions.touch(&session, client).await?;
        self.to_account(user).await.map(Some)
    }

    async fn logout(&self, raw_key: &str) -> Result<(), ServiceError> {
        if self.sessions.revoke(raw_key).await? {
            debug!("Session revoked");
        }
        Ok(())
    }

    async fn list_sessions(&self, account: &Account) -> Result<Vec<SessionInfo>, ServiceError> {
        Ok(self
            .sessions
            .list(account.id)
            .await?
            .into_iter()
            .map(SessionInfo::from)
            .collect())
    }

    async fn get_account(&self, id: UserId) -> Result<Account, ServiceError> {
        let user = self
            .store
            .get_user(id.value())
            .await?
            .ok_or_else(|| ServiceError::not_found("Account", id))?;
        self.to_account(user).await
    }

    async fn edit_profile(&self, account: &Account, edit: ProfileEdit) -> Result<(), ServiceError> {
        let mut changes = UserChanges::default();

        if let Some(first_name) = edit.first_name {
            changes.first_name = Some(required("first_name", &first_name)?);
        }
        if let Some(second_name) = edit.second_name {
            changes.second_name = Some(required("second_name", &second_name)?);
        }
        if let Some(third_name) = edit.third_name {
            changes.third_name = Some(third_name.trim().to_string());
        }
        if let Some(email) = edit.email {
            changes.email = Some(checked_email(&email)?);
        }
        if let Some(university_id) = edit.university_id {
            if self.accepts_university(university_id).await? {
                changes.university_id = Some(university_id);
            } else {
                warn!(
                    user_id = %account.id,
                    university_id,
                    "Ignoring out-of-range university on profile edit"
                );
            }
        }

        if changes.is_empty() {
            return Ok(());
        }

        self.store.update_user(account.id.value(), changes).await?;
        info!(user_id = %account.id, "Profile updated");
        Ok(())
    }

    async fn set_indicators(&self, account: &Account, ids: &[i32]) -> Result<(), ServiceError> {
        let ids = dedup_ids(ids);
        check_indicator_ids(&self.store, &ids).await?;

        let txn = self.store.begin().await?;
        indicator_repo::replace_for_user(&txn, account.id.value(), &ids).await?;
        txn.commit().await?;

        debug!(user_id = %account.id, count = ids.len(), "Indicators replaced");
        Ok(())
    }

    async fn indicators(&self, account: &Account) -> Result<Vec<IndicatorDto>, ServiceError> {
        Ok(self
            .store
            .user_indicators(account.id.value())
            .await?
            .into_iter()
            .map(IndicatorDto::from)
            .collect())
    }

    async fn set_preference_competencies(
        &self,
        account: &Account,
        ids: &[i32],
    ) -> Result<(), ServiceError> {
        let ids = dedup_ids(ids);

        if !ids.is_empty() {
            let found = self.store.existing_competence_ids(&ids).await?;
            let missing: Vec<String> = ids
                .iter()
                .filter(|id| !found.contains(id))
                .map(ToString::to_string)
                .collect();
            if !missing.is_empty() {
                return Err(ServiceError::validation(format!(
                    "Unknown competence id(s): {}",
                    missing.join(", ")
                )));
            }
        }

        let txn = self.store.begin().await?;
        user_repo::replace_preference_competencies(&txn, account.id.value(), &ids).await?;
        txn.commit().await?;
        Ok(())
    }

    async fn preference_competencies(&self, account: &Account) -> Result<Vec<i32>, ServiceError> {
        Ok(self
            .store
            .user_preference_competencies(account.id.value())
            .await?)
    }

    async fn render_self(&self, account: &Account) -> Result<ProfileView, ServiceError> {
        render(&self.store, account, ProfileScope::WithCompetencies).await
    }

    async fn render_profile(
        &self,
        account: &Account,
        viewer_role: &str,
    ) -> Result<ProfileView, ServiceError> {
        let scope = self.gate.profile_scope(viewer_role)?;
        render(&self.store, account, scope).await
    }

    async fn view_profile(
        &self,
        requester: &Account,
        target: UserId,
        as_role: Option<&str>,
    ) -> Result<ProfileView, ServiceError> {
        let role = as_role.unwrap_or(requester.role_name.as_str());
        self.gate.authorize_view(requester, role).await?;

        let target = self.get_account(target).await?;
        self.render_profile(&target, role).await
    }

    async fn grant_role(&self, email: &str, role: &str) -> Result<Account, ServiceError> {
        let role_id = self.gate.role_id_of(role).await?;
        let user = self
            .store
            .get_user_by_email(email.trim())
            .await?
            .ok_or_else(|| ServiceError::not_found("Account", email))?;

        self.store.set_user_role(user.id, role_id).await?;
        info!(user_id = user.id, role, "Role granted");

        self.get_account(UserId::new(user.id)).await
    }
}

async fn render(
    store: &Store,
    account: &Account,
    scope: ProfileScope,
) -> Result<ProfileView, ServiceError> {
    let competencies = match scope {
        ProfileScope::Basic => None,
        ProfileScope::WithCompetencies => Some(
            store
                .user_competencies(account.id.value())
                .await?
                .into_iter()
                .map(Into::into)
                .collect(),
        ),
    };

    Ok(ProfileView {
        user_id: account.id,
        first_name: account.first_name.clone(),
        second_name: account.second_name.clone(),
        third_name: account.third_name.clone(),
        email: account.email.clone(),
        university_id: account.university_id,
        role_id: account.role_id,
        role: account.role_name.clone(),
        competencies,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::prelude::Users;
    use crate::services::testing::{Harness, registration};
    use sea_orm::{EntityTrait, PaginatorTrait};

    async fn user_count(store: &Store) -> u64 {
        Users::find().count(&store.conn).await.unwrap()
    }

    #[tokio::test]
    async fn registration_then_login_resolves_to_same_user() {
        let h = Harness::new().await;
        let client = ClientInfo::new("10.0.0.1", "tests");

        let reg_key = h.accounts.register(registration("e1@example.com", 2), &client).await.unwrap();
        let registered = h.accounts.resolve_session(&reg_key).await.unwrap().unwrap();

        let login_key = h.accounts.login("e1@example.com", "hunter22", &client).await.unwrap();
        assert_ne!(reg_key, login_key);
        assert_eq!(h.accounts.resolve_session(&login_key).await.unwrap(), Some(registered));

        let account = h.accounts.get_account(registered).await.unwrap();
        assert_eq!(account.role_name, "Student");
        assert_eq!(account.university_id, 2);
    }

    #[tokio::test]
    async fn out_of_range_university_creates_nothing() {
        let h = Harness::new().await;

        for university in [0, 6, 999] {
            let err = h
                .accounts
                .register(registration("e2@example.com", university), &ClientInfo::default())
                .await
                .unwrap_err();
            assert!(matches!(err, ServiceError::InvalidUniversity), "{university}");
        }
        assert_eq!(user_count(&h.store).await, 0);
    }

    #[tokio::test]
    async fn duplicate_email_never_creates_second_row() {
        let h = Harness::new().await;
        let client = ClientInfo::default();

        h.accounts.register(registration("dup@example.com", 1), &client).await.unwrap();
        let err = h
            .accounts
            .register(registration("dup@example.com", 3), &client)
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::DuplicateAccount));
        assert_eq!(user_count(&h.store).await, 1);
    }

    #[tokio::test]
    async fn malformed_email_is_rejected() {
        let h = Harness::new().await;
        let err = h
            .accounts
            .register(registration("not-an-email", 1), &ClientInfo::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn bad_password_and_unknown_email_fail_identically() {
        let h = Harness::new().await;
        let client = ClientInfo::default();
        h.accounts.register(registration("e3@example.com", 1), &client).await.unwrap();

        let wrong_password = h.accounts.login("e3@example.com", "nope", &client).await.unwrap_err();
        let unknown_email = h.accounts.login("ghost@example.com", "hunter22", &client).await.unwrap_err();

        assert!(matches!(wrong_password, ServiceError::InvalidCredentials));
        assert!(matches!(unknown_email, ServiceError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
        assert_eq!(wrong_password.kind(), unknown_email.kind());
    }

    #[tokio::test]
    async fn unknown_email_is_checked_against_decoy_with_configured_cost() {
        let h = Harness::new().await;
        assert!(h.accounts.decoy_hash.get().is_none());

        let err = h
            .accounts
            .login("ghost@example.com", "hunter22", &ClientInfo::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidCredentials));

        let decoy = h.accounts.decoy_hash.get().unwrap();
        assert!(decoy.starts_with("$argon2id$v=19$m=1024,t=1,p=1$"), "{decoy}");

        h.accounts
            .login("ghost2@example.com", "hunter22", &ClientInfo::default())
            .await
            .unwrap_err();
        assert_eq!(h.accounts.decoy_hash.get(), Some(decoy));
    }

    #[tokio::test]
    async fn unknown_email_costs_as_much_as_wrong_password() {
        let mut config = crate::services::testing::test_config();
        config.security.argon2_memory_cost_kib = 4096;
        config.security.argon2_time_cost = 2;
        let h = Harness::with_config(config).await;
        let client = ClientInfo::default();
        h.accounts.register(registration("timed@example.com", 1), &client).await.unwrap();
        h.accounts.login("warmup@example.com", "x", &client).await.unwrap_err();

        let mut wrong_password = std::time::Duration::ZERO;
        let mut unknown_email = std::time::Duration::ZERO;
        for _ in 0..3 {
            let start = std::time::Instant::now();
            h.accounts.login("timed@example.com", "wrong", &client).await.unwrap_err();
            wrong_password += start.elapsed();

            let start = std::time::Instant::now();
            h.accounts.login("nobody@example.com", "wrong", &client).await.unwrap_err();
            unknown_email += start.elapsed();
        }

        assert!(
            unknown_email * 4 >= wrong_password,
            "unknown email {unknown_email:?} vs wrong password {wrong_password:?}"
        );
    }

    #[tokio::test]
    async fn failed_session_issue_rolls_back_registration() {
        struct SameKey;

        impl crate::services::KeySource for SameKey {
            fn next_key(&self) -> String {
                "campus_samekey".to_string()
            }
        }

        let h = Harness::with_key_source(Arc::new(SameKey)).await;
        let client = ClientInfo::default();

        let first = h.accounts.register(registration("first@example.com", 1), &client).await.unwrap();
        assert_eq!(first, "campus_samekey");

        let err = h
            .accounts
            .register(registration("second@example.com", 1), &client)
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Storage(_)), "{err:?}");
        assert_eq!(user_count(&h.store).await, 1);
        assert!(h.store.get_user_by_email("second@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn set_indicators_replaces_whole_set() {
        let h = Harness::new().await;
        let account = h.student("e4@example.com").await;

        h.accounts.set_indicators(&account, &[1, 2]).await.unwrap();
        h.accounts.set_indicators(&account, &[3]).await.unwrap();

        let ids: Vec<i32> = h
            .accounts
            .indicators(&account)
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.indicator_id)
            .collect();
        assert_eq!(ids, vec![3]);
    }

    #[tokio::test]
    async fn unknown_indicator_leaves_existing_set_untouched() {
        let h = Harness::new().await;
        let account = h.student("e5@example.com").await;

        h.accounts.set_indicators(&account, &[1, 2]).await.unwrap();
        let err = h.accounts.set_indicators(&account, &[3, 404]).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        assert_eq!(h.accounts.indicators(&account).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn out_of_range_university_edit_is_ignored() {
        let h = Harness::new().await;
        let account = h.student("e6@example.com").await;

        h.accounts
            .edit_profile(
                &account,
                ProfileEdit {
                    first_name: Some("Grace".to_string()),
                    university_id: Some(999),
                    ..ProfileEdit::default()
                },
            )
            .await
            .unwrap();

        let reloaded = h.accounts.get_account(account.id).await.unwrap();
        assert_eq!(reloaded.university_id, account.university_id);
        assert_eq!(reloaded.first_name, "Grace");
        assert_eq!(reloaded.second_name, account.second_name);
    }

    #[tokio::test]
    async fn edit_to_taken_email_is_duplicate_account() {
        let h = Harness::new().await;
        h.student("taken@example.com").await;
        let account = h.student("e7@example.com").await;

        let err = h
            .accounts
            .edit_profile(
                &account,
                ProfileEdit {
                    email: Some("taken@example.com".to_string()),
                    ..ProfileEdit::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::DuplicateAccount));
    }

    #[tokio::test]
    async fn student_projection_hides_competencies() {
        let h = Harness::new().await;
        let account = h.student("e8@example.com").await;

        let as_student = h.accounts.render_profile(&account, "Student").await.unwrap();
        assert!(as_student.competencies.is_none());

        let as_organizer = h.accounts.render_profile(&account, "Organizer").await.unwrap();
        assert!(as_organizer.competencies.is_some());

        assert!(matches!(
            h.accounts.render_profile(&account, "Dean").await,
            Err(ServiceError::InvalidRole(_))
        ));
    }

    #[tokio::test]
    async fn viewing_as_another_role_is_denied() {
        let h = Harness::new().await;
        let viewer = h.student("viewer@example.com").await;
        let target = h.student("target@example.com").await;

        let view = h.accounts.view_profile(&viewer, target.id, None).await.unwrap();
        assert_eq!(view.user_id, target.id);

        assert!(matches!(
            h.accounts.view_profile(&viewer, target.id, Some("Assessor")).await,
            Err(ServiceError::PermissionDenied)
        ));
        assert!(matches!(
            h.accounts.view_profile(&viewer, UserId::new(999), None).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn preference_competencies_are_replaced() {
        let h = Harness::new().await;
        let account = h.student("e9@example.com").await;

        h.accounts.set_preference_competencies(&account, &[1, 2, 2]).await.unwrap();
        h.accounts.set_preference_competencies(&account, &[4]).await.unwrap();
        assert_eq!(h.accounts.preference_competencies(&account).await.unwrap(), vec![4]);

        assert!(matches!(
            h.accounts.set_preference_competencies(&account, &[77]).await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn logout_revokes_only_presented_key() {
        let h = Harness::new().await;
        let client = ClientInfo::default();
        let first = h.accounts.register(registration("e10@example.com", 1), &client).await.unwrap();
        let second = h.accounts.login("e10@example.com", "hunter22", &client).await.unwrap();

        h.accounts.logout(&first).await.unwrap();
        assert!(h.accounts.resolve_session(&first).await.unwrap().is_none());
        assert!(h.accounts.resolve_session(&second).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn grant_role_changes_resolved_role() {
        let h = Harness::new().await;
        let account = h.student("e11@example.com").await;

        let promoted = h.accounts.grant_role("e11@example.com", "Organizer").await.unwrap();
        assert_eq!(promoted.id, account.id);
        assert_eq!(promoted.role_name, "Organizer");

        assert!(matches!(
            h.accounts.grant_role("e11@example.com", "Dean").await,
            Err(ServiceError::InvalidRole(_))
        ));
    }
}
