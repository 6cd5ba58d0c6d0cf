use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set, Unchanged,
};

use crate::config::SecurityConfig;
use crate::entities::{competencies, prelude::*, user_competencies, user_preference_competencies, users};

/// Columns supplied at registration time.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub second_name: String,
    pub third_name: String,
    pub email: String,
    pub password_hash: String,
    pub university_id: i32,
    pub role_id: i32,
}

/// Partial profile update; `None` leaves the stored column untouched.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub first_name: Option<String>,
    pub second_name: Option<String>,
    pub third_name: Option<String>,
    pub email: Option<String>,
    pub university_id: Option<i32>,
}

impl UserChanges {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.second_name.is_none()
            && self.third_name.is_none()
            && self.email.is_none()
            && self.university_id.is_none()
    }
}

/// A competence with the points a user holds in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompetenceScore {
    pub competence_id: i32,
    pub name: String,
    pub points: i32,
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<users::Model>, DbErr> {
        Users::find_by_id(id).one(&self.conn).await
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<users::Model>, DbErr> {
        Users::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.conn)
            .await
    }

    pub async fn update(&self, id: i32, changes: UserChanges) -> Result<(), DbErr> {
        let mut active = users::ActiveModel {
            id: Unchanged(id),
            updated_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        };

        if let Some(first_name) = changes.first_name {
            active.first_name = Set(first_name);
        }
        if let Some(second_name) = changes.second_name {
            active.second_name = Set(second_name);
        }
        if let Some(third_name) = changes.third_name {
            active.third_name = Set(third_name);
        }
        if let Some(email) = changes.email {
            active.email = Set(email);
        }
        if let Some(university_id) = changes.university_id {
            active.university_id = Set(university_id);
        }

        active.update(&self.conn).await?;
        Ok(())
    }

    pub async fn set_role(&self, id: i32, role_id: i32) -> Result<(), DbErr> {
        users::ActiveModel {
            id: Unchanged(id),
            role_id: Set(role_id),
            updated_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        }
        .update(&self.conn)
        .await?;
        Ok(())
    }

    pub async fn competencies(&self, user_id: i32) -> Result<Vec<CompetenceScore>, DbErr> {
        let rows = UserCompetencies::find()
            .filter(user_competencies::Column::UserId.eq(user_id))
            .order_by_asc(user_competencies::Column::CompetenceId)
            .find_also_related(Competencies)
            .all(&self.conn)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(score, competence)| CompetenceScore {
                competence_id: score.competence_id,
                name: competence.map(|c| c.name).unwrap_or_default(),
                points: score.points,
            })
            .collect())
    }

    pub async fn preference_competencies(&self, user_id: i32) -> Result<Vec<i32>, DbErr> {
        let rows = UserPreferenceCompetencies::find()
            .filter(user_preference_competencies::Column::UserId.eq(user_id))
            .order_by_asc(user_preference_competencies::Column::CompetenceId)
            .all(&self.conn)
            .await?;

        Ok(rows.into_iter().map(|r| r.competence_id).collect())
    }

    pub async fn existing_competence_ids(&self, ids: &[i32]) -> Result<Vec<i32>, DbErr> {
        let rows = Competencies::find()
            .filter(competencies::Column::Id.is_in(ids.iter().copied()))
            .all(&self.conn)
            .await?;

        Ok(rows.into_iter().map(|c| c.id).collect())
    }
}

/// Inserts a user row and returns its generated id.
pub async fn insert<C: ConnectionTrait>(conn: &C, user: NewUser) -> Result<i32, DbErr> {
    let now = chrono::Utc::now().to_rfc3339();

    let result = Users::insert(users::ActiveModel {
        first_name: Set(user.first_name),
        second_name: Set(user.second_name),
        third_name: Set(user.third_name),
        email: Set(user.email),
        password_hash: Set(user.password_hash),
        university_id: Set(user.university_id),
        role_id: Set(user.role_id),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    })
    .exec(conn)
    .await?;

    Ok(result.last_insert_id)
}

/// Replaces the user's preferred competencies with `competence_ids`.
pub async fn replace_preference_competencies<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    competence_ids: &[i32],
) -> Result<(), DbErr> {
    UserPreferenceCompetencies::delete_many()
        .filter(user_preference_competencies::Column::UserId.eq(user_id))
        .exec(conn)
        .await?;

    if !competence_ids.is_empty() {
        let rows: Vec<user_preference_competencies::ActiveModel> = competence_ids
            .iter()
            .map(|&competence_id| user_preference_competencies::ActiveModel {
                user_id: Set(user_id),
                competence_id: Set(competence_id),
            })
            .collect();

        UserPreferenceCompetencies::insert_many(rows)
            .exec_without_returning(conn)
            .await?;
    }

    Ok(())
}

/// Hash a password using Argon2id with the configured cost parameters.
pub fn hash_password(password: &str, config: &SecurityConfig) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let params = Params::new(
        config.argon2_memory_cost_kib,
        config.argon2_time_cost,
        config.argon2_parallelism,
        None,
    )
    .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}

/// Checks `password` against a stored PHC string. The parameters embedded
/// in the hash are used, so older hashes keep verifying after a config change.
pub fn verify_password(password: &str, password_hash: &str) -> anyhow::Result<bool> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap_params() -> SecurityConfig {
        SecurityConfig {
            argon2_memory_cost_kib: 1024,
            argon2_time_cost: 1,
            ..SecurityConfig::default()
        }
    }

    #[test]
    fn password_hash_is_not_the_password_and_verifies() {
        let hash = hash_password("correct horse", &cheap_params()).unwrap();
        assert!(!hash.contains("correct horse"));
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("battery staple", &hash).unwrap());
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let a = hash_password("pw", &cheap_params()).unwrap();
        let b = hash_password("pw", &cheap_params()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn empty_changes_detected() {
        assert!(UserChanges::default().is_empty());
        let changes = UserChanges {
            university_id: Some(2),
            ..UserChanges::default()
        };
        assert!(!changes.is_empty());
    }
}
