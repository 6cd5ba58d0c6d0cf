//! Failure kinds shared by every campus service.

use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

/// Errors returned by the account, session and event services.
///
/// Every variant maps to a stable machine-readable [`ServiceError::kind`]
/// that the HTTP layer forwards alongside the human-readable message.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("An account with this email already exists")]
    DuplicateAccount,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("University index invalid")]
    InvalidUniversity,

    #[error("Unknown role: {0}")]
    InvalidRole(String),

    #[error("Permission denied")]
    PermissionDenied,

    #[error("Validation failed: {0}")]
    Validation(String),

    /// Carries the engine message for server-side logs only.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl ServiceError {
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::DuplicateAccount => "duplicate_account",
            Self::InvalidCredentials => "invalid_credentials",
            Self::InvalidUniversity => "invalid_university",
            Self::InvalidRole(_) => "invalid_role",
            Self::PermissionDenied => "permission_denied",
            Self::Validation(_) => "validation_error",
            Self::Storage(_) => "storage_error",
        }
    }

    pub fn not_found(resource: &str, id: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("{resource} {id}"))
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

impl From<DbErr> for ServiceError {
    fn from(err: DbErr) -> Self {
        let message = err.to_string();
        let unique_violation = matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
            || message.contains("UNIQUE constraint failed");

        if unique_violation && message.contains("users.email") {
            return Self::DuplicateAccount;
        }

        Self::Storage(message)
    }
}

impl From<tokio::task::JoinError> for ServiceError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Storage(format!("Background task failed: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_stable() {
        assert_eq!(ServiceError::DuplicateAccount.kind(), "duplicate_account");
        assert_eq!(ServiceError::InvalidCredentials.kind(), "invalid_credentials");
        assert_eq!(ServiceError::PermissionDenied.kind(), "permission_denied");
        assert_eq!(ServiceError::not_found("Event", 4).kind(), "not_found");
        assert_eq!(ServiceError::not_found("Event", 4).to_string(), "Event 4 not found");
    }

    #[test]
    fn db_errors_become_storage_errors() {
        let err: ServiceError = DbErr::Custom("disk I/O error".to_string()).into();
        assert!(matches!(err, ServiceError::Storage(_)));
    }

    #[test]
    fn email_uniqueness_violation_is_duplicate_account() {
        let err: ServiceError =
            DbErr::Custom("UNIQUE constraint failed: users.email".to_string()).into();
        assert!(matches!(err, ServiceError::DuplicateAccount));

        let err: ServiceError =
            DbErr::Custom("UNIQUE constraint failed: api_keys.key_hash".to_string()).into();
        assert!(matches!(err, ServiceError::Storage(_)));
    }
}
