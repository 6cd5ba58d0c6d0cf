//! Role gate backed by an explicit `(operation, role)` capability table.

use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error};

use crate::config::PolicyConfig;
use crate::domain::UserId;
use crate::services::ServiceError;
use crate::services::account_service::Account;
use crate::services::reference::ReferenceCache;

/// Operations whose availability depends on the caller's role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateEvent,
    EditAnyEvent,
    VerifyEvent,
    ReloadReference,
    ViewMetrics,
}

/// Which fields a role-scoped profile projection carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileScope {
    Basic,
    WithCompetencies,
}

const PROFILE_SCOPES: &[(&str, ProfileScope)] = &[
    ("Student", ProfileScope::Basic),
    ("Organizer", ProfileScope::WithCompetencies),
    ("Assessor", ProfileScope::WithCompetencies),
];

#[derive(Debug, Clone, Default)]
pub struct PolicyTable {
    grants: HashSet<(Operation, String)>,
}

impl PolicyTable {
    #[must_use]
    pub fn from_config(policy: &PolicyConfig) -> Self {
        let mut table = Self::default();

        for role in &policy.event_creation_roles {
            table.grant(Operation::CreateEvent, role);
        }

        for op in [
            Operation::EditAnyEvent,
            Operation::VerifyEvent,
            Operation::ReloadReference,
            Operation::ViewMetrics,
        ] {
            table.grant(op, &policy.elevated_role);
        }

        table
    }

    pub fn grant(&mut self, op: Operation, role: &str) {
        self.grants.insert((op, role.to_string()));
    }

    #[must_use]
    pub fn allows(&self, op: Operation, role: &str) -> bool {
        self.grants.contains(&(op, role.to_string()))
    }
}

pub struct RoleGate {
    reference: Arc<ReferenceCache>,
    policy: PolicyTable,
}

impl RoleGate {
    #[must_use]
    pub const fn new(reference: Arc<ReferenceCache>, policy: PolicyTable) -> Self {
        Self { reference, policy }
    }

    #[must_use]
    pub const fn policy(&self) -> &PolicyTable {
        &self.policy
    }

    pub async fn is_valid_role(&self, name: &str) -> Result<bool, ServiceError> {
        Ok(self.reference.get().await?.role_id(name).is_some())
    }

    /// A stored role id that does not resolve means the reference tables are
    /// corrupt, so this surfaces as a storage failure rather than bad input.
    pub async fn name_of(&self, role_id: i32) -> Result<String, ServiceError> {
        let reference = self.reference.get().await?;
        reference.role_name(role_id).map(str::to_string).ok_or_else(|| {
            error!(role_id, "Role id missing from reference data");
            ServiceError::Storage(format!("Role id {role_id} missing from reference data"))
        })
    }

    pub async fn role_id_of(&self, name: &str) -> Result<i32, ServiceError> {
        self.reference
            .get()
            .await?
            .role_id(name)
            .ok_or_else(|| ServiceError::InvalidRole(name.to_string()))
    }

    /// Viewing "as" a role requires holding exactly that role. There is no
    /// hierarchy between roles.
    pub async fn authorize_view(
        &self,
        requester: &Account,
        requested_role: &str,
    ) -> Result<(), ServiceError> {
        if !self.is_valid_role(requested_role).await? {
            return Err(ServiceError::InvalidRole(requested_role.to_string()));
        }

        if requester.role_name != requested_role {
            debug!(
                user_id = %requester.id,
                role = %requester.role_name,
                requested_role,
                "Profile view denied"
            );
            return Err(ServiceError::PermissionDenied);
        }

        Ok(())
    }

    pub fn authorize(&self, account: &Account, op: Operation) -> Result<(), ServiceError> {
        if self.policy.allows(op, &account.role_name) {
            Ok(())
        } else {
            debug!(user_id = %account.id, role = %account.role_name, ?op, "Operation denied");
            Err(ServiceError::PermissionDenied)
        }
    }

    pub fn authorize_event_mutation(
        &self,
        account: &Account,
        organizer_id: UserId,
    ) -> Result<(), ServiceError> {
        if account.id == organizer_id {
            return Ok(());
        }
        self.authorize(account, Operation::EditAnyEvent)
    }

    pub fn authorize_event_creation(&self, account: &Account) -> Result<(), ServiceError> {
        self.authorize(account, Operation::CreateEvent)
    }

    pub fn profile_scope(&self, role: &str) -> Result<ProfileScope, ServiceError> {
        PROFILE_SCOPES
            .iter()
            .find_map(|(name, scope)| (*name == role).then_some(*scope))
            .ok_or_else(|| ServiceError::InvalidRole(role.to_string()))
    }
}
