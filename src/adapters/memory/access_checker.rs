//! Static access checker for tests and development wiring.

use std::collections::HashSet;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::{CenterId, DomainError, GroupId, UserId};
use crate::ports::{AccessChecker, AccessDeniedReason, AccessResult};

enum Mode {
    AllowAll,
    DenyAll,
    /// Only explicitly granted (user, group) pairs pass the group check.
    Granted,
}

/// [`AccessChecker`] with fixed behavior, for tests.
pub struct StaticAccessChecker {
    mode: Mode,
    grants: RwLock<HashSet<(String, GroupId)>>,
    bypass_users: RwLock<HashSet<String>>,
}

impl StaticAccessChecker {
    /// Grants every group check.
    pub fn allow_all() -> Self {
        Self {
            mode: Mode::AllowAll,
            grants: RwLock::new(HashSet::new()),
            bypass_users: RwLock::new(HashSet::new()),
        }
    }

    /// Denies every group check and every bypass.
    pub fn deny_all() -> Self {
        Self {
            mode: Mode::DenyAll,
            grants: RwLock::new(HashSet::new()),
            bypass_users: RwLock::new(HashSet::new()),
        }
    }

    /// Denies group checks unless explicitly granted via [`grant`].
    pub fn with_grants() -> Self {
        Self {
            mode: Mode::Granted,
            grants: RwLock::new(HashSet::new()),
            bypass_users: RwLock::new(HashSet::new()),
        }
    }

    /// Grants a user access to a group.
    pub async fn grant(&self, user_id: &UserId, group_id: GroupId) {
        self.grants
            .write()
            .await
            .insert((user_id.as_str().to_string(), group_id));
    }

    /// Marks a user as holding the center-wide bypass.
    pub async fn grant_bypass(&self, user_id: &UserId) {
        self.bypass_users
            .write()
            .await
            .insert(user_id.as_str().to_string());
    }
}

#[async_trait]
impl AccessChecker for StaticAccessChecker {
    async fn is_authorized_for_group(
        &self,
        user_id: &UserId,
        group_id: GroupId,
    ) -> Result<AccessResult, DomainError> {
        let allowed = match self.mode {
            Mode::AllowAll => true,
            Mode::DenyAll => false,
            Mode::Granted => self
                .grants
                .read()
                .await
                .contains(&(user_id.as_str().to_string(), group_id)),
        };
        if allowed {
            Ok(AccessResult::Allowed)
        } else {
            Ok(AccessResult::Denied(AccessDeniedReason::NotAssignedToGroup))
        }
    }

    async fn can_bypass_internal_access(
        &self,
        user_id: &UserId,
        _center_id: CenterId,
    ) -> Result<bool, DomainError> {
        match self.mode {
            Mode::AllowAll => Ok(true),
            Mode::DenyAll => Ok(false),
            Mode::Granted => Ok(self
                .bypass_users
                .read()
                .await
                .contains(user_id.as_str())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(name: &str) -> UserId {
        UserId::new(name).unwrap()
    }

    #[tokio::test]
    async fn allow_all_grants_everything() {
        let checker = StaticAccessChecker::allow_all();
        let result = checker
            .is_authorized_for_group(&user("anyone"), GroupId::new())
            .await
            .unwrap();
        assert_eq!(result, AccessResult::Allowed);
        assert!(checker
            .can_bypass_internal_access(&user("anyone"), CenterId::new())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn deny_all_denies_everything() {
        let checker = StaticAccessChecker::deny_all();
        let result = checker
            .is_authorized_for_group(&user("anyone"), GroupId::new())
            .await
            .unwrap();
        assert!(matches!(result, AccessResult::Denied(_)));
    }

    #[tokio::test]
    async fn grants_are_scoped_to_user_and_group() {
        let checker = StaticAccessChecker::with_grants();
        let teacher = user("teacher-1");
        let group = GroupId::new();
        checker.grant(&teacher, group).await;

        assert_eq!(
            checker
                .is_authorized_for_group(&teacher, group)
                .await
                .unwrap(),
            AccessResult::Allowed
        );
        assert!(matches!(
            checker
                .is_authorized_for_group(&teacher, GroupId::new())
                .await
                .unwrap(),
            AccessResult::Denied(_)
        ));
        assert!(matches!(
            checker
                .is_authorized_for_group(&user("other"), group)
                .await
                .unwrap(),
            AccessResult::Denied(_)
        ));
    }

    #[tokio::test]
    async fn bypass_is_per_user() {
        let checker = StaticAccessChecker::with_grants();
        let admin = user("center-admin");
        checker.grant_bypass(&admin).await;

        assert!(checker
            .can_bypass_internal_access(&admin, CenterId::new())
            .await
            .unwrap());
        assert!(!checker
            .can_bypass_internal_access(&user("teacher-1"), CenterId::new())
            .await
            .unwrap());
    }
}
