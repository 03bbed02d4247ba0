//! Access control port for tenant-scoped operations.
//!
//! A virtual identifier embeds a group id supplied by the caller, so the
//! decoded group must never be trusted: every materialization and every
//! transition re-checks authorization through this port before acting.
//!
//! # Design
//!
//! Fail-secure: on ANY error, access is denied. There is no implicit
//! grant for unknown users or groups.

use async_trait::async_trait;

use crate::domain::foundation::{CenterId, DomainError, GroupId, UserId};

/// Port for checking a user's access to groups and centers.
#[async_trait]
pub trait AccessChecker: Send + Sync {
    /// Check whether the user may operate on the given group.
    async fn is_authorized_for_group(
        &self,
        user_id: &UserId,
        group_id: GroupId,
    ) -> Result<AccessResult, DomainError>;

    /// Check whether the user holds a center-wide bypass (center staff
    /// and admins), used as a fallback when group-level access is denied.
    async fn can_bypass_internal_access(
        &self,
        user_id: &UserId,
        center_id: CenterId,
    ) -> Result<bool, DomainError>;
}

/// Result of an access check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessResult {
    /// Access is granted.
    Allowed,
    /// Access is denied with a specific reason.
    Denied(AccessDeniedReason),
}

/// Why an access check failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDeniedReason {
    /// The user belongs to a different tenant.
    NotInTenant,
    /// The user is in the tenant but not assigned to this group.
    NotAssignedToGroup,
}

impl AccessDeniedReason {
    pub fn user_message(&self) -> String {
        match self {
            AccessDeniedReason::NotInTenant => {
                "This group belongs to a different center".to_string()
            }
            AccessDeniedReason::NotAssignedToGroup => {
                "You are not assigned to this group".to_string()
            }
        }
    }
}
