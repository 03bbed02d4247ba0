//! Group catalog port - read-only view of groups, classes, and schedules.
//!
//! The classes module owns this data; the scheduling core treats the
//! snapshot as ground truth for denormalization at materialization time
//! and never writes through this port.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, GroupId};
use crate::domain::scheduling::GroupWithClass;

/// Port for reading group and class catalog data.
#[async_trait]
pub trait GroupCatalog: Send + Sync {
    /// Fetch a group together with its owning class and schedule items.
    ///
    /// Returns `None` when the group does not exist.
    async fn group_with_class(
        &self,
        group_id: GroupId,
    ) -> Result<Option<GroupWithClass>, DomainError>;

    /// All groups whose owning class is currently active, with their
    /// schedule items. Used by the backfill sweep.
    async fn active_groups(&self) -> Result<Vec<GroupWithClass>, DomainError>;
}
