//! In-memory group catalog for tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, GroupId};
use crate::domain::scheduling::GroupWithClass;
use crate::ports::GroupCatalog;

/// In-memory implementation of [`GroupCatalog`].
#[derive(Default)]
pub struct InMemoryGroupCatalog {
    groups: RwLock<HashMap<GroupId, GroupWithClass>>,
}

impl InMemoryGroupCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a catalog pre-populated with the given groups.
    pub fn with_groups(groups: Vec<GroupWithClass>) -> Self {
        let map = groups.into_iter().map(|g| (g.group_id, g)).collect();
        Self {
            groups: RwLock::new(map),
        }
    }

    /// Inserts or replaces a group snapshot.
    pub async fn put(&self, group: GroupWithClass) {
        self.groups.write().await.insert(group.group_id, group);
    }
}

#[async_trait]
impl GroupCatalog for InMemoryGroupCatalog {
    async fn group_with_class(
        &self,
        group_id: GroupId,
    ) -> Result<Option<GroupWithClass>, DomainError> {
        Ok(self.groups.read().await.get(&group_id).cloned())
    }

    async fn active_groups(&self) -> Result<Vec<GroupWithClass>, DomainError> {
        let groups = self.groups.read().await;
        let mut active: Vec<GroupWithClass> = groups
            .values()
            .filter(|g| g.class_status.is_active())
            .cloned()
            .collect();
        active.sort_by_key(|g| g.group_id);
        Ok(active)
    }
}
