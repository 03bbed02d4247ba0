//! ListSessionsHandler - the calendar read path.
//!
//! Computes virtual occurrences for the window, fetches materialized
//! sessions for the same window, and merges the two with materialized
//! records winning per slot. Takes no locks: a slot being materialized
//! concurrently may still show its virtual placeholder until the next
//! read, which is an accepted staleness window.

use std::sync::Arc;

use crate::application::materializer::MaterializationService;
use crate::domain::foundation::{CommandMetadata, GroupId};
use crate::domain::scheduling::{
    merge_sessions, recurrence, MergedSession, SchedulingError, TimeWindow, VirtualSession,
};
use crate::ports::SessionsStore;

/// Query for the unified session view of one or more groups.
#[derive(Debug, Clone)]
pub struct ListSessionsQuery {
    pub group_ids: Vec<GroupId>,
    pub window: TimeWindow,
}

/// Handler for the calendar view.
pub struct ListSessionsHandler {
    materializer: Arc<MaterializationService>,
    store: Arc<dyn SessionsStore>,
}

impl ListSessionsHandler {
    pub fn new(materializer: Arc<MaterializationService>, store: Arc<dyn SessionsStore>) -> Self {
        Self {
            materializer,
            store,
        }
    }

    pub async fn handle(
        &self,
        query: ListSessionsQuery,
        metadata: CommandMetadata,
    ) -> Result<Vec<MergedSession>, SchedulingError> {
        let mut virtuals: Vec<VirtualSession> = Vec::new();
        for group_id in &query.group_ids {
            let group = self.materializer.load_group(*group_id).await?;
            self.materializer.authorize(&metadata.user_id, &group).await?;
            virtuals.extend(recurrence::expand_group(&group, &query.window));
        }

        let materialized = self
            .store
            .find_in_window(&query.group_ids, query.window)
            .await?;

        Ok(merge_sessions(materialized, virtuals))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::scheduling::support::{metadata, ts, Fixture};
    use crate::domain::scheduling::{SessionStatus, VirtualSessionId};

    fn handler(f: &Fixture) -> ListSessionsHandler {
        ListSessionsHandler::new(f.materializer.clone(), f.store.clone())
    }

    fn january(f: &Fixture) -> ListSessionsQuery {
        ListSessionsQuery {
            group_ids: vec![f.group.group_id],
            window: TimeWindow::new(ts("2024-01-01T00:00:00Z"), ts("2024-01-15T00:00:00Z"))
                .unwrap(),
        }
    }

    #[tokio::test]
    async fn untouched_schedule_projects_virtual_sessions() {
        let f = Fixture::new();
        let view = handler(&f).handle(january(&f), metadata()).await.unwrap();

        // Two Cairo Mondays in the window, both still virtual.
        assert_eq!(view.len(), 2);
        assert!(view.iter().all(|m| !m.is_materialized()));
        assert_eq!(view[0].start_time(), ts("2024-01-01T07:00:00Z"));
        assert_eq!(view[1].start_time(), ts("2024-01-08T07:00:00Z"));
    }

    #[tokio::test]
    async fn materialized_session_replaces_projection() {
        let f = Fixture::new();
        f.materializer
            .materialize(
                &VirtualSessionId::new(f.group.group_id, ts("2024-01-08T07:00:00Z"), None),
                SessionStatus::CheckingIn,
                &metadata(),
            )
            .await
            .unwrap();

        let view = handler(&f).handle(january(&f), metadata()).await.unwrap();

        assert_eq!(view.len(), 2);
        assert!(!view[0].is_materialized());
        assert!(view[1].is_materialized());
        assert_eq!(view[1].status(), SessionStatus::CheckingIn);
    }

    #[tokio::test]
    async fn tombstone_shows_canceled_instead_of_projection() {
        let f = Fixture::new();
        f.materializer
            .materialize(
                &VirtualSessionId::new(f.group.group_id, ts("2024-01-08T07:00:00Z"), None),
                SessionStatus::Canceled,
                &metadata(),
            )
            .await
            .unwrap();

        let view = handler(&f).handle(january(&f), metadata()).await.unwrap();

        // The schedule rule still matches that Monday, but the tombstone
        // wins: the slot shows Canceled, not a fresh projection.
        assert_eq!(view.len(), 2);
        assert_eq!(view[1].status(), SessionStatus::Canceled);
        assert!(view[1].is_materialized());
    }

    #[tokio::test]
    async fn unknown_group_is_not_found() {
        let f = Fixture::new();
        let query = ListSessionsQuery {
            group_ids: vec![GroupId::new()],
            window: TimeWindow::new(ts("2024-01-01T00:00:00Z"), ts("2024-01-15T00:00:00Z"))
                .unwrap(),
        };

        let err = handler(&f).handle(query, metadata()).await.unwrap_err();
        assert!(matches!(err, SchedulingError::NotFound(_)));
    }
}
