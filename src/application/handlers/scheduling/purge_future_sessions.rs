//! PurgeFutureSessionsHandler - clearing the runway for a schedule rewrite.
//!
//! When a group's weekly rules are being replaced, future recurring
//! materializations that nobody has touched would keep occupying slots
//! the new rules may no longer produce. This handler deletes exactly
//! those rows: future, `Scheduled`, non-extra, with no actual-time
//! stamps. Tombstones survive so operator-canceled slots stay
//! suppressed across the rewrite, and extra sessions are never touched.

use std::sync::Arc;

use crate::application::materializer::MaterializationService;
use crate::domain::foundation::{
    CommandMetadata, EventEnvelope, EventId, GroupId, SessionId, Timestamp,
};
use crate::domain::scheduling::{SchedulingError, SessionsBulkDeleted};
use crate::ports::{EventPublisher, SessionsStore};

/// Command to purge a group's future projectionable sessions.
#[derive(Debug, Clone)]
pub struct PurgeFutureSessionsCommand {
    pub group_id: GroupId,
    /// Only sessions starting strictly after this instant are removed.
    pub after: Timestamp,
}

/// Handler for the purge operation.
pub struct PurgeFutureSessionsHandler {
    materializer: Arc<MaterializationService>,
    store: Arc<dyn SessionsStore>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl PurgeFutureSessionsHandler {
    pub fn new(
        materializer: Arc<MaterializationService>,
        store: Arc<dyn SessionsStore>,
        event_publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            materializer,
            store,
            event_publisher,
        }
    }

    pub async fn handle(
        &self,
        cmd: PurgeFutureSessionsCommand,
        metadata: CommandMetadata,
    ) -> Result<Vec<SessionId>, SchedulingError> {
        let group = self.materializer.load_group(cmd.group_id).await?;
        self.materializer.authorize(&metadata.user_id, &group).await?;

        let deleted = self
            .store
            .delete_future_unstarted(cmd.group_id, cmd.after)
            .await?;
        let session_ids: Vec<SessionId> = deleted.iter().map(|s| s.id()).collect();

        if !session_ids.is_empty() {
            let event = SessionsBulkDeleted {
                event_id: EventId::new(),
                group_id: cmd.group_id,
                session_ids: session_ids.clone(),
                occurred_at: Timestamp::now(),
            };
            let envelope = EventEnvelope::from_event(&event)
                .with_correlation_id(metadata.correlation_id())
                .with_user_id(metadata.user_id.to_string());
            if let Err(e) = self.event_publisher.publish(envelope).await {
                tracing::warn!(group_id = %cmd.group_id, error = %e, "failed to publish session.bulk_deleted");
            }
        }

        Ok(session_ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::scheduling::support::{metadata, ts, Fixture};
    use crate::domain::scheduling::{SessionStatus, VirtualSessionId};

    fn handler(f: &Fixture) -> PurgeFutureSessionsHandler {
        PurgeFutureSessionsHandler::new(f.materializer.clone(), f.store.clone(), f.bus.clone())
    }

    async fn seed(f: &Fixture, start: &str, status: SessionStatus) {
        f.materializer
            .materialize(
                &VirtualSessionId::new(f.group.group_id, ts(start), None),
                status,
                &metadata(),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn purge_removes_future_scheduled_rows_only() {
        let f = Fixture::new();
        // Future untouched materialization: goes away.
        seed(&f, "2024-01-15T07:00:00Z", SessionStatus::Scheduled).await;
        // Future tombstone: survives.
        seed(&f, "2024-01-22T07:00:00Z", SessionStatus::Canceled).await;
        // Past row: survives (before the cut).
        seed(&f, "2024-01-01T07:00:00Z", SessionStatus::Scheduled).await;

        let deleted = handler(&f)
            .handle(
                PurgeFutureSessionsCommand {
                    group_id: f.group.group_id,
                    after: ts("2024-01-10T00:00:00Z"),
                },
                metadata(),
            )
            .await
            .unwrap();

        assert_eq!(deleted.len(), 1);
        assert_eq!(f.store.session_count().await, 2);
        assert!(f.bus.has_event("session.bulk_deleted.v1"));
    }

    #[tokio::test]
    async fn purge_of_clean_group_is_silent() {
        let f = Fixture::new();
        let deleted = handler(&f)
            .handle(
                PurgeFutureSessionsCommand {
                    group_id: f.group.group_id,
                    after: ts("2024-01-10T00:00:00Z"),
                },
                metadata(),
            )
            .await
            .unwrap();

        assert!(deleted.is_empty());
        assert!(!f.bus.has_event("session.bulk_deleted.v1"));
    }
}
