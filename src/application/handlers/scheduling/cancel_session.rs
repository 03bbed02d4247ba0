//! CancelSessionHandler - canceling a slot, materialized or not.
//!
//! Canceling a virtual slot inserts a `Canceled` tombstone row: the slot
//! is permanently suppressed from future projection even though the
//! schedule rule would otherwise keep regenerating it.

use std::sync::Arc;

use crate::application::materializer::MaterializationService;
use crate::domain::foundation::{CommandMetadata, EventEnvelope, EventId, Timestamp};
use crate::domain::scheduling::{
    SchedulingError, Session, SessionCanceled, SessionRef, SessionStatus,
};
use crate::ports::{EventPublisher, SessionsStore};

/// Command to cancel a session.
#[derive(Debug, Clone)]
pub struct CancelSessionCommand {
    /// Stored id or virtual identifier.
    pub session_ref: String,
}

/// Handler for the cancel operation. Idempotent: canceling an already
/// canceled session is a no-op.
pub struct CancelSessionHandler {
    materializer: Arc<MaterializationService>,
    store: Arc<dyn SessionsStore>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl CancelSessionHandler {
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
        cmd: CancelSessionCommand,
        metadata: CommandMetadata,
    ) -> Result<Session, SchedulingError> {
        match SessionRef::parse(&cmd.session_ref)? {
            SessionRef::Virtual(vid) => {
                let materialized = self
                    .materializer
                    .materialize(&vid, SessionStatus::Canceled, &metadata)
                    .await?;
                if materialized.created {
                    self.publish_canceled(&materialized.session, true, &metadata)
                        .await;
                    return Ok(materialized.session);
                }
                self.transition(materialized.session, &metadata).await
            }
            SessionRef::Real(id) => {
                let session = self
                    .materializer
                    .resolve(&SessionRef::Real(id), &metadata)
                    .await?
                    .ok_or_else(|| SchedulingError::not_found(format!("session {}", id)))?;
                self.transition(session, &metadata).await
            }
        }
    }

    async fn transition(
        &self,
        mut session: Session,
        metadata: &CommandMetadata,
    ) -> Result<Session, SchedulingError> {
        if session.cancel()?.is_some() {
            self.store.update(&session).await?;
            self.publish_canceled(&session, false, metadata).await;
        }
        Ok(session)
    }

    async fn publish_canceled(
        &self,
        session: &Session,
        was_virtual: bool,
        metadata: &CommandMetadata,
    ) {
        let event = SessionCanceled {
            event_id: EventId::new(),
            session_id: session.id(),
            group_id: session.group_id(),
            start_time: session.start_time(),
            was_virtual,
            occurred_at: Timestamp::now(),
        };
        let envelope = EventEnvelope::from_event(&event)
            .with_correlation_id(metadata.correlation_id())
            .with_user_id(metadata.user_id.to_string());

        if let Err(e) = self.event_publisher.publish(envelope).await {
            tracing::warn!(session_id = %session.id(), error = %e, "failed to publish session.canceled");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::scheduling::support::{metadata, ts, Fixture};
    use crate::domain::scheduling::VirtualSessionId;

    fn handler(f: &Fixture) -> CancelSessionHandler {
        CancelSessionHandler::new(f.materializer.clone(), f.store.clone(), f.bus.clone())
    }

    #[tokio::test]
    async fn canceling_virtual_slot_creates_tombstone() {
        let f = Fixture::new();
        let session = handler(&f)
            .handle(
                CancelSessionCommand {
                    session_ref: f.slot_ref("2024-01-08T07:00:00Z"),
                },
                metadata(),
            )
            .await
            .unwrap();

        assert_eq!(session.status(), SessionStatus::Canceled);
        assert_eq!(f.store.session_count().await, 1);
        assert!(f.bus.has_event("session.canceled.v1"));

        let canceled = f.bus.events_of_type("session.canceled.v1");
        let payload: SessionCanceled = canceled[0].payload_as().unwrap();
        assert!(payload.was_virtual);
    }

    #[tokio::test]
    async fn canceling_twice_is_a_no_op() {
        let f = Fixture::new();
        let h = handler(&f);
        let cmd = CancelSessionCommand {
            session_ref: f.slot_ref("2024-01-08T07:00:00Z"),
        };

        let first = h.handle(cmd.clone(), metadata()).await.unwrap();
        let second = h.handle(cmd, metadata()).await.unwrap();

        assert_eq!(first.id(), second.id());
        assert_eq!(f.store.session_count().await, 1);
        assert_eq!(f.bus.events_of_type("session.canceled.v1").len(), 1);
    }

    #[tokio::test]
    async fn canceling_checked_in_session_transitions_it() {
        let f = Fixture::new();
        let seeded = f
            .materializer
            .materialize(
                &VirtualSessionId::new(f.group.group_id, ts("2024-01-08T07:00:00Z"), None),
                SessionStatus::CheckingIn,
                &metadata(),
            )
            .await
            .unwrap()
            .session;

        let session = handler(&f)
            .handle(
                CancelSessionCommand {
                    session_ref: seeded.id().to_string(),
                },
                metadata(),
            )
            .await
            .unwrap();

        assert_eq!(session.status(), SessionStatus::Canceled);
        let canceled = f.bus.events_of_type("session.canceled.v1");
        let payload: SessionCanceled = canceled[0].payload_as().unwrap();
        assert!(!payload.was_virtual);
    }

    #[tokio::test]
    async fn canceling_finished_session_fails() {
        let f = Fixture::new();
        let mut seeded = f
            .materializer
            .materialize(
                &VirtualSessionId::new(f.group.group_id, ts("2024-01-08T07:00:00Z"), None),
                SessionStatus::CheckingIn,
                &metadata(),
            )
            .await
            .unwrap()
            .session;
        seeded.start().unwrap();
        seeded.finish().unwrap();
        f.store.update(&seeded).await.unwrap();

        let err = handler(&f)
            .handle(
                CancelSessionCommand {
                    session_ref: seeded.id().to_string(),
                },
                metadata(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, SchedulingError::InvalidTransition { .. }));
    }
}
