//! DeleteExtraSessionHandler - removing un-started extra sessions.
//!
//! Deletion is reserved for extra sessions nothing has happened to yet;
//! recurring materializations are canceled (tombstoned), never deleted,
//! so their slots stay suppressed.

use std::sync::Arc;

use crate::application::materializer::MaterializationService;
use crate::domain::foundation::{CommandMetadata, EventEnvelope, EventId, SessionId, Timestamp};
use crate::domain::scheduling::{SchedulingError, SessionDeleted, SessionRef};
use crate::ports::{EventPublisher, SessionsStore};

/// Command to delete an extra session.
#[derive(Debug, Clone)]
pub struct DeleteExtraSessionCommand {
    pub session_id: SessionId,
}

/// Handler for extra session deletion.
pub struct DeleteExtraSessionHandler {
    materializer: Arc<MaterializationService>,
    store: Arc<dyn SessionsStore>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl DeleteExtraSessionHandler {
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
        cmd: DeleteExtraSessionCommand,
        metadata: CommandMetadata,
    ) -> Result<(), SchedulingError> {
        let session = self
            .materializer
            .resolve(&SessionRef::Real(cmd.session_id), &metadata)
            .await?
            .ok_or_else(|| {
                SchedulingError::not_found(format!("session {}", cmd.session_id))
            })?;

        if !session.is_extra() {
            return Err(SchedulingError::validation(
                "session",
                "only extra sessions can be deleted",
            ));
        }
        if !session.is_deletable() {
            return Err(SchedulingError::invalid_transition(session.status(), "delete"));
        }

        self.store.delete(session.id()).await?;

        let event = SessionDeleted {
            event_id: EventId::new(),
            session_id: session.id(),
            group_id: session.group_id(),
            occurred_at: Timestamp::now(),
        };
        let envelope = EventEnvelope::from_event(&event)
            .with_correlation_id(metadata.correlation_id())
            .with_user_id(metadata.user_id.to_string());
        if let Err(e) = self.event_publisher.publish(envelope).await {
            tracing::warn!(session_id = %session.id(), error = %e, "failed to publish session.deleted");
        }

        Ok(())
    }
}
