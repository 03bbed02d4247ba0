//! CheckInSessionHandler - attendance opens for a session slot.

use std::sync::Arc;

use crate::application::materializer::MaterializationService;
use crate::domain::foundation::CommandMetadata;
use crate::domain::scheduling::{SchedulingError, Session, SessionRef, SessionStatus};
use crate::ports::{EventPublisher, SessionsStore};

use super::publish_transition;

/// Command to check in a session, virtual or materialized.
#[derive(Debug, Clone)]
pub struct CheckInSessionCommand {
    /// Stored id or virtual identifier.
    pub session_ref: String,
}

/// Handler for the check-in operation.
///
/// Idempotent: checking in a slot that is already `CheckingIn`,
/// `Conducting`, or `Finished` returns the row unchanged, and two
/// concurrent check-ins of a virtual slot produce exactly one row.
pub struct CheckInSessionHandler {
    materializer: Arc<MaterializationService>,
    store: Arc<dyn SessionsStore>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl CheckInSessionHandler {
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
        cmd: CheckInSessionCommand,
        metadata: CommandMetadata,
    ) -> Result<Session, SchedulingError> {
        match SessionRef::parse(&cmd.session_ref)? {
            SessionRef::Virtual(vid) => {
                // Materialize directly in CheckingIn; if the slot already
                // has a row (or we lose the insert race), fall through to
                // the ordinary transition on the existing row.
                let materialized = self
                    .materializer
                    .materialize(&vid, SessionStatus::CheckingIn, &metadata)
                    .await?;
                if materialized.created {
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
        if let Some(from) = session.check_in()? {
            self.store.update(&session).await?;
            publish_transition(&self.event_publisher, &session, from, metadata).await;
        }
        Ok(session)
    }
}
