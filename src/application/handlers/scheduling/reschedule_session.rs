//! RescheduleSessionHandler - reviving a canceled session.

use std::sync::Arc;

use crate::application::materializer::MaterializationService;
use crate::domain::foundation::CommandMetadata;
use crate::domain::scheduling::{SchedulingError, Session, SessionRef, SessionStatus};
use crate::ports::{EventPublisher, SessionsStore};

use super::publish_transition;

/// Command to reschedule a canceled session.
#[derive(Debug, Clone)]
pub struct RescheduleSessionCommand {
    /// Stored id or virtual identifier.
    pub session_ref: String,
}

/// Handler for the reschedule operation: `Canceled -> Scheduled`, the
/// only backward edge in the state machine. Reviving a tombstone puts
/// the slot back into the regular projection.
pub struct RescheduleSessionHandler {
    materializer: Arc<MaterializationService>,
    store: Arc<dyn SessionsStore>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl RescheduleSessionHandler {
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
        cmd: RescheduleSessionCommand,
        metadata: CommandMetadata,
    ) -> Result<Session, SchedulingError> {
        let session_ref = SessionRef::parse(&cmd.session_ref)?;
        let mut session = match self.materializer.resolve(&session_ref, &metadata).await? {
            Some(session) => session,
            // A never-materialized slot has nothing to revive.
            None => {
                return Err(SchedulingError::invalid_transition(
                    SessionStatus::Scheduled,
                    "reschedule",
                ))
            }
        };

        if let Some(from) = session.reschedule()? {
            self.store.update(&session).await?;
            publish_transition(&self.event_publisher, &session, from, &metadata).await;
        }
        Ok(session)
    }
}
