//! StartSessionHandler - the lesson actually begins.

use std::sync::Arc;

use crate::application::materializer::MaterializationService;
use crate::domain::foundation::CommandMetadata;
use crate::domain::scheduling::{SchedulingError, Session, SessionRef, SessionStatus};
use crate::ports::{EventPublisher, SessionsStore};

use super::publish_transition;

/// Command to start a checked-in session.
#[derive(Debug, Clone)]
pub struct StartSessionCommand {
    /// Stored id or virtual identifier.
    pub session_ref: String,
}

/// Handler for the start operation.
///
/// Start is only legal from a materialized `CheckingIn` record: a virtual
/// slot must be checked in first, it is never auto-promoted here.
pub struct StartSessionHandler {
    materializer: Arc<MaterializationService>,
    store: Arc<dyn SessionsStore>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl StartSessionHandler {
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
        cmd: StartSessionCommand,
        metadata: CommandMetadata,
    ) -> Result<Session, SchedulingError> {
        let session_ref = SessionRef::parse(&cmd.session_ref)?;
        let mut session = match self.materializer.resolve(&session_ref, &metadata).await? {
            Some(session) => session,
            // A never-materialized slot is implicitly Scheduled, and
            // Scheduled -> Conducting is not a legal move.
            None => {
                return Err(SchedulingError::invalid_transition(
                    SessionStatus::Scheduled,
                    "start",
                ))
            }
        };

        if let Some(from) = session.start()? {
            self.store.update(&session).await?;
            publish_transition(&self.event_publisher, &session, from, &metadata).await;
        }
        Ok(session)
    }
}
