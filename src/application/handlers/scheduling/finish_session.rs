//! FinishSessionHandler - the lesson ends.

use std::sync::Arc;

use crate::application::materializer::MaterializationService;
use crate::domain::foundation::CommandMetadata;
use crate::domain::scheduling::{SchedulingError, Session, SessionRef, SessionStatus};
use crate::ports::{EventPublisher, SessionsStore};

use super::publish_transition;

/// Command to finish a conducting session.
#[derive(Debug, Clone)]
pub struct FinishSessionCommand {
    /// Stored id or virtual identifier.
    pub session_ref: String,
}

/// Handler for the finish operation. Only legal from `Conducting`.
pub struct FinishSessionHandler {
    materializer: Arc<MaterializationService>,
    store: Arc<dyn SessionsStore>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl FinishSessionHandler {
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
        cmd: FinishSessionCommand,
        metadata: CommandMetadata,
    ) -> Result<Session, SchedulingError> {
        let session_ref = SessionRef::parse(&cmd.session_ref)?;
        let mut session = match self.materializer.resolve(&session_ref, &metadata).await? {
            Some(session) => session,
            None => {
                return Err(SchedulingError::invalid_transition(
                    SessionStatus::Scheduled,
                    "finish",
                ))
            }
        };

        if let Some(from) = session.finish()? {
            self.store.update(&session).await?;
            publish_transition(&self.event_publisher, &session, from, &metadata).await;
        }
        Ok(session)
    }
}
