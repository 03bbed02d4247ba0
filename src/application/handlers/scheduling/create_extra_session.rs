//! CreateExtraSessionHandler - manual one-off sessions.
//!
//! Extra sessions live outside the weekly schedule but participate in
//! conflict detection exactly like recurring ones: both the teacher and
//! the group must be free for the requested window, checked before
//! anything is written.

use std::sync::Arc;

use crate::application::conflicts::ConflictDetector;
use crate::application::materializer::MaterializationService;
use crate::domain::foundation::{
    CommandMetadata, EventEnvelope, EventId, GroupId, SessionId, Timestamp,
};
use crate::domain::scheduling::{
    SchedulingError, Session, SessionMaterialized, TimeWindow,
};
use crate::ports::{EventPublisher, SessionsStore};

/// Command to create an extra session.
#[derive(Debug, Clone)]
pub struct CreateExtraSessionCommand {
    pub group_id: GroupId,
    pub title: Option<String>,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
}

/// Handler for extra session creation.
pub struct CreateExtraSessionHandler {
    materializer: Arc<MaterializationService>,
    conflicts: Arc<ConflictDetector>,
    store: Arc<dyn SessionsStore>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl CreateExtraSessionHandler {
    pub fn new(
        materializer: Arc<MaterializationService>,
        conflicts: Arc<ConflictDetector>,
        store: Arc<dyn SessionsStore>,
        event_publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            materializer,
            conflicts,
            store,
            event_publisher,
        }
    }

    pub async fn handle(
        &self,
        cmd: CreateExtraSessionCommand,
        metadata: CommandMetadata,
    ) -> Result<Session, SchedulingError> {
        // 1. Resolve the group and authorize the caller.
        let group = self.materializer.load_group(cmd.group_id).await?;
        self.materializer.authorize(&metadata.user_id, &group).await?;

        // 2. Only active classes take new sessions.
        if !group.class_status.is_active() {
            return Err(SchedulingError::ClassNotActive);
        }

        // 3. Validate the window and check both conflict keys before any
        //    write.
        let window = TimeWindow::new(cmd.start_time, cmd.end_time)
            .map_err(|e| SchedulingError::validation("time_window", e.to_string()))?;
        self.conflicts
            .ensure_teacher_free(group.teacher_id, group.group_id, window, None, &metadata)
            .await?;
        self.conflicts
            .ensure_group_free(group.group_id, window, None, &metadata)
            .await?;

        // 4. Build and insert. The uniqueness constraint still backs us
        //    up if another write sneaks into this slot between the checks
        //    and the insert.
        let session = Session::extra(
            SessionId::new(),
            group.group_id,
            group.center_id,
            group.branch_id,
            group.class_id,
            group.teacher_id,
            cmd.title,
            cmd.start_time,
            cmd.end_time,
        )?;
        if !self.store.insert_ignoring_conflict(&session).await? {
            let occupant = self
                .store
                .find_by_group_and_start_time(group.group_id, cmd.start_time)
                .await?
                .map(|s| s.id().to_string())
                .unwrap_or_default();
            return Err(SchedulingError::conflict(occupant));
        }

        // 5. Publish.
        let event = SessionMaterialized {
            event_id: EventId::new(),
            session_id: session.id(),
            group_id: session.group_id(),
            start_time: session.start_time(),
            status: session.status(),
            is_extra: true,
            occurred_at: Timestamp::now(),
        };
        let envelope = EventEnvelope::from_event(&event)
            .with_correlation_id(metadata.correlation_id())
            .with_user_id(metadata.user_id.to_string());
        if let Err(e) = self.event_publisher.publish(envelope).await {
            tracing::warn!(session_id = %session.id(), error = %e, "failed to publish session.created");
        }

        Ok(session)
    }
}
