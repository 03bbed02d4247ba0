//! Conflict detection against materialized sessions.
//!
//! Only persisted sessions are consulted: virtual occurrences of other
//! groups and teachers are never pre-materialized, so projection alone
//! can never create a conflict.

use std::sync::Arc;

use crate::domain::foundation::{
    CommandMetadata, EventEnvelope, EventId, GroupId, SessionId, TeacherId, Timestamp,
};
use crate::domain::scheduling::{SchedulingError, SessionConflictDetected, TimeWindow};
use crate::ports::{ConflictKey, EventPublisher, SessionsStore};

/// Checks a proposed window against existing bookings for a teacher or a
/// group, publishing a conflict event when a double-booking is found.
pub struct ConflictDetector {
    store: Arc<dyn SessionsStore>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl ConflictDetector {
    pub fn new(store: Arc<dyn SessionsStore>, event_publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            store,
            event_publisher,
        }
    }

    /// Ensures the teacher has no stored session overlapping `window`.
    ///
    /// # Errors
    ///
    /// - `ScheduleConflict` naming the conflicting session
    pub async fn ensure_teacher_free(
        &self,
        teacher_id: TeacherId,
        group_id: GroupId,
        window: TimeWindow,
        exclude: Option<SessionId>,
        metadata: &CommandMetadata,
    ) -> Result<(), SchedulingError> {
        let conflicting = self
            .store
            .find_overlapping(ConflictKey::Teacher(teacher_id), window, exclude)
            .await?;
        match conflicting {
            None => Ok(()),
            Some(session) => {
                self.report_conflict(group_id, Some(teacher_id), session.id(), window.start(), metadata)
                    .await;
                Err(SchedulingError::conflict(session.id().to_string()))
            }
        }
    }

    /// Ensures the group has no stored session overlapping `window`.
    ///
    /// # Errors
    ///
    /// - `ScheduleConflict` naming the conflicting session
    pub async fn ensure_group_free(
        &self,
        group_id: GroupId,
        window: TimeWindow,
        exclude: Option<SessionId>,
        metadata: &CommandMetadata,
    ) -> Result<(), SchedulingError> {
        let conflicting = self
            .store
            .find_overlapping(ConflictKey::Group(group_id), window, exclude)
            .await?;
        match conflicting {
            None => Ok(()),
            Some(session) => {
                self.report_conflict(group_id, None, session.id(), window.start(), metadata)
                    .await;
                Err(SchedulingError::conflict(session.id().to_string()))
            }
        }
    }

    /// Publishes the conflict event. A publish failure must not mask the
    /// conflict itself, so it is logged and swallowed.
    async fn report_conflict(
        &self,
        group_id: GroupId,
        teacher_id: Option<TeacherId>,
        conflicting_session_id: SessionId,
        requested_start: Timestamp,
        metadata: &CommandMetadata,
    ) {
        let event = SessionConflictDetected {
            event_id: EventId::new(),
            group_id,
            teacher_id,
            conflicting_session_id,
            requested_start,
            occurred_at: Timestamp::now(),
        };
        let envelope = EventEnvelope::from_event(&event)
            .with_correlation_id(metadata.correlation_id())
            .with_user_id(metadata.user_id.to_string());

        if let Err(e) = self.event_publisher.publish(envelope).await {
            tracing::warn!(error = %e, "failed to publish conflict event");
        }
    }
}
