//! Scheduling domain events.
//!
//! Published on session lifecycle changes:
//! - `SessionMaterialized` - a session row came into existence
//! - `SessionUpdated` - a state transition was applied
//! - `SessionCanceled` - a session was canceled (including tombstones)
//! - `SessionDeleted` - an un-started extra session was removed
//! - `SessionsBulkCreated` - backfill inserted a batch of missed records
//! - `SessionsBulkDeleted` - future projectionable sessions were purged
//! - `SessionConflictDetected` - a double-booking blocked an operation
//!
//! Downstream modules (payments, payouts, activity log) subscribe to these;
//! the core neither knows nor cares what subscribers do with them.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    domain_event, EventId, GroupId, SessionId, TeacherId, Timestamp,
};

use super::session_status::SessionStatus;

// ════════════════════════════════════════════════════════════════════════════
// SessionMaterialized
// ════════════════════════════════════════════════════════════════════════════

/// Published when a session row is created, whether by explicit extra
/// creation, a check-in promoting a virtual slot, or a tombstoning cancel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMaterialized {
    /// Unique identifier for this event.
    pub event_id: EventId,

    /// ID of the created session.
    pub session_id: SessionId,

    /// Group the session belongs to.
    pub group_id: GroupId,

    /// Planned UTC start.
    pub start_time: Timestamp,

    /// Status the row was born with.
    pub status: SessionStatus,

    /// True for manually created sessions.
    pub is_extra: bool,

    /// When the row was created.
    pub occurred_at: Timestamp,
}

domain_event!(
    SessionMaterialized,
    event_type = "session.created.v1",
    aggregate_id = session_id,
    aggregate_type = "Session",
    occurred_at = occurred_at,
    event_id = event_id
);

// ════════════════════════════════════════════════════════════════════════════
// SessionUpdated
// ════════════════════════════════════════════════════════════════════════════

/// Published when a state transition changes a persisted session.
///
/// Idempotent no-op calls do not publish this event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionUpdated {
    /// Unique identifier for this event.
    pub event_id: EventId,

    /// ID of the updated session.
    pub session_id: SessionId,

    /// Group the session belongs to.
    pub group_id: GroupId,

    /// Status before the transition.
    pub from_status: SessionStatus,

    /// Status after the transition.
    pub to_status: SessionStatus,

    /// When the transition was applied.
    pub occurred_at: Timestamp,
}

domain_event!(
    SessionUpdated,
    event_type = "session.updated.v1",
    aggregate_id = session_id,
    aggregate_type = "Session",
    occurred_at = occurred_at,
    event_id = event_id
);

// ════════════════════════════════════════════════════════════════════════════
// SessionCanceled
// ════════════════════════════════════════════════════════════════════════════

/// Published when a session is canceled, including the tombstoning of a
/// virtual slot that had never been materialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionCanceled {
    /// Unique identifier for this event.
    pub event_id: EventId,

    /// ID of the canceled session.
    pub session_id: SessionId,

    /// Group the session belongs to.
    pub group_id: GroupId,

    /// Planned UTC start of the canceled slot.
    pub start_time: Timestamp,

    /// True when the cancel created a tombstone row rather than
    /// transitioning an existing one.
    pub was_virtual: bool,

    /// When the cancellation happened.
    pub occurred_at: Timestamp,
}

domain_event!(
    SessionCanceled,
    event_type = "session.canceled.v1",
    aggregate_id = session_id,
    aggregate_type = "Session",
    occurred_at = occurred_at,
    event_id = event_id
);

// ════════════════════════════════════════════════════════════════════════════
// SessionDeleted
// ════════════════════════════════════════════════════════════════════════════

/// Published when an un-started extra session is deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDeleted {
    /// Unique identifier for this event.
    pub event_id: EventId,

    /// ID of the deleted session.
    pub session_id: SessionId,

    /// Group the session belonged to.
    pub group_id: GroupId,

    /// When the deletion happened.
    pub occurred_at: Timestamp,
}

domain_event!(
    SessionDeleted,
    event_type = "session.deleted.v1",
    aggregate_id = session_id,
    aggregate_type = "Session",
    occurred_at = occurred_at,
    event_id = event_id
);

// ════════════════════════════════════════════════════════════════════════════
// SessionsBulkCreated
// ════════════════════════════════════════════════════════════════════════════

/// Published after a backfill sweep inserts missed records for a group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsBulkCreated {
    /// Unique identifier for this event.
    pub event_id: EventId,

    /// Group whose slots were backfilled.
    pub group_id: GroupId,

    /// How many rows the sweep inserted (conflicting slots excluded).
    pub inserted: u64,

    /// Status the rows were born with (always `Missed` today).
    pub status: SessionStatus,

    /// When the sweep ran.
    pub occurred_at: Timestamp,
}

domain_event!(
    SessionsBulkCreated,
    event_type = "session.bulk_created.v1",
    aggregate_id = group_id,
    aggregate_type = "Group",
    occurred_at = occurred_at,
    event_id = event_id
);

// ════════════════════════════════════════════════════════════════════════════
// SessionsBulkDeleted
// ════════════════════════════════════════════════════════════════════════════

/// Published when future un-started recurring sessions of a group are
/// purged ahead of a schedule rewrite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsBulkDeleted {
    /// Unique identifier for this event.
    pub event_id: EventId,

    /// Group whose sessions were purged.
    pub group_id: GroupId,

    /// IDs of the deleted sessions.
    pub session_ids: Vec<SessionId>,

    /// When the purge happened.
    pub occurred_at: Timestamp,
}

domain_event!(
    SessionsBulkDeleted,
    event_type = "session.bulk_deleted.v1",
    aggregate_id = group_id,
    aggregate_type = "Group",
    occurred_at = occurred_at,
    event_id = event_id
);

// ════════════════════════════════════════════════════════════════════════════
// SessionConflictDetected
// ════════════════════════════════════════════════════════════════════════════

/// Published when a teacher or group double-booking blocks an operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConflictDetected {
    /// Unique identifier for this event.
    pub event_id: EventId,

    /// Group for which the conflicting operation was attempted.
    pub group_id: GroupId,

    /// Teacher involved, when the conflict is teacher-keyed.
    pub teacher_id: Option<TeacherId>,

    /// The already-booked session that caused the rejection.
    pub conflicting_session_id: SessionId,

    /// Requested start that could not be honored.
    pub requested_start: Timestamp,

    /// When the conflict was detected.
    pub occurred_at: Timestamp,
}

domain_event!(
    SessionConflictDetected,
    event_type = "session.conflict_detected.v1",
    aggregate_id = group_id,
    aggregate_type = "Group",
    occurred_at = occurred_at,
    event_id = event_id
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{DomainEvent, EventEnvelope};

    #[test]
    fn materialized_event_builds_envelope() {
        let event = SessionMaterialized {
            event_id: EventId::new(),
            session_id: SessionId::new(),
            group_id: GroupId::new(),
            start_time: Timestamp::now(),
            status: SessionStatus::CheckingIn,
            is_extra: false,
            occurred_at: Timestamp::now(),
        };

        let envelope = EventEnvelope::from_event(&event);
        assert_eq!(envelope.event_type, "session.created.v1");
        assert_eq!(envelope.aggregate_type, "Session");
        assert_eq!(envelope.aggregate_id, event.session_id.to_string());
    }

    #[test]
    fn bulk_events_aggregate_on_group() {
        let event = SessionsBulkCreated {
            event_id: EventId::new(),
            group_id: GroupId::new(),
            inserted: 4,
            status: SessionStatus::Missed,
            occurred_at: Timestamp::now(),
        };

        assert_eq!(event.aggregate_type(), "Group");
        assert_eq!(event.aggregate_id(), event.group_id.to_string());
    }

    #[test]
    fn updated_event_payload_roundtrips() {
        let event = SessionUpdated {
            event_id: EventId::new(),
            session_id: SessionId::new(),
            group_id: GroupId::new(),
            from_status: SessionStatus::Scheduled,
            to_status: SessionStatus::CheckingIn,
            occurred_at: Timestamp::now(),
        };

        let envelope = EventEnvelope::from_event(&event);
        let decoded: SessionUpdated = envelope.payload_as().unwrap();
        assert_eq!(decoded.to_status, SessionStatus::CheckingIn);
    }
}
