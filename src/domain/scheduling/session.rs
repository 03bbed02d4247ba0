//! Session aggregate entity.
//!
//! A session is one concrete meeting of a group. It starts life as a
//! [`VirtualSession`] (pure computation, zero storage cost) and becomes a
//! persisted `Session` only when somebody acts on the slot: an explicit
//! extra-session creation, a check-in, a cancellation tombstone, or the
//! backfill sweep recording a missed slot.
//!
//! # Invariants
//!
//! - For a given group, at most one persisted session exists per exact
//!   start time (database uniqueness constraint; see the store port).
//! - Once persisted, a session only moves forward through the state
//!   machine; reschedule (`Canceled -> Scheduled`) is the single
//!   backward edge.
//! - `actual_start_time` / `actual_finish_time` are stamped exactly once,
//!   by the start and finish transitions.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    BranchId, CenterId, ClassId, GroupId, ScheduleItemId, SessionId, StateMachine, TeacherId,
    Timestamp, ValidationError,
};

use super::errors::SchedulingError;
use super::session_status::SessionStatus;
use super::virtual_session::{SlotKey, VirtualSession};
use super::window::TimeWindow;

/// Maximum length for a session title.
pub const MAX_TITLE_LENGTH: usize = 200;

/// A persisted (materialized) class session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Unique identifier, assigned at materialization.
    id: SessionId,

    /// Group this session belongs to.
    group_id: GroupId,

    /// Org ids snapshotted at materialization time so later org changes
    /// do not retroactively alter historical sessions.
    center_id: CenterId,
    branch_id: BranchId,
    class_id: ClassId,
    teacher_id: TeacherId,

    /// Schedule rule this session was derived from; absent for manually
    /// created extra sessions.
    schedule_item_id: Option<ScheduleItemId>,

    /// Optional display title (extra sessions mostly).
    title: Option<String>,

    /// Planned UTC window.
    start_time: Timestamp,
    end_time: Timestamp,

    /// Current lifecycle status.
    status: SessionStatus,

    /// True for manually created sessions outside the weekly schedule.
    is_extra: bool,

    /// Stamped by the start transition.
    actual_start_time: Option<Timestamp>,

    /// Stamped by the finish transition.
    actual_finish_time: Option<Timestamp>,

    created_at: Timestamp,
    updated_at: Timestamp,
}

impl Session {
    /// Promotes a virtual occurrence to a persisted session.
    ///
    /// Only the statuses a slot can be born with are accepted:
    /// `CheckingIn` (check-in), `Canceled` (tombstone), `Missed`
    /// (backfill), and `Scheduled`.
    ///
    /// # Errors
    ///
    /// - `InvalidTransition` for any other initial status
    pub fn materialize(
        id: SessionId,
        occurrence: &VirtualSession,
        initial_status: SessionStatus,
    ) -> Result<Self, SchedulingError> {
        if !matches!(
            initial_status,
            SessionStatus::Scheduled
                | SessionStatus::CheckingIn
                | SessionStatus::Canceled
                | SessionStatus::Missed
        ) {
            return Err(SchedulingError::invalid_transition(
                initial_status,
                "materialize with",
            ));
        }

        let now = Timestamp::now();
        Ok(Self {
            id,
            group_id: occurrence.group_id,
            center_id: occurrence.center_id,
            branch_id: occurrence.branch_id,
            class_id: occurrence.class_id,
            teacher_id: occurrence.teacher_id,
            schedule_item_id: Some(occurrence.schedule_item_id),
            title: None,
            start_time: occurrence.start_time,
            end_time: occurrence.end_time,
            status: initial_status,
            is_extra: false,
            actual_start_time: None,
            actual_finish_time: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Creates a manually scheduled extra session.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` if the title is too long or the window is
    ///   empty/inverted
    #[allow(clippy::too_many_arguments)]
    pub fn extra(
        id: SessionId,
        group_id: GroupId,
        center_id: CenterId,
        branch_id: BranchId,
        class_id: ClassId,
        teacher_id: TeacherId,
        title: Option<String>,
        start_time: Timestamp,
        end_time: Timestamp,
    ) -> Result<Self, SchedulingError> {
        if let Some(t) = &title {
            Self::validate_title(t).map_err(|e| {
                SchedulingError::validation("title", e.to_string())
            })?;
        }
        TimeWindow::new(start_time, end_time)
            .map_err(|e| SchedulingError::validation("time_window", e.to_string()))?;

        let now = Timestamp::now();
        Ok(Self {
            id,
            group_id,
            center_id,
            branch_id,
            class_id,
            teacher_id,
            schedule_item_id: None,
            title,
            start_time,
            end_time,
            status: SessionStatus::Scheduled,
            is_extra: true,
            actual_start_time: None,
            actual_finish_time: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Reconstitutes a session from persistence (no validation, no events).
    #[allow(clippy::too_many_arguments)]
    pub fn reconstitute(
        id: SessionId,
        group_id: GroupId,
        center_id: CenterId,
        branch_id: BranchId,
        class_id: ClassId,
        teacher_id: TeacherId,
        schedule_item_id: Option<ScheduleItemId>,
        title: Option<String>,
        start_time: Timestamp,
        end_time: Timestamp,
        status: SessionStatus,
        is_extra: bool,
        actual_start_time: Option<Timestamp>,
        actual_finish_time: Option<Timestamp>,
        created_at: Timestamp,
        updated_at: Timestamp,
    ) -> Self {
        Self {
            id,
            group_id,
            center_id,
            branch_id,
            class_id,
            teacher_id,
            schedule_item_id,
            title,
            start_time,
            end_time,
            status,
            is_extra,
            actual_start_time,
            actual_finish_time,
            created_at,
            updated_at,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn group_id(&self) -> GroupId {
        self.group_id
    }

    pub fn center_id(&self) -> CenterId {
        self.center_id
    }

    pub fn branch_id(&self) -> BranchId {
        self.branch_id
    }

    pub fn class_id(&self) -> ClassId {
        self.class_id
    }

    pub fn teacher_id(&self) -> TeacherId {
        self.teacher_id
    }

    pub fn schedule_item_id(&self) -> Option<ScheduleItemId> {
        self.schedule_item_id
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn start_time(&self) -> Timestamp {
        self.start_time
    }

    pub fn end_time(&self) -> Timestamp {
        self.end_time
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_extra(&self) -> bool {
        self.is_extra
    }

    pub fn actual_start_time(&self) -> Option<Timestamp> {
        self.actual_start_time
    }

    pub fn actual_finish_time(&self) -> Option<Timestamp> {
        self.actual_finish_time
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    /// Returns the slot key identifying this session's logical slot.
    pub fn slot_key(&self) -> SlotKey {
        SlotKey::new(self.group_id, self.start_time)
    }

    /// Returns the planned window.
    pub fn window(&self) -> TimeWindow {
        // Constructor enforced start < end.
        TimeWindow::new(self.start_time, self.end_time)
            .expect("persisted session window is valid")
    }

    /// An extra session may be deleted only while nothing has happened to
    /// it yet.
    pub fn is_deletable(&self) -> bool {
        self.is_extra && self.status == SessionStatus::Scheduled
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Transitions
    //
    // Each returns Some(previous_status) when the session changed, and
    // None for the documented idempotent no-ops.
    // ─────────────────────────────────────────────────────────────────────────

    /// Check-in: `Scheduled -> CheckingIn`.
    ///
    /// Idempotent: a session already at `CheckingIn`, `Conducting`, or
    /// `Finished` is returned unchanged.
    ///
    /// # Errors
    ///
    /// - `InvalidTransition` from `Canceled` or `Missed`
    pub fn check_in(&mut self) -> Result<Option<SessionStatus>, SchedulingError> {
        match self.status {
            SessionStatus::Scheduled => Ok(Some(self.set_status(SessionStatus::CheckingIn))),
            SessionStatus::CheckingIn | SessionStatus::Conducting | SessionStatus::Finished => {
                Ok(None)
            }
            SessionStatus::Canceled | SessionStatus::Missed => {
                Err(SchedulingError::invalid_transition(self.status, "check in"))
            }
        }
    }

    /// Start: `CheckingIn -> Conducting`, stamping `actual_start_time`.
    ///
    /// A virtual slot must be checked in first; this transition never
    /// auto-promotes. Idempotent from `Conducting` and `Finished`.
    ///
    /// # Errors
    ///
    /// - `InvalidTransition` from `Scheduled`, `Canceled`, or `Missed`
    pub fn start(&mut self) -> Result<Option<SessionStatus>, SchedulingError> {
        match self.status {
            SessionStatus::CheckingIn => {
                self.actual_start_time = Some(Timestamp::now());
                Ok(Some(self.set_status(SessionStatus::Conducting)))
            }
            SessionStatus::Conducting | SessionStatus::Finished => Ok(None),
            SessionStatus::Scheduled | SessionStatus::Canceled | SessionStatus::Missed => {
                Err(SchedulingError::invalid_transition(self.status, "start"))
            }
        }
    }

    /// Finish: `Conducting -> Finished`, stamping `actual_finish_time`.
    ///
    /// # Errors
    ///
    /// - `InvalidTransition` from any other state
    pub fn finish(&mut self) -> Result<Option<SessionStatus>, SchedulingError> {
        match self.status {
            SessionStatus::Conducting => {
                self.actual_finish_time = Some(Timestamp::now());
                Ok(Some(self.set_status(SessionStatus::Finished)))
            }
            _ => Err(SchedulingError::invalid_transition(self.status, "finish")),
        }
    }

    /// Cancel. Idempotent when already `Canceled`.
    ///
    /// # Errors
    ///
    /// - `InvalidTransition` from the terminal states `Finished` and
    ///   `Missed`
    pub fn cancel(&mut self) -> Result<Option<SessionStatus>, SchedulingError> {
        match self.status {
            SessionStatus::Scheduled | SessionStatus::CheckingIn | SessionStatus::Conducting => {
                Ok(Some(self.set_status(SessionStatus::Canceled)))
            }
            SessionStatus::Canceled => Ok(None),
            SessionStatus::Finished | SessionStatus::Missed => {
                Err(SchedulingError::invalid_transition(self.status, "cancel"))
            }
        }
    }

    /// Reschedule: `Canceled -> Scheduled`, the single backward edge.
    ///
    /// # Errors
    ///
    /// - `InvalidTransition` from any other state
    pub fn reschedule(&mut self) -> Result<Option<SessionStatus>, SchedulingError> {
        match self.status {
            SessionStatus::Canceled => Ok(Some(self.set_status(SessionStatus::Scheduled))),
            _ => Err(SchedulingError::invalid_transition(self.status, "reschedule")),
        }
    }

    /// Mark missed: `Scheduled -> Missed`. Backfill-only.
    ///
    /// # Errors
    ///
    /// - `InvalidTransition` from any other state
    pub fn mark_missed(&mut self) -> Result<Option<SessionStatus>, SchedulingError> {
        match self.status {
            SessionStatus::Scheduled => Ok(Some(self.set_status(SessionStatus::Missed))),
            _ => Err(SchedulingError::invalid_transition(self.status, "mark missed")),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Private helpers
    // ─────────────────────────────────────────────────────────────────────────

    fn set_status(&mut self, target: SessionStatus) -> SessionStatus {
        debug_assert!(self.status.can_transition_to(&target));
        let previous = self.status;
        self.status = target;
        self.updated_at = Timestamp::now();
        previous
    }

    fn validate_title(title: &str) -> Result<(), ValidationError> {
        let trimmed = title.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::empty_field("title"));
        }
        if trimmed.len() > MAX_TITLE_LENGTH {
            return Err(ValidationError::out_of_range(
                "title",
                1,
                MAX_TITLE_LENGTH as i64,
                trimmed.len() as i64,
            ));
        }
        Ok(())
    }
}
