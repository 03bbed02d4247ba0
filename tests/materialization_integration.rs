//! Integration tests for session virtualization and materialization.
//!
//! These tests drive the command handlers end-to-end over the in-memory
//! adapters:
//! 1. Calendar reads project virtual sessions from the weekly schedule
//! 2. Check-in materializes a slot exactly once, race-safe
//! 3. Cancellation tombstones suppress future projection
//! 4. Conflict detection blocks double-bookings before any write

use std::sync::Arc;

use chrono::{NaiveDate, Weekday};

use classhub::adapters::events::InMemoryEventBus;
use classhub::adapters::memory::{
    InMemoryGroupCatalog, InMemorySessionsStore, StaticAccessChecker,
};
use classhub::application::handlers::scheduling::{
    CancelSessionCommand, CancelSessionHandler, CheckInSessionCommand, CheckInSessionHandler,
    CreateExtraSessionCommand, CreateExtraSessionHandler, FinishSessionCommand,
    FinishSessionHandler, ListSessionsHandler, ListSessionsQuery, StartSessionCommand,
    StartSessionHandler,
};
use classhub::application::{ConflictDetector, MaterializationService};
use classhub::domain::foundation::{
    BranchId, CenterId, ClassId, CommandMetadata, GroupId, ScheduleItemId, TeacherId, Timestamp,
    UserId,
};
use classhub::domain::scheduling::{
    ClassStatus, GroupWithClass, ScheduleItem, SchedulingError, SessionStatus, TimeWindow,
    VirtualSessionId,
};

// =============================================================================
// Test Infrastructure
// =============================================================================

fn ts(s: &str) -> Timestamp {
    Timestamp::parse_rfc3339(s).unwrap()
}

fn metadata() -> CommandMetadata {
    CommandMetadata::new(UserId::new("teacher-1").unwrap()).with_correlation_id("it-corr")
}

/// Mondays at 09:00 Cairo time; 07:00Z while Egypt is on standard time.
fn cairo_group() -> GroupWithClass {
    let group_id = GroupId::new();
    GroupWithClass {
        group_id,
        center_id: CenterId::new(),
        branch_id: BranchId::new(),
        class_id: ClassId::new(),
        teacher_id: TeacherId::new(),
        class_status: ClassStatus::Active,
        duration_minutes: 60,
        class_start_date: NaiveDate::from_ymd_opt(2023, 9, 1).unwrap(),
        class_end_date: None,
        timezone: chrono_tz::Africa::Cairo,
        schedule_items: vec![ScheduleItem {
            id: ScheduleItemId::new(),
            group_id,
            weekday: Weekday::Mon,
            start_time: ScheduleItem::parse_start_time("09:00").unwrap(),
        }],
    }
}

struct Harness {
    store: Arc<InMemorySessionsStore>,
    bus: Arc<InMemoryEventBus>,
    materializer: Arc<MaterializationService>,
    conflicts: Arc<ConflictDetector>,
    group: GroupWithClass,
}

impl Harness {
    fn new() -> Self {
        Self::with_access(Arc::new(StaticAccessChecker::allow_all()))
    }

    fn with_access(access: Arc<StaticAccessChecker>) -> Self {
        let group = cairo_group();
        let store = Arc::new(InMemorySessionsStore::new());
        let bus = Arc::new(InMemoryEventBus::new());
        let catalog = Arc::new(InMemoryGroupCatalog::with_groups(vec![group.clone()]));
        let materializer = Arc::new(MaterializationService::new(
            store.clone(),
            catalog,
            access,
            bus.clone(),
        ));
        let conflicts = Arc::new(ConflictDetector::new(store.clone(), bus.clone()));
        Self {
            store,
            bus,
            materializer,
            conflicts,
            group,
        }
    }

    fn check_in(&self) -> CheckInSessionHandler {
        CheckInSessionHandler::new(
            self.materializer.clone(),
            self.store.clone(),
            self.bus.clone(),
        )
    }

    fn start(&self) -> StartSessionHandler {
        StartSessionHandler::new(
            self.materializer.clone(),
            self.store.clone(),
            self.bus.clone(),
        )
    }

    fn finish(&self) -> FinishSessionHandler {
        FinishSessionHandler::new(
            self.materializer.clone(),
            self.store.clone(),
            self.bus.clone(),
        )
    }

    fn cancel(&self) -> CancelSessionHandler {
        CancelSessionHandler::new(
            self.materializer.clone(),
            self.store.clone(),
            self.bus.clone(),
        )
    }

    fn list(&self) -> ListSessionsHandler {
        ListSessionsHandler::new(self.materializer.clone(), self.store.clone())
    }

    fn create_extra(&self) -> CreateExtraSessionHandler {
        CreateExtraSessionHandler::new(
            self.materializer.clone(),
            self.conflicts.clone(),
            self.store.clone(),
            self.bus.clone(),
        )
    }

    fn january(&self) -> ListSessionsQuery {
        ListSessionsQuery {
            group_ids: vec![self.group.group_id],
            window: TimeWindow::new(ts("2024-01-01T00:00:00Z"), ts("2024-01-15T00:00:00Z"))
                .unwrap(),
        }
    }

    fn slot_ref(&self, start: &str) -> String {
        VirtualSessionId::new(self.group.group_id, ts(start), None).encode()
    }
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test]
async fn virtual_slot_runs_through_the_full_lifecycle() {
    let h = Harness::new();

    // The calendar shows two projected Mondays; nothing is stored.
    let view = h.list().handle(h.january(), metadata()).await.unwrap();
    assert_eq!(view.len(), 2);
    assert!(view.iter().all(|m| !m.is_materialized()));
    assert_eq!(h.store.session_count().await, 0);

    // Check in the second Monday by its virtual identifier.
    let session = h
        .check_in()
        .handle(
            CheckInSessionCommand {
                session_ref: h.slot_ref("2024-01-08T07:00:00Z"),
            },
            metadata(),
        )
        .await
        .unwrap();
    assert_eq!(session.status(), SessionStatus::CheckingIn);

    // The calendar now shows the materialized row for that slot.
    let view = h.list().handle(h.january(), metadata()).await.unwrap();
    assert_eq!(view.len(), 2);
    assert!(view[1].is_materialized());
    assert_eq!(view[1].status(), SessionStatus::CheckingIn);

    // Start, then finish, by stored id.
    let session = h
        .start()
        .handle(
            StartSessionCommand {
                session_ref: session.id().to_string(),
            },
            metadata(),
        )
        .await
        .unwrap();
    assert_eq!(session.status(), SessionStatus::Conducting);
    assert!(session.actual_start_time().is_some());

    let session = h
        .finish()
        .handle(
            FinishSessionCommand {
                session_ref: session.id().to_string(),
            },
            metadata(),
        )
        .await
        .unwrap();
    assert_eq!(session.status(), SessionStatus::Finished);
    assert!(session.actual_finish_time().is_some());

    // One created event, two transition events.
    assert_eq!(h.bus.events_of_type("session.created.v1").len(), 1);
    assert_eq!(h.bus.events_of_type("session.updated.v1").len(), 2);
}

#[tokio::test]
async fn two_concurrent_check_ins_materialize_exactly_one_row() {
    let h = Harness::new();
    let handler = h.check_in();
    let cmd = CheckInSessionCommand {
        session_ref: h.slot_ref("2024-01-08T07:00:00Z"),
    };

    let (a, b) = tokio::join!(
        handler.handle(cmd.clone(), metadata()),
        handler.handle(cmd, metadata()),
    );
    let a = a.unwrap();
    let b = b.unwrap();

    assert_eq!(a.id(), b.id());
    assert_eq!(a.status(), SessionStatus::CheckingIn);
    assert_eq!(b.status(), SessionStatus::CheckingIn);
    assert_eq!(h.store.session_count().await, 1);
}

// =============================================================================
// Tombstones
// =============================================================================

#[tokio::test]
async fn canceled_virtual_slot_stays_canceled_in_the_calendar() {
    let h = Harness::new();

    let session = h
        .cancel()
        .handle(
            CancelSessionCommand {
                session_ref: h.slot_ref("2024-01-08T07:00:00Z"),
            },
            metadata(),
        )
        .await
        .unwrap();
    assert_eq!(session.status(), SessionStatus::Canceled);
    assert_eq!(h.store.session_count().await, 1);

    // The schedule rule still matches that Monday, but the calendar shows
    // the tombstone, not a fresh projection.
    let view = h.list().handle(h.january(), metadata()).await.unwrap();
    assert_eq!(view.len(), 2);
    assert_eq!(view[1].status(), SessionStatus::Canceled);
    assert!(view[1].is_materialized());

    // And checking the slot in afterwards is rejected.
    let err = h
        .check_in()
        .handle(
            CheckInSessionCommand {
                session_ref: h.slot_ref("2024-01-08T07:00:00Z"),
            },
            metadata(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulingError::InvalidTransition { .. }));
}

// =============================================================================
// Conflicts
// =============================================================================

#[tokio::test]
async fn overlapping_extra_session_for_same_teacher_is_rejected_without_writing() {
    let h = Harness::new();
    let handler = h.create_extra();

    handler
        .handle(
            CreateExtraSessionCommand {
                group_id: h.group.group_id,
                title: None,
                start_time: ts("2024-01-10T10:00:00Z"),
                end_time: ts("2024-01-10T11:00:00Z"),
            },
            metadata(),
        )
        .await
        .unwrap();

    let err = handler
        .handle(
            CreateExtraSessionCommand {
                group_id: h.group.group_id,
                title: None,
                start_time: ts("2024-01-10T10:30:00Z"),
                end_time: ts("2024-01-10T11:30:00Z"),
            },
            metadata(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, SchedulingError::ScheduleConflict { .. }));
    assert_eq!(h.store.session_count().await, 1);
    assert!(h.bus.has_event("session.conflict_detected.v1"));
}

// =============================================================================
// Authorization
// =============================================================================

#[tokio::test]
async fn unauthorized_caller_cannot_touch_a_decoded_group() {
    let h = Harness::with_access(Arc::new(StaticAccessChecker::deny_all()));

    let err = h
        .check_in()
        .handle(
            CheckInSessionCommand {
                session_ref: h.slot_ref("2024-01-08T07:00:00Z"),
            },
            metadata(),
        )
        .await
        .unwrap_err();

    assert_eq!(err, SchedulingError::AccessDenied);
    assert_eq!(h.store.session_count().await, 0);
    assert_eq!(h.bus.event_count(), 0);
}

#[tokio::test]
async fn center_staff_bypass_grants_access_without_group_assignment() {
    let access = Arc::new(StaticAccessChecker::with_grants());
    let admin = UserId::new("center-admin").unwrap();
    access.grant_bypass(&admin).await;
    let h = Harness::with_access(access);

    let session = h
        .check_in()
        .handle(
            CheckInSessionCommand {
                session_ref: h.slot_ref("2024-01-08T07:00:00Z"),
            },
            CommandMetadata::new(admin),
        )
        .await
        .unwrap();

    assert_eq!(session.status(), SessionStatus::CheckingIn);
}
