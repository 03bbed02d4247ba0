//! Materialization: promoting virtual occurrences to persisted sessions.
//!
//! All write paths that may race on a slot go through this service. The
//! database uniqueness constraint on `(group_id, start_time)` is the only
//! mutual-exclusion primitive: a lost insert race is resolved by
//! re-reading the winner's row, never surfaced to the caller.

use std::sync::Arc;

use crate::domain::foundation::{
    CommandMetadata, EventEnvelope, EventId, GroupId, SessionId, Timestamp, UserId,
};
use crate::domain::scheduling::{
    recurrence, GroupWithClass, SchedulingError, Session, SessionMaterialized, SessionRef,
    SessionStatus, VirtualSessionId,
};
use crate::ports::{AccessChecker, AccessResult, EventPublisher, GroupCatalog, SessionsStore};

/// Outcome of a materialization call.
#[derive(Debug, Clone)]
pub struct Materialized {
    pub session: Session,
    /// True when this call wrote the row; false when the slot was already
    /// occupied (by an earlier call or by losing the insert race).
    pub created: bool,
}

/// Service guarding every path that turns a virtual occurrence into a
/// persisted session.
///
/// Guarantees, in order:
/// 1. authorization is checked before any write,
/// 2. the class governing the group is active before a slot is promoted,
/// 3. insert races are resolved by re-reading on a uniqueness violation.
pub struct MaterializationService {
    store: Arc<dyn SessionsStore>,
    catalog: Arc<dyn GroupCatalog>,
    access_checker: Arc<dyn AccessChecker>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl MaterializationService {
    pub fn new(
        store: Arc<dyn SessionsStore>,
        catalog: Arc<dyn GroupCatalog>,
        access_checker: Arc<dyn AccessChecker>,
        event_publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            store,
            catalog,
            access_checker,
            event_publisher,
        }
    }

    /// Loads the catalog snapshot for a group.
    ///
    /// # Errors
    ///
    /// - `NotFound` when the group does not exist
    pub async fn load_group(&self, group_id: GroupId) -> Result<GroupWithClass, SchedulingError> {
        self.catalog
            .group_with_class(group_id)
            .await?
            .ok_or_else(|| SchedulingError::not_found(format!("group {}", group_id)))
    }

    /// Checks the caller's authorization for a group, falling back to the
    /// center-wide bypass for center staff.
    ///
    /// The group id may come from a decoded virtual identifier, i.e. from
    /// the caller; it is never trusted without this check.
    ///
    /// # Errors
    ///
    /// - `AccessDenied` when neither check grants access
    pub async fn authorize(
        &self,
        user_id: &UserId,
        group: &GroupWithClass,
    ) -> Result<(), SchedulingError> {
        match self
            .access_checker
            .is_authorized_for_group(user_id, group.group_id)
            .await?
        {
            AccessResult::Allowed => Ok(()),
            AccessResult::Denied(_) => {
                let bypass = self
                    .access_checker
                    .can_bypass_internal_access(user_id, group.center_id)
                    .await?;
                if bypass {
                    Ok(())
                } else {
                    Err(SchedulingError::AccessDenied)
                }
            }
        }
    }

    /// Resolves a classified identifier to its persisted session, if one
    /// exists, authorizing the caller along the way.
    ///
    /// Returns `Ok(None)` for a virtual identifier whose slot was never
    /// materialized.
    ///
    /// # Errors
    ///
    /// - `NotFound` for a real id with no row, or an unknown group
    /// - `AccessDenied` when the caller may not touch the group
    pub async fn resolve(
        &self,
        session_ref: &SessionRef,
        metadata: &CommandMetadata,
    ) -> Result<Option<Session>, SchedulingError> {
        match session_ref {
            SessionRef::Real(id) => {
                let session = self
                    .store
                    .find_by_id(*id)
                    .await?
                    .ok_or_else(|| SchedulingError::not_found(format!("session {}", id)))?;
                let group = self.load_group(session.group_id()).await?;
                self.authorize(&metadata.user_id, &group).await?;
                Ok(Some(session))
            }
            SessionRef::Virtual(vid) => {
                let group = self.load_group(vid.group_id()).await?;
                self.authorize(&metadata.user_id, &group).await?;
                Ok(self
                    .store
                    .find_by_group_and_start_time(vid.group_id(), vid.start_time())
                    .await?)
            }
        }
    }

    /// Materializes the slot addressed by a virtual identifier, exactly
    /// once across concurrent callers.
    ///
    /// When the slot already has a row (including when this call loses
    /// the insert race), the existing row is returned with
    /// `created: false` and `initial_status` is not applied; the caller
    /// decides which transition to run on it.
    ///
    /// # Errors
    ///
    /// - `NotFound` - unknown group
    /// - `AccessDenied` - caller not authorized for the decoded group
    /// - `ClassNotActive` - class is paused/ended/canceled
    /// - `ScheduleItemNotFound` - no current rule produces this slot (the
    ///   schedule changed since the identifier was issued)
    pub async fn materialize(
        &self,
        vid: &VirtualSessionId,
        initial_status: SessionStatus,
        metadata: &CommandMetadata,
    ) -> Result<Materialized, SchedulingError> {
        let group = self.load_group(vid.group_id()).await?;
        self.authorize(&metadata.user_id, &group).await?;

        // The slot may already be materialized; the stored row is ground
        // truth and wins over whatever the caller intended.
        if let Some(existing) = self
            .store
            .find_by_group_and_start_time(vid.group_id(), vid.start_time())
            .await?
        {
            return Ok(Materialized {
                session: existing,
                created: false,
            });
        }

        if !group.class_status.is_active() {
            return Err(SchedulingError::ClassNotActive);
        }

        let occurrence = recurrence::derive_occurrence(&group, vid.start_time())
            .ok_or(SchedulingError::ScheduleItemNotFound)?;
        if let Some(expected_item) = vid.schedule_item_id() {
            if expected_item != occurrence.schedule_item_id {
                return Err(SchedulingError::ScheduleItemNotFound);
            }
        }

        let session = Session::materialize(SessionId::new(), &occurrence, initial_status)?;
        if self.store.insert_ignoring_conflict(&session).await? {
            self.publish_materialized(&session, metadata).await;
            return Ok(Materialized {
                session,
                created: true,
            });
        }

        // Lost the race: someone else materialized this slot between our
        // read and our insert. Their row is the answer.
        let existing = self
            .store
            .find_by_group_and_start_time(vid.group_id(), vid.start_time())
            .await?
            .ok_or_else(|| {
                SchedulingError::infrastructure("slot insert conflicted but no row was found")
            })?;
        Ok(Materialized {
            session: existing,
            created: false,
        })
    }

    /// Publishes the created event. Subscribers must not be able to roll
    /// back the write, so failures are logged and swallowed.
    async fn publish_materialized(&self, session: &Session, metadata: &CommandMetadata) {
        let event = SessionMaterialized {
            event_id: EventId::new(),
            session_id: session.id(),
            group_id: session.group_id(),
            start_time: session.start_time(),
            status: session.status(),
            is_extra: session.is_extra(),
            occurred_at: Timestamp::now(),
        };
        let envelope = EventEnvelope::from_event(&event)
            .with_correlation_id(metadata.correlation_id())
            .with_user_id(metadata.user_id.to_string());

        if let Err(e) = self.event_publisher.publish(envelope).await {
            tracing::warn!(session_id = %session.id(), error = %e, "failed to publish session.created");
        }
    }
}
