//! In-memory sessions store for tests.
//!
//! Mirrors the PostgreSQL adapter's contract, including the uniqueness
//! constraint on `(group_id, start_time)`: the slot index is checked and
//! updated under a single write lock, so concurrent
//! `insert_ignoring_conflict` calls behave exactly like racing inserts
//! against the real constraint.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, GroupId, SessionId, Timestamp};
use crate::domain::scheduling::{Session, SlotKey, TimeWindow};
use crate::ports::{ConflictKey, SessionsStore};

#[derive(Default)]
struct Inner {
    by_id: HashMap<SessionId, Session>,
    slots: HashMap<SlotKey, SessionId>,
}

/// In-memory implementation of [`SessionsStore`].
#[derive(Default)]
pub struct InMemorySessionsStore {
    inner: RwLock<Inner>,
}

impl InMemorySessionsStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored sessions (for test assertions).
    pub async fn session_count(&self) -> usize {
        self.inner.read().await.by_id.len()
    }

    /// Returns all stored sessions sorted by start time (for test
    /// assertions).
    pub async fn all_sessions(&self) -> Vec<Session> {
        let inner = self.inner.read().await;
        let mut sessions: Vec<Session> = inner.by_id.values().cloned().collect();
        sessions.sort_by_key(|s| (s.start_time(), s.id().to_string()));
        sessions
    }
}

#[async_trait]
impl SessionsStore for InMemorySessionsStore {
    async fn find_by_id(&self, id: SessionId) -> Result<Option<Session>, DomainError> {
        Ok(self.inner.read().await.by_id.get(&id).cloned())
    }

    async fn find_by_group_and_start_time(
        &self,
        group_id: GroupId,
        start_time: Timestamp,
    ) -> Result<Option<Session>, DomainError> {
        let inner = self.inner.read().await;
        let key = SlotKey::new(group_id, start_time);
        Ok(inner
            .slots
            .get(&key)
            .and_then(|id| inner.by_id.get(id))
            .cloned())
    }

    async fn find_in_window(
        &self,
        group_ids: &[GroupId],
        window: TimeWindow,
    ) -> Result<Vec<Session>, DomainError> {
        let inner = self.inner.read().await;
        let mut sessions: Vec<Session> = inner
            .by_id
            .values()
            .filter(|s| group_ids.contains(&s.group_id()) && window.contains(s.start_time()))
            .cloned()
            .collect();
        sessions.sort_by_key(|s| (s.start_time(), s.group_id()));
        Ok(sessions)
    }

    async fn find_overlapping(
        &self,
        key: ConflictKey,
        window: TimeWindow,
        exclude: Option<SessionId>,
    ) -> Result<Option<Session>, DomainError> {
        let inner = self.inner.read().await;
        let mut candidates: Vec<&Session> = inner
            .by_id
            .values()
            .filter(|s| match key {
                ConflictKey::Teacher(teacher_id) => s.teacher_id() == teacher_id,
                ConflictKey::Group(group_id) => s.group_id() == group_id,
            })
            .filter(|s| Some(s.id()) != exclude)
            .filter(|s| s.window().overlaps(&window))
            .collect();
        candidates.sort_by_key(|s| (s.start_time(), s.id().to_string()));
        Ok(candidates.first().map(|s| (*s).clone()))
    }

    async fn insert_ignoring_conflict(&self, session: &Session) -> Result<bool, DomainError> {
        let mut inner = self.inner.write().await;
        let key = session.slot_key();
        if inner.slots.contains_key(&key) {
            return Ok(false);
        }
        inner.slots.insert(key, session.id());
        inner.by_id.insert(session.id(), session.clone());
        Ok(true)
    }

    async fn update(&self, session: &Session) -> Result<(), DomainError> {
        let mut inner = self.inner.write().await;
        let previous = match inner.by_id.get(&session.id()) {
            Some(previous) => previous.clone(),
            None => {
                return Err(DomainError::new(
                    ErrorCode::SessionNotFound,
                    format!("Session not found: {}", session.id()),
                ))
            }
        };
        if previous.slot_key() != session.slot_key() {
            inner.slots.remove(&previous.slot_key());
            inner.slots.insert(session.slot_key(), session.id());
        }
        inner.by_id.insert(session.id(), session.clone());
        Ok(())
    }

    async fn delete(&self, id: SessionId) -> Result<(), DomainError> {
        let mut inner = self.inner.write().await;
        match inner.by_id.remove(&id) {
            Some(session) => {
                inner.slots.remove(&session.slot_key());
                Ok(())
            }
            None => Err(DomainError::new(
                ErrorCode::SessionNotFound,
                format!("Session not found: {}", id),
            )),
        }
    }

    async fn bulk_insert_missed(&self, sessions: &[Session]) -> Result<u64, DomainError> {
        let mut inner = self.inner.write().await;
        let mut inserted = 0;
        for session in sessions {
            let key = session.slot_key();
            if inner.slots.contains_key(&key) {
                continue;
            }
            inner.slots.insert(key, session.id());
            inner.by_id.insert(session.id(), session.clone());
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn find_stale_scheduled(&self, cutoff: Timestamp) -> Result<Vec<Session>, DomainError> {
        let inner = self.inner.read().await;
        let mut sessions: Vec<Session> = inner
            .by_id
            .values()
            .filter(|s| {
                s.status() == crate::domain::scheduling::SessionStatus::Scheduled
                    && s.start_time() < cutoff
            })
            .cloned()
            .collect();
        sessions.sort_by_key(|s| (s.start_time(), s.id().to_string()));
        Ok(sessions)
    }

    async fn delete_future_unstarted(
        &self,
        group_id: GroupId,
        after: Timestamp,
    ) -> Result<Vec<Session>, DomainError> {
        let mut inner = self.inner.write().await;
        let doomed: Vec<Session> = inner
            .by_id
            .values()
            .filter(|s| {
                s.group_id() == group_id
                    && !s.is_extra()
                    && s.status() == crate::domain::scheduling::SessionStatus::Scheduled
                    && s.start_time() > after
                    && s.actual_start_time().is_none()
                    && s.actual_finish_time().is_none()
            })
            .cloned()
            .collect();
        for session in &doomed {
            inner.by_id.remove(&session.id());
            inner.slots.remove(&session.slot_key());
        }
        let mut doomed = doomed;
        doomed.sort_by_key(|s| (s.start_time(), s.id().to_string()));
        Ok(doomed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{
        BranchId, CenterId, ClassId, ScheduleItemId, TeacherId,
    };
    use crate::domain::scheduling::{
        ClassStatus, GroupWithClass, SessionStatus, VirtualSession,
    };
    use chrono::NaiveDate;

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse_rfc3339(s).unwrap()
    }

    fn group_snapshot() -> GroupWithClass {
        GroupWithClass {
            group_id: GroupId::new(),
            center_id: CenterId::new(),
            branch_id: BranchId::new(),
            class_id: ClassId::new(),
            teacher_id: TeacherId::new(),
            class_status: ClassStatus::Active,
            duration_minutes: 60,
            class_start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            class_end_date: None,
            timezone: chrono_tz::UTC,
            schedule_items: vec![],
        }
    }

    fn session_at(group: &GroupWithClass, start: &str) -> Session {
        let occurrence = VirtualSession::project(group, ScheduleItemId::new(), ts(start));
        Session::materialize(SessionId::new(), &occurrence, SessionStatus::Scheduled).unwrap()
    }

    #[tokio::test]
    async fn insert_then_find_by_slot() {
        let store = InMemorySessionsStore::new();
        let group = group_snapshot();
        let session = session_at(&group, "2024-01-08T07:00:00Z");

        assert!(store.insert_ignoring_conflict(&session).await.unwrap());
        let found = store
            .find_by_group_and_start_time(group.group_id, ts("2024-01-08T07:00:00Z"))
            .await
            .unwrap();
        assert_eq!(found.map(|s| s.id()), Some(session.id()));
    }

    #[tokio::test]
    async fn second_insert_for_same_slot_is_suppressed() {
        let store = InMemorySessionsStore::new();
        let group = group_snapshot();
        let first = session_at(&group, "2024-01-08T07:00:00Z");
        let second = session_at(&group, "2024-01-08T07:00:00Z");

        assert!(store.insert_ignoring_conflict(&first).await.unwrap());
        assert!(!store.insert_ignoring_conflict(&second).await.unwrap());
        assert_eq!(store.session_count().await, 1);
    }

    #[tokio::test]
    async fn update_of_missing_session_fails() {
        let store = InMemorySessionsStore::new();
        let session = session_at(&group_snapshot(), "2024-01-08T07:00:00Z");
        let err = store.update(&session).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::SessionNotFound);
    }

    #[tokio::test]
    async fn bulk_insert_skips_occupied_slots() {
        let store = InMemorySessionsStore::new();
        let group = group_snapshot();
        let occupied = session_at(&group, "2024-01-08T07:00:00Z");
        store.insert_ignoring_conflict(&occupied).await.unwrap();

        let batch = vec![
            session_at(&group, "2024-01-08T07:00:00Z"),
            session_at(&group, "2024-01-15T07:00:00Z"),
        ];
        let inserted = store.bulk_insert_missed(&batch).await.unwrap();
        assert_eq!(inserted, 1);
        assert_eq!(store.session_count().await, 2);
    }

    #[tokio::test]
    async fn find_stale_scheduled_filters_by_status_and_cutoff() {
        let store = InMemorySessionsStore::new();
        let group = group_snapshot();
        let old = session_at(&group, "2024-01-01T07:00:00Z");
        let recent = session_at(&group, "2024-01-08T07:00:00Z");
        store.insert_ignoring_conflict(&old).await.unwrap();
        store.insert_ignoring_conflict(&recent).await.unwrap();

        let stale = store
            .find_stale_scheduled(ts("2024-01-05T00:00:00Z"))
            .await
            .unwrap();
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].id(), old.id());
    }

    #[tokio::test]
    async fn delete_future_unstarted_spares_tombstones_and_extras() {
        let store = InMemorySessionsStore::new();
        let group = group_snapshot();

        let doomed = session_at(&group, "2024-02-05T07:00:00Z");
        let mut tombstone = session_at(&group, "2024-02-12T07:00:00Z");
        tombstone.cancel().unwrap();
        let start = ts("2024-02-19T07:00:00Z");
        let extra = Session::extra(
            SessionId::new(),
            group.group_id,
            group.center_id,
            group.branch_id,
            group.class_id,
            group.teacher_id,
            None,
            start,
            start.plus_minutes(60),
        )
        .unwrap();

        store.insert_ignoring_conflict(&doomed).await.unwrap();
        store.insert_ignoring_conflict(&tombstone).await.unwrap();
        store.insert_ignoring_conflict(&extra).await.unwrap();

        let deleted = store
            .delete_future_unstarted(group.group_id, ts("2024-02-01T00:00:00Z"))
            .await
            .unwrap();

        assert_eq!(deleted.len(), 1);
        assert_eq!(deleted[0].id(), doomed.id());
        assert_eq!(store.session_count().await, 2);
    }
}
