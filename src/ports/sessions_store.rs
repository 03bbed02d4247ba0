//! Sessions store port - the persistence boundary of the scheduling core.
//!
//! The core depends only on this narrow interface, never on a query
//! builder or ORM. The one non-negotiable implementation requirement is
//! the uniqueness constraint on `(group_id, start_time)`: it is the
//! mutual-exclusion primitive for concurrent materialization, and
//! `insert_ignoring_conflict` / `bulk_insert_missed` must swallow
//! uniqueness violations rather than surfacing them.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, GroupId, SessionId, TeacherId, Timestamp};
use crate::domain::scheduling::{Session, TimeWindow};

/// Key for overlap queries: who must be free during a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKey {
    Teacher(TeacherId),
    Group(GroupId),
}

/// Port for session persistence.
///
/// Implementations must ensure:
/// - A unique constraint on `(group_id, start_time)`
/// - Insert-ignore semantics reporting whether a row was actually written
#[async_trait]
pub trait SessionsStore: Send + Sync {
    /// Find a session by its stored id.
    ///
    /// Returns `None` if not found.
    async fn find_by_id(&self, id: SessionId) -> Result<Option<Session>, DomainError>;

    /// Find the session occupying an exact slot, if any.
    async fn find_by_group_and_start_time(
        &self,
        group_id: GroupId,
        start_time: Timestamp,
    ) -> Result<Option<Session>, DomainError>;

    /// Find all sessions of the given groups starting inside `window`,
    /// ordered ascending by start time.
    async fn find_in_window(
        &self,
        group_ids: &[GroupId],
        window: TimeWindow,
    ) -> Result<Vec<Session>, DomainError>;

    /// Find the first stored session for `key` whose window overlaps the
    /// given one, optionally excluding a session id (used when moving an
    /// existing session).
    async fn find_overlapping(
        &self,
        key: ConflictKey,
        window: TimeWindow,
        exclude: Option<SessionId>,
    ) -> Result<Option<Session>, DomainError>;

    /// Insert a session unless its slot is already occupied.
    ///
    /// Returns `true` when the row was written and `false` when the
    /// uniqueness constraint suppressed the insert. Losing the race is a
    /// normal outcome, not an error.
    async fn insert_ignoring_conflict(&self, session: &Session) -> Result<bool, DomainError>;

    /// Update an existing session.
    ///
    /// # Errors
    ///
    /// - `SessionNotFound` if the session does not exist
    async fn update(&self, session: &Session) -> Result<(), DomainError>;

    /// Delete a session (permitted for un-started extra sessions only;
    /// the caller enforces that rule).
    ///
    /// # Errors
    ///
    /// - `SessionNotFound` if the session does not exist
    async fn delete(&self, id: SessionId) -> Result<(), DomainError>;

    /// Bulk-insert missed records, ignoring slots that already have a
    /// session. Returns how many rows were actually written.
    async fn bulk_insert_missed(&self, sessions: &[Session]) -> Result<u64, DomainError>;

    /// Find `Scheduled` sessions whose planned start is older than
    /// `cutoff` (candidates for the stale sweep).
    async fn find_stale_scheduled(&self, cutoff: Timestamp) -> Result<Vec<Session>, DomainError>;

    /// Delete a group's future, un-started, non-extra sessions that carry
    /// no actual-time stamps, returning the deleted rows. Tombstones
    /// survive because `Canceled` is not `Scheduled`.
    async fn delete_future_unstarted(
        &self,
        group_id: GroupId,
        after: Timestamp,
    ) -> Result<Vec<Session>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Trait object safety test
    #[test]
    fn sessions_store_is_object_safe() {
        fn _accepts_dyn(_store: &dyn SessionsStore) {}
    }
}
