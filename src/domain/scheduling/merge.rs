//! Merging materialized sessions with virtual projections.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::domain::foundation::{GroupId, Timestamp};

use super::session::Session;
use super::session_status::SessionStatus;
use super::virtual_session::{SlotKey, VirtualSession};

/// One entry of the unified calendar view.
///
/// A materialized session is ground truth for its slot: it may carry a
/// different status or title, or be a cancellation tombstone, and must
/// suppress the synthetic projection for that slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MergedSession {
    Materialized(Session),
    Projected(VirtualSession),
}

impl MergedSession {
    pub fn group_id(&self) -> GroupId {
        match self {
            MergedSession::Materialized(s) => s.group_id(),
            MergedSession::Projected(v) => v.group_id,
        }
    }

    pub fn start_time(&self) -> Timestamp {
        match self {
            MergedSession::Materialized(s) => s.start_time(),
            MergedSession::Projected(v) => v.start_time,
        }
    }

    pub fn status(&self) -> SessionStatus {
        match self {
            MergedSession::Materialized(s) => s.status(),
            // A projection is by definition still in the initial state.
            MergedSession::Projected(_) => SessionStatus::Scheduled,
        }
    }

    pub fn is_materialized(&self) -> bool {
        matches!(self, MergedSession::Materialized(_))
    }

    fn slot_key(&self) -> SlotKey {
        match self {
            MergedSession::Materialized(s) => s.slot_key(),
            MergedSession::Projected(v) => v.slot_key(),
        }
    }
}

/// Combines materialized sessions and virtual occurrences for one window
/// into a single view sorted ascending by start time.
///
/// Virtual entries are inserted first and then overwritten by every
/// materialized entry sharing a slot key, so a real record always wins.
pub fn merge_sessions(
    materialized: Vec<Session>,
    virtuals: Vec<VirtualSession>,
) -> Vec<MergedSession> {
    let mut by_slot: BTreeMap<SlotKey, MergedSession> = BTreeMap::new();

    for v in virtuals {
        let entry = MergedSession::Projected(v);
        by_slot.insert(entry.slot_key(), entry);
    }
    for s in materialized {
        let entry = MergedSession::Materialized(s);
        by_slot.insert(entry.slot_key(), entry);
    }

    // SlotKey orders by start time first, so the map iterates the view in
    // chronological order.
    by_slot.into_values().collect()
}
