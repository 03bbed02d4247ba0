//! Virtual sessions: computed projections of recurring schedule slots.

use serde::Serialize;

use crate::domain::foundation::{
    BranchId, CenterId, ClassId, GroupId, ScheduleItemId, TeacherId, Timestamp,
};

use super::identity::VirtualSessionId;
use super::GroupWithClass;

/// Logical identity of a session slot, before or after materialization.
///
/// Ordering is by start time first so that sorted collections keyed by
/// `SlotKey` iterate chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotKey {
    start_millis: i64,
    group_id: GroupId,
}

impl SlotKey {
    pub fn new(group_id: GroupId, start_time: Timestamp) -> Self {
        Self {
            start_millis: start_time.epoch_millis(),
            group_id,
        }
    }

    pub fn group_id(&self) -> GroupId {
        self.group_id
    }

    pub fn start_millis(&self) -> i64 {
        self.start_millis
    }
}

/// A computed, never-persisted projection of one recurring slot.
///
/// Status is implicitly the initial `Scheduled`; a virtual session either
/// gets promoted to a persisted `Session` or is discarded at the end of
/// the read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VirtualSession {
    pub group_id: GroupId,
    pub center_id: CenterId,
    pub branch_id: BranchId,
    pub class_id: ClassId,
    pub teacher_id: TeacherId,
    pub schedule_item_id: ScheduleItemId,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
}

impl VirtualSession {
    /// Builds the projection of `item` starting at `start_time`, snapshotting
    /// the org ids from the owning group.
    pub fn project(
        group: &GroupWithClass,
        schedule_item_id: ScheduleItemId,
        start_time: Timestamp,
    ) -> Self {
        Self {
            group_id: group.group_id,
            center_id: group.center_id,
            branch_id: group.branch_id,
            class_id: group.class_id,
            teacher_id: group.teacher_id,
            schedule_item_id,
            start_time,
            end_time: start_time.plus_minutes(i64::from(group.duration_minutes)),
        }
    }

    /// Returns the slot key identifying this occurrence.
    pub fn slot_key(&self) -> SlotKey {
        SlotKey::new(self.group_id, self.start_time)
    }

    /// Returns the derived identifier handed out to clients for this
    /// not-yet-materialized occurrence.
    pub fn virtual_id(&self) -> VirtualSessionId {
        VirtualSessionId::new(self.group_id, self.start_time, Some(self.schedule_item_id))
    }
}
