//! Catalog snapshot types consumed by the scheduling core.
//!
//! `ScheduleItem` and `GroupWithClass` are read-only snapshots delivered
//! by the `GroupCatalog` port. Their lifecycle is owned by the classes
//! module; the core never mutates them.

use chrono::{NaiveDate, NaiveTime, Weekday};
use chrono_tz::Tz;

use crate::domain::foundation::{
    BranchId, CenterId, ClassId, GroupId, ScheduleItemId, TeacherId, ValidationError,
};

/// A weekly recurring schedule rule: "this group meets every `weekday`
/// at `start_time`, local to the owning center."
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleItem {
    pub id: ScheduleItemId,
    pub group_id: GroupId,
    pub weekday: Weekday,
    /// Local wall-clock start, interpreted in the center's time zone.
    pub start_time: NaiveTime,
}

impl ScheduleItem {
    pub fn new(id: ScheduleItemId, group_id: GroupId, weekday: Weekday, start_time: NaiveTime) -> Self {
        Self {
            id,
            group_id,
            weekday,
            start_time,
        }
    }

    /// Parses the local start time from the catalog's "HH:mm" format.
    ///
    /// # Errors
    ///
    /// - `InvalidFormat` for anything that is not zero-padded "HH:mm"
    pub fn parse_start_time(raw: &str) -> Result<NaiveTime, ValidationError> {
        NaiveTime::parse_from_str(raw, "%H:%M")
            .map_err(|_| ValidationError::invalid_format("start_time", "expected HH:mm"))
    }
}

/// Lifecycle status of the class that owns a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassStatus {
    Active,
    Paused,
    Ended,
    Canceled,
}

impl ClassStatus {
    /// Only active classes may have slots materialized.
    pub fn is_active(&self) -> bool {
        matches!(self, ClassStatus::Active)
    }

    /// Returns the string form stored in the database.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            ClassStatus::Active => "active",
            ClassStatus::Paused => "paused",
            ClassStatus::Ended => "ended",
            ClassStatus::Canceled => "canceled",
        }
    }

    /// Parses the database string form.
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(ClassStatus::Active),
            "paused" => Some(ClassStatus::Paused),
            "ended" => Some(ClassStatus::Ended),
            "canceled" => Some(ClassStatus::Canceled),
            _ => None,
        }
    }
}

impl std::fmt::Display for ClassStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ClassStatus::Active => "Active",
            ClassStatus::Paused => "Paused",
            ClassStatus::Ended => "Ended",
            ClassStatus::Canceled => "Canceled",
        };
        write!(f, "{}", s)
    }
}

/// Snapshot of a group together with its owning class, as returned by the
/// `GroupCatalog` port.
///
/// The org ids are denormalized onto sessions at materialization time so
/// that later org changes do not retroactively alter historical records.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupWithClass {
    pub group_id: GroupId,
    pub center_id: CenterId,
    pub branch_id: BranchId,
    pub class_id: ClassId,
    pub teacher_id: TeacherId,
    pub class_status: ClassStatus,
    /// Session length in minutes; applied as UTC arithmetic.
    pub duration_minutes: u32,
    /// First local date on which the class may hold sessions.
    pub class_start_date: NaiveDate,
    /// Last local date (inclusive) on which the class may hold sessions.
    pub class_end_date: Option<NaiveDate>,
    /// IANA zone of the owning center; "Monday" is decided here.
    pub timezone: Tz,
    pub schedule_items: Vec<ScheduleItem>,
}

impl GroupWithClass {
    /// Checks whether a local civil date falls inside the class validity
    /// window.
    pub fn is_date_in_validity(&self, date: NaiveDate) -> bool {
        if date < self.class_start_date {
            return false;
        }
        match self.class_end_date {
            Some(end) => date <= end,
            None => true,
        }
    }
}
