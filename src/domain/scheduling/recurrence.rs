//! Recurrence expansion: weekly schedule rules to concrete occurrences.
//!
//! The expander walks calendar days in the owning center's time zone, not
//! UTC: "the group meets on Mondays" is a civil-calendar statement, and a
//! Monday-evening class in Cairo can start on a UTC Sunday. Durations are
//! applied as plain UTC arithmetic, which keeps sessions that straddle
//! midnight or a DST transition the right length.
//!
//! Pure functions: no I/O, no wall-clock reads. Identical inputs always
//! produce identical output.

use chrono::{Datelike, TimeZone, Utc};
use chrono_tz::Tz;

use crate::domain::foundation::Timestamp;

use super::group::{GroupWithClass, ScheduleItem};
use super::virtual_session::VirtualSession;
use super::window::TimeWindow;

/// Expands all of a group's schedule items over `window`, producing the
/// occurrences sorted ascending by start time.
///
/// The query window is intersected with the class validity window; an
/// empty intersection produces no occurrences.
pub fn expand_group(group: &GroupWithClass, window: &TimeWindow) -> Vec<VirtualSession> {
    let mut occurrences = Vec::new();
    for item in &group.schedule_items {
        expand_item(group, item, window, &mut occurrences);
    }
    occurrences.sort_by_key(|v| v.slot_key());
    occurrences
}

/// Finds the single occurrence of a group at exactly `start_time`, if any
/// schedule rule produces it.
///
/// Used when a virtual identifier must be re-derived before
/// materialization: the schedule may have changed since the identifier
/// was issued, in which case this returns `None`.
pub fn derive_occurrence(group: &GroupWithClass, start_time: Timestamp) -> Option<VirtualSession> {
    // A one-minute window around the slot keeps the walk to a single day.
    let window = TimeWindow::new(start_time, start_time.plus_minutes(1)).ok()?;
    expand_group(group, &window)
        .into_iter()
        .find(|v| v.start_time == start_time)
}

fn expand_item(
    group: &GroupWithClass,
    item: &ScheduleItem,
    window: &TimeWindow,
    out: &mut Vec<VirtualSession>,
) {
    let tz: Tz = group.timezone;

    // Walk every local civil date that could contain an in-window instant.
    // An instant t >= window.start cannot fall on a local date earlier
    // than the local date of window.start, and symmetrically for the end.
    let mut day = window.start().as_datetime().with_timezone(&tz).date_naive();
    let last_day = window.end().as_datetime().with_timezone(&tz).date_naive();

    while day <= last_day {
        let next = match day.succ_opt() {
            Some(next) => next,
            None => return,
        };

        // Weekday is decided on the local calendar day.
        if day.weekday() == item.weekday && group.is_date_in_validity(day) {
            // A wall-clock time inside a spring-forward gap does not exist
            // on that day and produces no occurrence; an ambiguous time in
            // the fall-back fold resolves to the earlier instant.
            if let Some(local_start) = tz
                .from_local_datetime(&day.and_time(item.start_time))
                .earliest()
            {
                let start = Timestamp::from_datetime(local_start.with_timezone(&Utc));
                if window.contains(start) {
                    out.push(VirtualSession::project(group, item.id, start));
                }
            }
        }

        day = next;
    }
}
