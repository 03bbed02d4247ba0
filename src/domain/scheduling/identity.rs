//! Session identity: derived identifiers for not-yet-materialized slots.
//!
//! A virtual session has no stored id, so clients address it by a
//! deterministic identifier derived from its slot:
//!
//! ```text
//! virtual_<group-uuid>_<rfc3339-utc>_<schedule-item-uuid>
//! virtual_<group-uuid>_<rfc3339-utc>
//! ```
//!
//! Underscore-delimited; the RFC 3339 time and the UUIDs contain no
//! underscores, so splitting is unambiguous. Anything carrying the
//! `virtual_` prefix but violating the grammar is rejected as a malformed
//! identifier rather than being treated as a stored id.
//!
//! The decoded group id is data supplied by the caller: it must never be
//! acted on without re-checking the caller's authorization for that group.

use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{GroupId, ScheduleItemId, SessionId, Timestamp};

use super::errors::SchedulingError;

const VIRTUAL_PREFIX: &str = "virtual";
const DELIMITER: char = '_';

/// Derived identifier of a not-yet-materialized occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VirtualSessionId {
    group_id: GroupId,
    start_time: Timestamp,
    schedule_item_id: Option<ScheduleItemId>,
}

impl VirtualSessionId {
    pub fn new(
        group_id: GroupId,
        start_time: Timestamp,
        schedule_item_id: Option<ScheduleItemId>,
    ) -> Self {
        Self {
            group_id,
            start_time,
            schedule_item_id,
        }
    }

    pub fn group_id(&self) -> GroupId {
        self.group_id
    }

    pub fn start_time(&self) -> Timestamp {
        self.start_time
    }

    pub fn schedule_item_id(&self) -> Option<ScheduleItemId> {
        self.schedule_item_id
    }

    /// Encodes to the delimited wire form.
    pub fn encode(&self) -> String {
        match self.schedule_item_id {
            Some(item) => format!(
                "{}{}{}{}{}{}{}",
                VIRTUAL_PREFIX,
                DELIMITER,
                self.group_id,
                DELIMITER,
                self.start_time.to_rfc3339(),
                DELIMITER,
                item
            ),
            None => format!(
                "{}{}{}{}{}",
                VIRTUAL_PREFIX,
                DELIMITER,
                self.group_id,
                DELIMITER,
                self.start_time.to_rfc3339()
            ),
        }
    }

    /// Decodes the delimited wire form.
    ///
    /// # Errors
    ///
    /// - `InvalidIdentifier` when the field count is not 3 or 4, any UUID
    ///   fails to parse, or the time component is not RFC 3339
    pub fn decode(raw: &str) -> Result<Self, SchedulingError> {
        let fields: Vec<&str> = raw.split(DELIMITER).collect();
        if fields.len() != 3 && fields.len() != 4 {
            return Err(SchedulingError::invalid_identifier(format!(
                "expected 3 or 4 fields, got {}",
                fields.len()
            )));
        }
        if fields[0] != VIRTUAL_PREFIX {
            return Err(SchedulingError::invalid_identifier("missing virtual prefix"));
        }

        let group_id = GroupId::from_str(fields[1])
            .map_err(|_| SchedulingError::invalid_identifier("group id is not a UUID"))?;
        let start_time = Timestamp::parse_rfc3339(fields[2])
            .map_err(|_| SchedulingError::invalid_identifier("start time is not RFC 3339"))?;
        let schedule_item_id = match fields.get(3) {
            Some(s) => Some(
                ScheduleItemId::from_str(s).map_err(|_| {
                    SchedulingError::invalid_identifier("schedule item id is not a UUID")
                })?,
            ),
            None => None,
        };

        Ok(Self {
            group_id,
            start_time,
            schedule_item_id,
        })
    }
}

impl fmt::Display for VirtualSessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encode())
    }
}

/// An incoming session identifier, classified.
///
/// Anything matching the virtual grammar is `Virtual`; everything else is
/// treated as an opaque stored id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionRef {
    Real(SessionId),
    Virtual(VirtualSessionId),
}

impl SessionRef {
    /// Classifies and parses an incoming identifier.
    ///
    /// # Errors
    ///
    /// - `InvalidIdentifier` when a virtual-prefixed string violates the
    ///   grammar, or a non-virtual string is not a valid stored id
    pub fn parse(raw: &str) -> Result<Self, SchedulingError> {
        if raw.starts_with(VIRTUAL_PREFIX) && raw[VIRTUAL_PREFIX.len()..].starts_with(DELIMITER) {
            return Ok(SessionRef::Virtual(VirtualSessionId::decode(raw)?));
        }
        let id = SessionId::from_str(raw)
            .map_err(|_| SchedulingError::invalid_identifier("not a session UUID"))?;
        Ok(SessionRef::Real(id))
    }
}
