//! Scheduling-specific error types.

use crate::domain::foundation::{DomainError, ErrorCode};

use super::session_status::SessionStatus;

/// Errors surfaced by the scheduling core.
///
/// All of these are local, synchronous, and non-retryable by the core;
/// the internal re-read after a uniqueness violation is not represented
/// here because callers never observe it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulingError {
    /// No session, group, or class exists for the given id.
    NotFound(String),
    /// A virtual identifier failed to decode.
    InvalidIdentifier(String),
    /// The caller is not authorized for the decoded group.
    AccessDenied,
    /// Materialization attempted against a paused/ended/canceled class.
    ClassNotActive,
    /// The virtual identifier's time no longer matches any schedule rule.
    ScheduleItemNotFound,
    /// The state machine rejected the requested move.
    InvalidTransition {
        from: SessionStatus,
        action: &'static str,
    },
    /// Teacher or group double-booking.
    ScheduleConflict { conflicting: String },
    /// Input validation failed.
    ValidationFailed { field: String, message: String },
    /// Infrastructure error (storage, serialization).
    Infrastructure(String),
}

impl SchedulingError {
    pub fn not_found(what: impl Into<String>) -> Self {
        SchedulingError::NotFound(what.into())
    }

    pub fn invalid_identifier(reason: impl Into<String>) -> Self {
        SchedulingError::InvalidIdentifier(reason.into())
    }

    pub fn invalid_transition(from: SessionStatus, action: &'static str) -> Self {
        SchedulingError::InvalidTransition { from, action }
    }

    pub fn conflict(conflicting: impl Into<String>) -> Self {
        SchedulingError::ScheduleConflict {
            conflicting: conflicting.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        SchedulingError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        SchedulingError::Infrastructure(message.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            SchedulingError::NotFound(_) => ErrorCode::SessionNotFound,
            SchedulingError::InvalidIdentifier(_) => ErrorCode::InvalidIdentifier,
            SchedulingError::AccessDenied => ErrorCode::AccessDenied,
            SchedulingError::ClassNotActive => ErrorCode::ClassNotActive,
            SchedulingError::ScheduleItemNotFound => ErrorCode::ScheduleItemNotFound,
            SchedulingError::InvalidTransition { .. } => ErrorCode::InvalidStateTransition,
            SchedulingError::ScheduleConflict { .. } => ErrorCode::ScheduleConflict,
            SchedulingError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            SchedulingError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }

    pub fn message(&self) -> String {
        match self {
            SchedulingError::NotFound(what) => format!("Not found: {}", what),
            SchedulingError::InvalidIdentifier(reason) => {
                format!("Malformed session identifier: {}", reason)
            }
            SchedulingError::AccessDenied => "Access to this group is denied".to_string(),
            SchedulingError::ClassNotActive => "Class is not active".to_string(),
            SchedulingError::ScheduleItemNotFound => {
                "No schedule rule produces this slot".to_string()
            }
            SchedulingError::InvalidTransition { from, action } => {
                format!("Cannot {} a session in state {}", action, from)
            }
            SchedulingError::ScheduleConflict { conflicting } => {
                format!("Time conflict with session {}", conflicting)
            }
            SchedulingError::ValidationFailed { field, message } => {
                format!("Validation failed for '{}': {}", field, message)
            }
            SchedulingError::Infrastructure(msg) => format!("Error: {}", msg),
        }
    }
}

impl std::fmt::Display for SchedulingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for SchedulingError {}

impl From<DomainError> for SchedulingError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::SessionNotFound | ErrorCode::GroupNotFound => {
                SchedulingError::NotFound(err.message)
            }
            ErrorCode::ScheduleItemNotFound => SchedulingError::ScheduleItemNotFound,
            ErrorCode::InvalidIdentifier => SchedulingError::InvalidIdentifier(err.message),
            ErrorCode::AccessDenied | ErrorCode::Unauthorized => SchedulingError::AccessDenied,
            ErrorCode::ClassNotActive => SchedulingError::ClassNotActive,
            ErrorCode::ScheduleConflict => SchedulingError::ScheduleConflict {
                conflicting: err
                    .details
                    .get("conflicting_session")
                    .cloned()
                    .unwrap_or_default(),
            },
            ErrorCode::ValidationFailed
            | ErrorCode::EmptyField
            | ErrorCode::OutOfRange
            | ErrorCode::InvalidFormat => SchedulingError::ValidationFailed {
                field: err.details.get("field").cloned().unwrap_or_default(),
                message: err.message,
            },
            _ => SchedulingError::Infrastructure(err.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_variants() {
        assert_eq!(
            SchedulingError::invalid_identifier("x").code(),
            ErrorCode::InvalidIdentifier
        );
        assert_eq!(SchedulingError::AccessDenied.code(), ErrorCode::AccessDenied);
        assert_eq!(SchedulingError::ClassNotActive.code(), ErrorCode::ClassNotActive);
        assert_eq!(
            SchedulingError::conflict("abc").code(),
            ErrorCode::ScheduleConflict
        );
    }

    #[test]
    fn invalid_transition_names_state_and_action() {
        let err = SchedulingError::invalid_transition(SessionStatus::Canceled, "check in");
        assert_eq!(err.message(), "Cannot check in a session in state Canceled");
    }

    #[test]
    fn domain_error_maps_onto_scheduling_error() {
        let err: SchedulingError =
            DomainError::new(ErrorCode::ClassNotActive, "paused").into();
        assert_eq!(err, SchedulingError::ClassNotActive);

        let err: SchedulingError =
            DomainError::new(ErrorCode::DatabaseError, "connection reset").into();
        assert!(matches!(err, SchedulingError::Infrastructure(_)));
    }
}
