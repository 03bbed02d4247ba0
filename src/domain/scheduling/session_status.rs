//! SessionStatus enum for tracking the lifecycle of a class session.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::StateMachine;

/// Lifecycle status of a class session.
///
/// Forward path: `Scheduled -> CheckingIn -> Conducting -> Finished`.
/// `Canceled` is reachable from any pre-finish state, and rescheduling
/// (`Canceled -> Scheduled`) is the only backward edge. `Missed` is set
/// exclusively by the backfill sweep, never by direct user action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Scheduled,
    CheckingIn,
    Conducting,
    Finished,
    Canceled,
    Missed,
}

impl SessionStatus {
    /// Returns the string form stored in the database.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            SessionStatus::Scheduled => "scheduled",
            SessionStatus::CheckingIn => "checking_in",
            SessionStatus::Conducting => "conducting",
            SessionStatus::Finished => "finished",
            SessionStatus::Canceled => "canceled",
            SessionStatus::Missed => "missed",
        }
    }

    /// Parses the database string form.
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "scheduled" => Some(SessionStatus::Scheduled),
            "checking_in" => Some(SessionStatus::CheckingIn),
            "conducting" => Some(SessionStatus::Conducting),
            "finished" => Some(SessionStatus::Finished),
            "canceled" => Some(SessionStatus::Canceled),
            "missed" => Some(SessionStatus::Missed),
            _ => None,
        }
    }
}

impl StateMachine for SessionStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use SessionStatus::*;
        matches!(
            (self, target),
            (Scheduled, CheckingIn)
                | (CheckingIn, Conducting)
                | (Conducting, Finished)
                | (Scheduled, Canceled)
                | (CheckingIn, Canceled)
                | (Conducting, Canceled)
                | (Canceled, Scheduled)
                | (Scheduled, Missed)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use SessionStatus::*;
        match self {
            Scheduled => vec![CheckingIn, Canceled, Missed],
            CheckingIn => vec![Conducting, Canceled],
            Conducting => vec![Finished, Canceled],
            Finished => vec![],
            Canceled => vec![Scheduled],
            Missed => vec![],
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionStatus::Scheduled => "Scheduled",
            SessionStatus::CheckingIn => "CheckingIn",
            SessionStatus::Conducting => "Conducting",
            SessionStatus::Finished => "Finished",
            SessionStatus::Canceled => "Canceled",
            SessionStatus::Missed => "Missed",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [SessionStatus; 6] = [
        SessionStatus::Scheduled,
        SessionStatus::CheckingIn,
        SessionStatus::Conducting,
        SessionStatus::Finished,
        SessionStatus::Canceled,
        SessionStatus::Missed,
    ];

    #[test]
    fn default_is_scheduled() {
        assert_eq!(SessionStatus::default(), SessionStatus::Scheduled);
    }

    #[test]
    fn forward_path_is_legal() {
        assert!(SessionStatus::Scheduled.can_transition_to(&SessionStatus::CheckingIn));
        assert!(SessionStatus::CheckingIn.can_transition_to(&SessionStatus::Conducting));
        assert!(SessionStatus::Conducting.can_transition_to(&SessionStatus::Finished));
    }

    #[test]
    fn cancel_is_legal_from_pre_finish_states() {
        assert!(SessionStatus::Scheduled.can_transition_to(&SessionStatus::Canceled));
        assert!(SessionStatus::CheckingIn.can_transition_to(&SessionStatus::Canceled));
        assert!(SessionStatus::Conducting.can_transition_to(&SessionStatus::Canceled));
    }

    #[test]
    fn cancel_is_illegal_from_terminal_states() {
        assert!(!SessionStatus::Finished.can_transition_to(&SessionStatus::Canceled));
        assert!(!SessionStatus::Missed.can_transition_to(&SessionStatus::Canceled));
    }

    #[test]
    fn reschedule_is_the_only_backward_edge() {
        assert!(SessionStatus::Canceled.can_transition_to(&SessionStatus::Scheduled));
        for status in ALL {
            if status != SessionStatus::Canceled {
                assert!(
                    !status.can_transition_to(&SessionStatus::Scheduled),
                    "{:?} must not go back to Scheduled",
                    status
                );
            }
        }
    }

    #[test]
    fn missed_only_reachable_from_scheduled() {
        assert!(SessionStatus::Scheduled.can_transition_to(&SessionStatus::Missed));
        for status in ALL {
            if status != SessionStatus::Scheduled {
                assert!(
                    !status.can_transition_to(&SessionStatus::Missed),
                    "{:?} must not move to Missed",
                    status
                );
            }
        }
    }

    #[test]
    fn finished_and_missed_are_terminal() {
        assert!(SessionStatus::Finished.is_terminal());
        assert!(SessionStatus::Missed.is_terminal());
        assert!(!SessionStatus::Scheduled.is_terminal());
        assert!(!SessionStatus::Canceled.is_terminal());
    }

    #[test]
    fn can_transition_to_is_consistent_with_valid_transitions() {
        for from in ALL {
            for to in ALL {
                assert_eq!(
                    from.can_transition_to(&to),
                    from.valid_transitions().contains(&to),
                    "inconsistent machine for {:?} -> {:?}",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn db_str_roundtrips() {
        for status in ALL {
            assert_eq!(SessionStatus::from_db_str(status.as_db_str()), Some(status));
        }
    }

    #[test]
    fn from_db_str_rejects_unknown() {
        assert_eq!(SessionStatus::from_db_str("no_show"), None);
    }

    #[test]
    fn serializes_to_snake_case_json() {
        assert_eq!(
            serde_json::to_string(&SessionStatus::CheckingIn).unwrap(),
            "\"checking_in\""
        );
        assert_eq!(
            serde_json::to_string(&SessionStatus::Missed).unwrap(),
            "\"missed\""
        );
    }
}
