//! Feedback records and their lifecycle.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use time::{Date, Time};

use crate::error::{ParseError, TransitionError};
use crate::inspector::Region;

/// Lowest severity a supervisor may estimate.
pub const MIN_ESTIMATED_GRADE: u8 = 1;

/// Highest severity a supervisor may estimate.
pub const MAX_ESTIMATED_GRADE: u8 = 6;

/// Lifecycle state of a feedback record.
///
/// States only ever move forward, one step at a time:
///
/// ```text
/// Unassigned(0) -> Assigned(1) -> Confirmed(2)
/// ```
///
/// The numeric codes are the persisted and wire representation.
///
/// ```
/// use airgrid_types::FeedbackState;
///
/// assert!(FeedbackState::Unassigned.can_transition_to(FeedbackState::Assigned));
/// assert!(!FeedbackState::Unassigned.can_transition_to(FeedbackState::Confirmed));
/// assert!(FeedbackState::Confirmed.is_terminal());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(into = "u8", try_from = "i64"))]
#[repr(u8)]
pub enum FeedbackState {
    /// Submitted by a supervisor, not yet bound to an inspector.
    Unassigned = 0,
    /// Bound to exactly one inspector, awaiting a measurement.
    Assigned = 1,
    /// A measurement has been recorded. Terminal.
    Confirmed = 2,
}

impl FeedbackState {
    /// Numeric code used in storage and on the wire.
    #[must_use]
    pub fn code(self) -> u8 {
        self as u8
    }

    /// The only state reachable from this one, if any.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        match self {
            FeedbackState::Unassigned => Some(FeedbackState::Assigned),
            FeedbackState::Assigned => Some(FeedbackState::Confirmed),
            FeedbackState::Confirmed => None,
        }
    }

    /// Returns true if moving from `self` to `target` is a legal single step.
    #[must_use]
    pub fn can_transition_to(self, target: Self) -> bool {
        self.next() == Some(target)
    }

    /// Validate a transition, returning the target state on success.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] when `target` is not the immediate successor.
    pub fn transition_to(self, target: Self) -> Result<Self, TransitionError> {
        if self.can_transition_to(target) {
            Ok(target)
        } else {
            Err(TransitionError {
                from: self,
                to: target,
            })
        }
    }

    /// Returns true if no further transition exists.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        self.next().is_none()
    }
}

impl From<FeedbackState> for u8 {
    fn from(state: FeedbackState) -> Self {
        state.code()
    }
}

impl TryFrom<i64> for FeedbackState {
    type Error = ParseError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(FeedbackState::Unassigned),
            1 => Ok(FeedbackState::Assigned),
            2 => Ok(FeedbackState::Confirmed),
            other => Err(ParseError::UnknownState(other)),
        }
    }
}

impl fmt::Display for FeedbackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedbackState::Unassigned => write!(f, "Unassigned"),
            FeedbackState::Assigned => write!(f, "Assigned"),
            FeedbackState::Confirmed => write!(f, "Confirmed"),
        }
    }
}

/// Assignment details, present once a feedback has left `Unassigned`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Assignment {
    /// Inspector the feedback is bound to.
    pub inspector_id: i64,
    /// Date the assignment was made.
    #[cfg_attr(feature = "serde", serde(with = "crate::wire::date"))]
    pub date: Date,
    /// Time of day the assignment was made.
    #[cfg_attr(feature = "serde", serde(with = "crate::wire::time_of_day"))]
    pub time: Time,
}

/// A supervisor-submitted air-quality incident report.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Feedback {
    pub id: i64,
    /// Telephone id of the reporting supervisor.
    pub reporter: String,
    pub province_id: i64,
    pub city_id: i64,
    pub address: String,
    /// Free-text description of the incident.
    pub description: String,
    /// Reporter's estimate, `1..=6`.
    pub estimated_grade: u8,
    #[cfg_attr(feature = "serde", serde(with = "crate::wire::date"))]
    pub submitted_date: Date,
    #[cfg_attr(feature = "serde", serde(with = "crate::wire::time_of_day"))]
    pub submitted_time: Time,
    /// Set iff `state >= Assigned`.
    pub assignment: Option<Assignment>,
    pub remarks: Option<String>,
    pub state: FeedbackState,
}

impl Feedback {
    /// Region the incident was reported in.
    #[must_use]
    pub fn region(&self) -> Region {
        Region::new(self.province_id, self.city_id)
    }

    /// Inspector the feedback is assigned to, if any.
    #[must_use]
    pub fn inspector_id(&self) -> Option<i64> {
        self.assignment.as_ref().map(|a| a.inspector_id)
    }

    /// Check that assignment data and state agree.
    ///
    /// A record is consistent when it carries assignment details exactly when
    /// its state is `Assigned` or later.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.assignment.is_some() == (self.state >= FeedbackState::Assigned)
    }
}

/// Returns true if `grade` is a valid estimated severity.
#[must_use]
pub fn is_valid_grade(grade: i64) -> bool {
    (i64::from(MIN_ESTIMATED_GRADE)..=i64::from(MAX_ESTIMATED_GRADE)).contains(&grade)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, time};

    fn sample(state: FeedbackState, assignment: Option<Assignment>) -> Feedback {
        Feedback {
            id: 7,
            reporter: "13800000000".to_string(),
            province_id: 1,
            city_id: 1,
            address: "North gate".to_string(),
            description: "Smoke from chimney".to_string(),
            estimated_grade: 3,
            submitted_date: date!(2024 - 05 - 01),
            submitted_time: time!(08:30:00),
            assignment,
            remarks: None,
            state,
        }
    }

    #[test]
    fn test_only_forward_single_steps_allowed() {
        use FeedbackState::*;
        assert!(Unassigned.can_transition_to(Assigned));
        assert!(Assigned.can_transition_to(Confirmed));

        assert!(!Unassigned.can_transition_to(Confirmed));
        assert!(!Assigned.can_transition_to(Unassigned));
        assert!(!Confirmed.can_transition_to(Assigned));
        assert!(!Confirmed.can_transition_to(Unassigned));
        assert!(!Assigned.can_transition_to(Assigned));
    }

    #[test]
    fn test_transition_to_reports_both_states() {
        let err = FeedbackState::Confirmed
            .transition_to(FeedbackState::Assigned)
            .unwrap_err();
        assert_eq!(err.from, FeedbackState::Confirmed);
        assert_eq!(err.to, FeedbackState::Assigned);
        assert!(err.to_string().contains("Confirmed"));
    }

    #[test]
    fn test_terminal_state() {
        assert!(!FeedbackState::Unassigned.is_terminal());
        assert!(!FeedbackState::Assigned.is_terminal());
        assert!(FeedbackState::Confirmed.is_terminal());
    }

    #[test]
    fn test_state_codes() {
        for state in [
            FeedbackState::Unassigned,
            FeedbackState::Assigned,
            FeedbackState::Confirmed,
        ] {
            assert_eq!(FeedbackState::try_from(i64::from(state.code())), Ok(state));
        }
        assert_eq!(
            FeedbackState::try_from(3),
            Err(ParseError::UnknownState(3))
        );
    }

    #[test]
    fn test_state_ordering_is_lifecycle_order() {
        assert!(FeedbackState::Unassigned < FeedbackState::Assigned);
        assert!(FeedbackState::Assigned < FeedbackState::Confirmed);
    }

    #[test]
    fn test_consistency() {
        let assignment = Assignment {
            inspector_id: 4,
            date: date!(2024 - 05 - 02),
            time: time!(09:00:00),
        };

        assert!(sample(FeedbackState::Unassigned, None).is_consistent());
        assert!(sample(FeedbackState::Assigned, Some(assignment.clone())).is_consistent());
        assert!(sample(FeedbackState::Confirmed, Some(assignment.clone())).is_consistent());
        assert!(!sample(FeedbackState::Unassigned, Some(assignment)).is_consistent());
        assert!(!sample(FeedbackState::Assigned, None).is_consistent());
    }

    #[test]
    fn test_grade_bounds() {
        assert!(!is_valid_grade(0));
        assert!(is_valid_grade(1));
        assert!(is_valid_grade(6));
        assert!(!is_valid_grade(7));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_feedback_wire_format() {
        let feedback = sample(
            FeedbackState::Assigned,
            Some(Assignment {
                inspector_id: 4,
                date: date!(2024 - 05 - 02),
                time: time!(09:05:07),
            }),
        );
        let json = serde_json::to_value(&feedback).unwrap();

        assert_eq!(json["state"], 1);
        assert_eq!(json["submitted_date"], "2024-05-01");
        assert_eq!(json["submitted_time"], "08:30:00");
        assert_eq!(json["assignment"]["inspector_id"], 4);
        assert_eq!(json["assignment"]["time"], "09:05:07");
    }
}
