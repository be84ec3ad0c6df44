//! Job lifecycle state machine.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a job is in its lifecycle.
///
/// # State Machine
///
/// ```text
/// Queued -> Running, Failed
/// Running -> Collecting, Failed
/// Collecting -> Reporting, Failed
/// Reporting -> Delivered, Failed
/// Delivered -> (terminal)
/// Failed -> (terminal)
/// ```
///
/// # Examples
///
/// ```
/// use tide_audit::dispatch::JobState;
///
/// assert!(JobState::Queued.can_transition_to(JobState::Running));
/// assert!(JobState::Reporting.can_transition_to(JobState::Failed));
/// assert!(!JobState::Running.can_transition_to(JobState::Delivered));
/// assert!(JobState::Delivered.is_terminal());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Accepted, not started.
    Queued,
    /// Tasks are executing.
    Running,
    /// Tasks have settled; artifacts are being uploaded.
    Collecting,
    /// The report is being built and sent.
    Reporting,
    /// The report was accepted downstream (terminal).
    Delivered,
    /// The job failed (terminal).
    Failed,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Queued => write!(f, "queued"),
            Self::Running => write!(f, "running"),
            Self::Collecting => write!(f, "collecting"),
            Self::Reporting => write!(f, "reporting"),
            Self::Delivered => write!(f, "delivered"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl JobState {
    /// Returns `true` for `Delivered` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Failed)
    }

    /// Returns `true` if moving from this state to `next` is allowed.
    ///
    /// Every non-terminal state may fail; otherwise a job only moves one
    /// step forward. Self-transitions are rejected.
    pub fn can_transition_to(&self, next: Self) -> bool {
        if *self == next || self.is_terminal() {
            return false;
        }
        if next == Self::Failed {
            return true;
        }
        matches!(
            (self, next),
            (Self::Queued, Self::Running)
                | (Self::Running, Self::Collecting)
                | (Self::Collecting, Self::Reporting)
                | (Self::Reporting, Self::Delivered)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [JobState; 6] = [
        JobState::Queued,
        JobState::Running,
        JobState::Collecting,
        JobState::Reporting,
        JobState::Delivered,
        JobState::Failed,
    ];

    #[test]
    fn happy_path_is_allowed() {
        let path = [
            JobState::Queued,
            JobState::Running,
            JobState::Collecting,
            JobState::Reporting,
            JobState::Delivered,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn terminal_states_reject_everything() {
        for next in ALL {
            assert!(!JobState::Delivered.can_transition_to(next));
            assert!(!JobState::Failed.can_transition_to(next));
        }
    }

    #[test]
    fn no_skipping_ahead() {
        assert!(!JobState::Queued.can_transition_to(JobState::Collecting));
        assert!(!JobState::Running.can_transition_to(JobState::Reporting));
        assert!(!JobState::Collecting.can_transition_to(JobState::Delivered));
        assert!(!JobState::Reporting.can_transition_to(JobState::Running));
    }

    #[test]
    fn display_matches_serde() {
        for state in ALL {
            let json = serde_json::to_string(&state).unwrap();
            assert_eq!(json, format!("\"{state}\""));
        }
    }
}
