//! Run status enum and guarded transition table.
//!
//! Statuses advance monotonically along
//! `not-started -> running -> uploading -> {success | failed}`. Any
//! forward skip is allowed (a machine may jump straight from
//! `not-started` to `success`), terminal states are absorbing, and
//! re-reporting the current status is an accepted no-op so redelivered
//! callbacks stay idempotent. Writers must consult [`RunStatus::can_transition`]
//! before persisting a reported status.

use crate::error::CoreError;

/// Lifecycle status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Row created, delivery to the machine not yet confirmed.
    NotStarted,
    /// The machine reported execution in progress.
    Running,
    /// Generation finished, the machine is uploading outputs.
    Uploading,
    /// Terminal: outputs delivered.
    Success,
    /// Terminal: dispatch exhausted retries or the machine reported an error.
    Failed,
}

impl RunStatus {
    /// Parse from the stored `status` column / callback payload value.
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        match name {
            "not-started" => Ok(Self::NotStarted),
            "running" => Ok(Self::Running),
            "uploading" => Ok(Self::Uploading),
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            other => Err(CoreError::Validation(format!(
                "Unknown run status '{other}'"
            ))),
        }
    }

    /// Stored name value.
    pub fn name(self) -> &'static str {
        match self {
            Self::NotStarted => "not-started",
            Self::Running => "running",
            Self::Uploading => "uploading",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }

    /// Whether this status ends the run's lifecycle.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }

    /// Whether `next` is an acceptable successor of `self`.
    ///
    /// Forward moves and same-status re-reports are accepted; anything
    /// that would walk the lifecycle backwards (including any move out
    /// of a terminal state) is not.
    pub fn can_transition(self, next: RunStatus) -> bool {
        if self == next {
            return true;
        }
        match self {
            Self::NotStarted => true,
            Self::Running => !matches!(next, Self::NotStarted),
            Self::Uploading => next.is_terminal(),
            Self::Success | Self::Failed => false,
        }
    }

    /// Client-facing progress estimate for this status, out of 100.
    pub fn progress_percent(self) -> u8 {
        match self {
            Self::NotStarted => 0,
            Self::Running => 50,
            Self::Uploading => 75,
            Self::Success => 100,
            Self::Failed => 0,
        }
    }

    /// Human-readable progress message for this status.
    pub fn progress_message(self) -> &'static str {
        match self {
            Self::NotStarted => "Waiting to start",
            Self::Running => "Generating image",
            Self::Uploading => "Uploading results",
            Self::Success => "Generation completed",
            Self::Failed => "Generation failed",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trips() {
        for name in ["not-started", "running", "uploading", "success", "failed"] {
            assert_eq!(RunStatus::from_name(name).unwrap().name(), name);
        }
        assert!(RunStatus::from_name("queued").is_err());
        assert!(RunStatus::from_name("").is_err());
    }

    #[test]
    fn forward_transitions_allowed() {
        assert!(RunStatus::NotStarted.can_transition(RunStatus::Running));
        assert!(RunStatus::NotStarted.can_transition(RunStatus::Success));
        assert!(RunStatus::Running.can_transition(RunStatus::Uploading));
        assert!(RunStatus::Running.can_transition(RunStatus::Failed));
        assert!(RunStatus::Uploading.can_transition(RunStatus::Success));
    }

    #[test]
    fn same_status_is_accepted() {
        assert!(RunStatus::Running.can_transition(RunStatus::Running));
        assert!(RunStatus::Success.can_transition(RunStatus::Success));
    }

    #[test]
    fn backward_transitions_rejected() {
        assert!(!RunStatus::Running.can_transition(RunStatus::NotStarted));
        assert!(!RunStatus::Uploading.can_transition(RunStatus::Running));
        assert!(!RunStatus::Uploading.can_transition(RunStatus::NotStarted));
    }

    #[test]
    fn terminal_states_are_absorbing() {
        assert!(!RunStatus::Success.can_transition(RunStatus::Failed));
        assert!(!RunStatus::Failed.can_transition(RunStatus::Success));
        assert!(!RunStatus::Success.can_transition(RunStatus::Running));
        assert!(!RunStatus::Failed.can_transition(RunStatus::NotStarted));
    }

    #[test]
    fn progress_mapping() {
        assert_eq!(RunStatus::NotStarted.progress_percent(), 0);
        assert_eq!(RunStatus::Running.progress_percent(), 50);
        assert_eq!(RunStatus::Uploading.progress_percent(), 75);
        assert_eq!(RunStatus::Success.progress_percent(), 100);
        assert_eq!(RunStatus::Failed.progress_percent(), 0);
    }

    #[test]
    fn terminal_detection() {
        assert!(RunStatus::Success.is_terminal());
        assert!(RunStatus::Failed.is_terminal());
        assert!(!RunStatus::Uploading.is_terminal());
        assert!(!RunStatus::NotStarted.is_terminal());
    }
}
