use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::api::TransportError;
use crate::config;

use super::validator::ValidationError;

/// Canonical state of one in-flight analysis.
///
/// Transitions are strictly sequential; `Complete` and `Failed` are
/// absorbing until a new submission re-enters `Idle`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum WorkflowState {
    Idle,
    Validating,
    Uploading { progress: u8 },
    Extracting,
    Normalizing,
    Generating,
    Complete,
    Failed { reason: String },
}

impl WorkflowState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed { .. })
    }

    pub fn rank(&self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Validating => 1,
            Self::Uploading { .. } => 2,
            Self::Extracting => 3,
            Self::Normalizing => 4,
            Self::Generating => 5,
            Self::Complete => 6,
            Self::Failed { .. } => 7,
        }
    }

    /// Whether `next` is a legal direct successor of `self`.
    pub fn can_advance_to(&self, next: &WorkflowState) -> bool {
        match (self, next) {
            // A new submission re-enters Idle only from rest or a terminal state.
            (current, Self::Idle) => current.is_terminal() || *current == Self::Idle,
            // Any non-terminal state may fail.
            (current, Self::Failed { .. }) => !current.is_terminal(),
            // Upload progress is monotonic.
            (Self::Uploading { progress: a }, Self::Uploading { progress: b }) => b >= a,
            (current, next) => next.rank() == current.rank() + 1,
        }
    }
}

/// Why a workflow attempt ended without a report.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Transport failure: {0}")]
    Transport(#[from] TransportError),

    #[error("Workflow cancelled")]
    Cancelled,

    #[error("A submission is already in flight")]
    Busy,
}

/// Nominal durations of the user-facing processing phases. The phases
/// pace feedback only — the analysis request runs concurrently.
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    pub extracting: Duration,
    pub normalizing: Duration,
    pub generating: Duration,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            extracting: Duration::from_millis(config::EXTRACTING_PHASE_MS),
            normalizing: Duration::from_millis(config::NORMALIZING_PHASE_MS),
            generating: Duration::from_millis(config::GENERATING_PHASE_MS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_sequence_is_legal() {
        let sequence = [
            WorkflowState::Idle,
            WorkflowState::Validating,
            WorkflowState::Uploading { progress: 0 },
            WorkflowState::Uploading { progress: 40 },
            WorkflowState::Uploading { progress: 100 },
            WorkflowState::Extracting,
            WorkflowState::Normalizing,
            WorkflowState::Generating,
            WorkflowState::Complete,
        ];
        for pair in sequence.windows(2) {
            assert!(
                pair[0].can_advance_to(&pair[1]),
                "{:?} -> {:?} should be legal",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn upload_progress_cannot_regress() {
        let at_40 = WorkflowState::Uploading { progress: 40 };
        assert!(!at_40.can_advance_to(&WorkflowState::Uploading { progress: 30 }));
        assert!(at_40.can_advance_to(&WorkflowState::Uploading { progress: 40 }));
    }

    #[test]
    fn states_cannot_skip_or_run_backwards() {
        assert!(!WorkflowState::Validating.can_advance_to(&WorkflowState::Extracting));
        assert!(!WorkflowState::Generating.can_advance_to(&WorkflowState::Extracting));
        assert!(!WorkflowState::Extracting.can_advance_to(&WorkflowState::Generating));
    }

    #[test]
    fn terminal_states_are_absorbing_except_for_idle_reset() {
        let complete = WorkflowState::Complete;
        let failed = WorkflowState::Failed { reason: "x".into() };
        assert!(!complete.can_advance_to(&WorkflowState::Validating));
        assert!(!failed.can_advance_to(&WorkflowState::Generating));
        assert!(!complete.can_advance_to(&WorkflowState::Failed { reason: "y".into() }));
        assert!(complete.can_advance_to(&WorkflowState::Idle));
        assert!(failed.can_advance_to(&WorkflowState::Idle));
    }

    #[test]
    fn any_non_terminal_state_can_fail() {
        for state in [
            WorkflowState::Idle,
            WorkflowState::Validating,
            WorkflowState::Uploading { progress: 55 },
            WorkflowState::Generating,
        ] {
            assert!(state.can_advance_to(&WorkflowState::Failed { reason: "boom".into() }));
        }
    }

    #[test]
    fn state_serializes_tagged() {
        let json = serde_json::to_string(&WorkflowState::Uploading { progress: 42 }).unwrap();
        assert!(json.contains("uploading"));
        assert!(json.contains("42"));
    }

    #[test]
    fn default_phase_durations_match_config() {
        let config = WorkflowConfig::default();
        assert_eq!(config.extracting, Duration::from_millis(2000));
        assert_eq!(config.normalizing, Duration::from_millis(2500));
        assert_eq!(config.generating, Duration::from_millis(3000));
    }
}
