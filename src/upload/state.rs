//! Upload phases and the observable per-attempt state.

use std::fmt;

use crate::error::{ScanError, ScanResult};

/// Phase of the single upload slot.
///
/// ```text
/// Idle ─► Resizing ─► AwaitingSession ─► Sending ─► Succeeded ─► Idle
///  │          │              │              │
///  └──────────┴──────────────┴──────────────┴─────► Failed ────► Idle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadPhase {
    #[default]
    Idle,
    Resizing,
    /// Fail-fast session check, never a wait.
    AwaitingSession,
    Sending,
    Succeeded,
    Failed,
}

impl UploadPhase {
    pub fn can_transition_to(self, next: UploadPhase) -> bool {
        use UploadPhase::*;
        matches!(
            (self, next),
            (Idle, Resizing)
                | (Idle, Failed)
                | (Resizing, AwaitingSession)
                | (Resizing, Failed)
                | (AwaitingSession, Sending)
                | (AwaitingSession, Failed)
                | (Sending, Succeeded)
                | (Sending, Failed)
                | (Succeeded, Idle)
                | (Failed, Idle)
        )
    }

    /// Validated step to `next`.
    pub fn transition(self, next: UploadPhase) -> ScanResult<UploadPhase> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(ScanError::state(
                self.to_string(),
                format!("enter {next}"),
                "transition not allowed",
            ))
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl fmt::Display for UploadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "Idle",
            Self::Resizing => "Resizing",
            Self::AwaitingSession => "AwaitingSession",
            Self::Sending => "Sending",
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
        };
        f.write_str(name)
    }
}

/// What observers of the pipeline see.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadSnapshot {
    pub phase: UploadPhase,
    /// 0..=100, non-decreasing within an attempt until reset.
    pub progress: u8,
    pub uploading: bool,
    /// Last success summary or failure message.
    pub result: Option<String>,
    /// Increments once per accepted attempt.
    pub attempt: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use UploadPhase::*;

    #[test]
    fn happy_path_is_allowed() {
        let mut phase = Idle;
        for next in [Resizing, AwaitingSession, Sending, Succeeded, Idle] {
            phase = phase.transition(next).unwrap();
        }
        assert_eq!(phase, Idle);
    }

    #[test]
    fn every_in_flight_phase_can_fail() {
        for phase in [Idle, Resizing, AwaitingSession, Sending] {
            assert!(phase.can_transition_to(Failed), "{phase}");
        }
    }

    #[test]
    fn skipping_and_restarting_are_rejected() {
        assert!(!Idle.can_transition_to(Sending));
        assert!(!Resizing.can_transition_to(Resizing));
        assert!(!Sending.can_transition_to(Resizing));
        assert!(!Succeeded.can_transition_to(Failed));

        let err = Sending.transition(Resizing).unwrap_err();
        assert_eq!(err.category(), "state");
        assert!(err.to_string().contains("'Sending'"));
    }

    #[test]
    fn terminal_phases() {
        assert!(Succeeded.is_terminal());
        assert!(Failed.is_terminal());
        assert!(!Sending.is_terminal());
    }
}
