//! Phase outcome reporting: per-item results, the per-phase state machine,
//! and human-readable tallies.

use std::path::PathBuf;

/// The phases an operator can invoke. A failed phase is re-invoked
/// explicitly; there is no retry loop across phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Capture,
    Unmount,
    Remount,
    Rollback,
    Convert,
    Rewrite,
    Verify,
}

impl Phase {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Capture => "capture",
            Phase::Unmount => "unmount",
            Phase::Remount => "remount",
            Phase::Rollback => "rollback",
            Phase::Convert => "convert",
            Phase::Rewrite => "rewrite",
            Phase::Verify => "verify",
        }
    }
}

/// Per-host, per-phase state machine:
/// `NotStarted → InProgress → {Succeeded | PartiallyFailed | Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PhaseState {
    #[default]
    NotStarted,
    InProgress,
    Succeeded,
    PartiallyFailed,
    Failed,
}

/// Outcome of one attempted operation on one mount point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemOutcome {
    pub mount_point: PathBuf,
    pub error: Option<String>,
}

impl ItemOutcome {
    #[must_use]
    pub fn ok(mount_point: PathBuf) -> Self {
        Self {
            mount_point,
            error: None,
        }
    }

    #[must_use]
    pub fn failed(mount_point: PathBuf, error: impl Into<String>) -> Self {
        Self {
            mount_point,
            error: Some(error.into()),
        }
    }
}

/// Result of one phase on one host.
#[derive(Debug, Clone)]
pub struct PhaseReport {
    pub phase: Phase,
    pub state: PhaseState,
    pub items: Vec<ItemOutcome>,
    /// Mounts skipped as already in the desired state (non-error).
    pub skipped: usize,
}

impl PhaseReport {
    #[must_use]
    pub fn begin(phase: Phase) -> Self {
        Self {
            phase,
            state: PhaseState::InProgress,
            items: Vec::new(),
            skipped: 0,
        }
    }

    pub fn record(&mut self, outcome: ItemOutcome) {
        self.items.push(outcome);
    }

    /// Close the report, deriving the terminal state from item outcomes.
    /// A phase with no failures succeeded, even trivially with zero items.
    #[must_use]
    pub fn finish(mut self) -> Self {
        let failed = self.failed();
        self.state = if failed == 0 {
            PhaseState::Succeeded
        } else if failed == self.items.len() {
            PhaseState::Failed
        } else {
            PhaseState::PartiallyFailed
        };
        self
    }

    /// Close the report as failed outright, e.g. when a fail-fast sequence
    /// aborted before attempting the remaining items.
    #[must_use]
    pub fn finish_aborted(mut self) -> Self {
        self.state = PhaseState::Failed;
        self
    }

    #[must_use]
    pub fn attempted(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.items.iter().filter(|i| i.error.is_none()).count()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.items.iter().filter(|i| i.error.is_some()).count()
    }

    /// Success only if the terminal state is `Succeeded`: all attempted
    /// items passed and no fail-fast abort occurred.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.state == PhaseState::Succeeded
    }

    /// Final numeric tally, e.g. `3/4 succeeded`.
    #[must_use]
    pub fn tally(&self) -> String {
        format!("{}/{} succeeded", self.succeeded(), self.attempted())
    }
}

/// Result of one configuration-rewrite invocation on one host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteSummary {
    /// Managed entries rewritten to the canonical scheme.
    pub changed: usize,
    /// Whether the new text was swapped into place (false when nothing
    /// needed migration or the run was canceled before the swap).
    pub applied: bool,
}
