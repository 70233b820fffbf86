//! Core vocabulary shared by steps and the step runner.

use serde::{Deserialize, Serialize};

/// The signal a step returns to the surrounding runner.
///
/// `Continue` covers every success, including the no-op short-circuits
/// (feature disabled, no matching devices, no tags configured). `Halt`
/// means the step deposited an error into the context and the runner
/// must stop the sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepAction {
    /// Proceed to the next step in the pipeline.
    Continue,
    /// Abort the pipeline; an error was deposited into the context.
    Halt,
}

impl StepAction {
    /// Returns true if the action lets the pipeline proceed.
    #[must_use]
    pub fn is_continue(self) -> bool {
        matches!(self, Self::Continue)
    }
}

/// External status of a snapshot as reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotStatus {
    /// The snapshot is still being taken.
    Pending,
    /// The snapshot reached its terminal success state.
    Completed,
    /// The snapshot reached a terminal failure state.
    Error,
}

impl SnapshotStatus {
    /// Parses a provider wire string into a status.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    /// The provider wire string for this status.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for SnapshotStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One snapshot created by the step.
///
/// Records are created at request time with `Pending` status, transition
/// to `Completed` via polling or `Error` on failure, and are never reused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    /// The volume the snapshot was taken from.
    pub volume_id: String,
    /// The provider-assigned snapshot id.
    pub snapshot_id: String,
    /// Last observed status.
    pub status: SnapshotStatus,
}

impl SnapshotRecord {
    /// Creates a record for a freshly issued snapshot request.
    #[must_use]
    pub fn pending(volume_id: impl Into<String>, snapshot_id: impl Into<String>) -> Self {
        Self {
            volume_id: volume_id.into(),
            snapshot_id: snapshot_id.into(),
            status: SnapshotStatus::Pending,
        }
    }

    /// Marks the record as completed.
    pub fn complete(&mut self) {
        self.status = SnapshotStatus::Completed;
    }

    /// Marks the record as failed.
    pub fn fail(&mut self) {
        self.status = SnapshotStatus::Error;
    }
}
