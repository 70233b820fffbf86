//! Error taxonomy for step execution.
//!
//! Every fatal condition carries the affected volume or snapshot identifier
//! so failures are user-diagnosable. Errors are reported to the UI sink,
//! deposited into the step context, and surfaced to the runner as a halt;
//! there is no local recovery beyond what the waiter performs internally.

use crate::ec2::Ec2Error;
use crate::tags::TagResolveError;
use crate::waiter::WaitError;
use thiserror::Error;

/// A fatal step failure.
#[derive(Debug, Error)]
pub enum StepError {
    /// The create-snapshot request itself failed.
    #[error("error creating snapshot of EBS volume {volume_id}: {source}")]
    SnapshotCreate {
        /// The volume whose snapshot could not be issued.
        volume_id: String,
        /// The underlying provider failure.
        #[source]
        source: Ec2Error,
    },

    /// Waiting for a snapshot to complete failed, timed out, or was cancelled.
    #[error("error waiting for snapshot {snapshot_id} of volume {volume_id}: {source}")]
    SnapshotWait {
        /// The volume being snapshotted.
        volume_id: String,
        /// The snapshot that did not complete.
        snapshot_id: String,
        /// The underlying wait failure.
        #[source]
        source: WaitError,
    },

    /// Tag template resolution failed.
    #[error("error resolving snapshot tags: {0}")]
    TagResolve(#[from] TagResolveError),

    /// The batched tagging call failed.
    #[error("error tagging snapshots: {source}")]
    TagApply {
        /// The underlying provider failure.
        #[source]
        source: Ec2Error,
    },
}

impl StepError {
    /// Returns true if the failure was a cancellation rather than a
    /// provider-side fault.
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        matches!(
            self,
            Self::SnapshotWait {
                source: WaitError::Cancelled { .. },
                ..
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_create_error_names_volume() {
        let err = StepError::SnapshotCreate {
            volume_id: "vol-aaa".to_string(),
            source: Ec2Error::api("RequestLimitExceeded"),
        };

        let message = err.to_string();
        assert!(message.contains("vol-aaa"));
        assert!(!err.is_cancellation());
    }

    #[test]
    fn test_wait_error_names_snapshot() {
        let err = StepError::SnapshotWait {
            volume_id: "vol-aaa".to_string(),
            snapshot_id: "snap-001".to_string(),
            source: WaitError::TimedOut {
                waited: Duration::from_secs(600),
            },
        };

        let message = err.to_string();
        assert!(message.contains("snap-001"));
        assert!(message.contains("vol-aaa"));
    }

    #[test]
    fn test_cancellation_is_distinguished() {
        let err = StepError::SnapshotWait {
            volume_id: "vol-aaa".to_string(),
            snapshot_id: "snap-001".to_string(),
            source: WaitError::Cancelled {
                reason: "user interrupt".to_string(),
            },
        };

        assert!(err.is_cancellation());
    }
}
