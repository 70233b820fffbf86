//! A scripted mock of the provider contract.

use crate::ec2::{Ec2Api, Ec2Error, SnapshotView, Tag};
use async_trait::async_trait;
use parking_lot::Mutex;

#[derive(Debug, Clone)]
struct SnapshotSlot {
    snapshot_id: String,
    volume_id: String,
    pending_polls_left: usize,
}

/// A mock provider that records calls and follows a scripted failure plan.
///
/// By default every created snapshot reports `completed` on its first
/// describe. Failures are scripted per volume id so tests read in terms of
/// the step's own inputs.
#[derive(Debug)]
pub struct MockEc2 {
    region: String,
    pending_polls: usize,
    fail_create_for: Mutex<Option<String>>,
    fail_describe_for: Mutex<Option<String>>,
    vanish_describe_for: Mutex<Option<String>>,
    error_state_for: Mutex<Option<String>>,
    fail_create_tags: Mutex<bool>,
    seq: Mutex<usize>,
    snapshots: Mutex<Vec<SnapshotSlot>>,
    create_calls: Mutex<Vec<String>>,
    describe_calls: Mutex<usize>,
    tag_calls: Mutex<Vec<(Vec<String>, Vec<Tag>)>>,
}

impl Default for MockEc2 {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEc2 {
    /// Creates a mock bound to `us-east-1` where snapshots complete on the
    /// first describe.
    #[must_use]
    pub fn new() -> Self {
        Self {
            region: "us-east-1".to_string(),
            pending_polls: 0,
            fail_create_for: Mutex::new(None),
            fail_describe_for: Mutex::new(None),
            vanish_describe_for: Mutex::new(None),
            error_state_for: Mutex::new(None),
            fail_create_tags: Mutex::new(false),
            seq: Mutex::new(0),
            snapshots: Mutex::new(Vec::new()),
            create_calls: Mutex::new(Vec::new()),
            describe_calls: Mutex::new(0),
            tag_calls: Mutex::new(Vec::new()),
        }
    }

    /// Sets the region reported by the mock.
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Each snapshot reports `pending` for this many describes before
    /// completing.
    #[must_use]
    pub fn with_pending_polls(mut self, polls: usize) -> Self {
        self.pending_polls = polls;
        self
    }

    /// Scripts the create-snapshot call for the given volume to fail.
    pub fn fail_create_for(&self, volume_id: impl Into<String>) {
        *self.fail_create_for.lock() = Some(volume_id.into());
    }

    /// Scripts describes of the given volume's snapshot to fail.
    pub fn fail_describe_for(&self, volume_id: impl Into<String>) {
        *self.fail_describe_for.lock() = Some(volume_id.into());
    }

    /// Scripts describes of the given volume's snapshot to return no record.
    pub fn vanish_describe_for(&self, volume_id: impl Into<String>) {
        *self.vanish_describe_for.lock() = Some(volume_id.into());
    }

    /// Scripts the given volume's snapshot to land in the `error` state.
    pub fn error_state_for(&self, volume_id: impl Into<String>) {
        *self.error_state_for.lock() = Some(volume_id.into());
    }

    /// Scripts the batched tagging call to fail.
    pub fn fail_create_tags(&self) {
        *self.fail_create_tags.lock() = true;
    }

    /// Volume ids passed to create-snapshot, in call order.
    #[must_use]
    pub fn create_calls(&self) -> Vec<String> {
        self.create_calls.lock().clone()
    }

    /// Snapshot ids assigned so far, in creation order.
    #[must_use]
    pub fn created_snapshot_ids(&self) -> Vec<String> {
        self.snapshots
            .lock()
            .iter()
            .map(|s| s.snapshot_id.clone())
            .collect()
    }

    /// Number of describe calls received.
    #[must_use]
    pub fn describe_count(&self) -> usize {
        *self.describe_calls.lock()
    }

    /// Batched tagging calls received: (resource ids, tags).
    #[must_use]
    pub fn tag_calls(&self) -> Vec<(Vec<String>, Vec<Tag>)> {
        self.tag_calls.lock().clone()
    }

    fn matches(slot: &Option<String>, volume_id: &str) -> bool {
        slot.as_deref() == Some(volume_id)
    }
}

#[async_trait]
impl Ec2Api for MockEc2 {
    fn region(&self) -> &str {
        &self.region
    }

    async fn create_snapshot(&self, volume_id: &str) -> Result<String, Ec2Error> {
        self.create_calls.lock().push(volume_id.to_string());

        if Self::matches(&self.fail_create_for.lock(), volume_id) {
            return Err(Ec2Error::api(format!(
                "CreateSnapshot failed for {volume_id}"
            )));
        }

        let mut seq = self.seq.lock();
        *seq += 1;
        let snapshot_id = format!("snap-{:04}", *seq);

        self.snapshots.lock().push(SnapshotSlot {
            snapshot_id: snapshot_id.clone(),
            volume_id: volume_id.to_string(),
            pending_polls_left: self.pending_polls,
        });

        Ok(snapshot_id)
    }

    async fn describe_snapshots(
        &self,
        snapshot_ids: &[String],
    ) -> Result<Vec<SnapshotView>, Ec2Error> {
        *self.describe_calls.lock() += 1;

        let mut snapshots = self.snapshots.lock();
        let mut views = Vec::new();

        for slot in snapshots.iter_mut() {
            if !snapshot_ids.contains(&slot.snapshot_id) {
                continue;
            }

            if Self::matches(&self.fail_describe_for.lock(), &slot.volume_id) {
                return Err(Ec2Error::api(format!(
                    "DescribeSnapshots failed for {}",
                    slot.snapshot_id
                )));
            }

            if Self::matches(&self.vanish_describe_for.lock(), &slot.volume_id) {
                continue;
            }

            let state = if slot.pending_polls_left > 0 {
                slot.pending_polls_left -= 1;
                "pending"
            } else if Self::matches(&self.error_state_for.lock(), &slot.volume_id) {
                "error"
            } else {
                "completed"
            };

            views.push(SnapshotView {
                snapshot_id: slot.snapshot_id.clone(),
                volume_id: slot.volume_id.clone(),
                state: state.to_string(),
            });
        }

        Ok(views)
    }

    async fn create_tags(&self, resource_ids: &[String], tags: &[Tag]) -> Result<(), Ec2Error> {
        self.tag_calls
            .lock()
            .push((resource_ids.to_vec(), tags.to_vec()));

        if *self.fail_create_tags.lock() {
            return Err(Ec2Error::api("CreateTags failed"));
        }

        Ok(())
    }
}
