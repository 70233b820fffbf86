//! The snapshot-volumes step: select devices, snapshot them, tag the result.

use super::Step;
use crate::context::StepContext;
use crate::core::{SnapshotRecord, SnapshotStatus, StepAction};
use crate::ec2::Ec2Error;
use crate::errors::StepError;
use crate::tags::resolve_tags;
use crate::waiter::StateWaiter;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Caller-supplied configuration, immutable for the duration of one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotVolumesConfig {
    /// Feature flag; when false the step is a no-op.
    pub do_snapshot: bool,
    /// Device names eligible for snapshotting, in priority order.
    pub snapshot_devices: Vec<String>,
    /// Tags applied to every created snapshot. Values may contain
    /// `{{ placeholder }}` references.
    pub run_tags: HashMap<String, String>,
    /// Extra placeholder bindings for tag resolution.
    pub template_values: HashMap<String, String>,
}

/// Snapshots the EBS volumes behind an allow-list of device names, waits
/// for each snapshot to complete, and tags the full set in one call.
///
/// Volumes are processed strictly sequentially: each snapshot's
/// create-and-wait finishes before the next volume's is issued, so a
/// failure is always attributable to one volume. Any failure voids the
/// whole step; a partial snapshot set is never tagged. Already-created
/// snapshots are intentionally left in place on failure.
#[derive(Debug)]
pub struct SnapshotVolumesStep {
    config: SnapshotVolumesConfig,
    waiter: StateWaiter,
}

impl SnapshotVolumesStep {
    /// Creates the step with the default snapshot waiter (honoring the
    /// environment overrides described in [`crate::waiter`]).
    #[must_use]
    pub fn new(config: SnapshotVolumesConfig) -> Self {
        Self {
            config,
            waiter: StateWaiter::from_env(
                vec![SnapshotStatus::Pending.as_str().to_string()],
                SnapshotStatus::Completed.as_str(),
            ),
        }
    }

    /// Replaces the polling policy.
    #[must_use]
    pub fn with_waiter(mut self, waiter: StateWaiter) -> Self {
        self.waiter = waiter;
        self
    }

    /// Walks the instance's block-device mappings in order and selects the
    /// volume ids of EBS-backed devices whose name is allow-listed.
    ///
    /// Devices without a volume (instance store) are skipped silently.
    fn select_volumes(&self, ctx: &StepContext) -> Vec<String> {
        let mut volume_ids = Vec::new();

        for mapping in &ctx.instance().block_device_mappings {
            ctx.ui()
                .say(&format!("Inspecting device {}", mapping.device_name));

            let Some(volume_id) = &mapping.volume_id else {
                continue;
            };

            if self
                .config
                .snapshot_devices
                .iter()
                .any(|d| d == &mapping.device_name)
            {
                ctx.ui().say(&format!(
                    "Preparing for snapshot of device {} (volume {volume_id})",
                    mapping.device_name
                ));
                volume_ids.push(volume_id.clone());
            }
        }

        volume_ids
    }

    /// Creates and waits on one snapshot per volume, in list order.
    ///
    /// The first issue or wait failure aborts the remaining volumes. On
    /// success the returned records correspond one-to-one with the input.
    async fn snapshot_volumes(
        &self,
        ctx: &StepContext,
        volume_ids: &[String],
    ) -> Result<Vec<SnapshotRecord>, StepError> {
        let mut records = Vec::with_capacity(volume_ids.len());
        let ec2 = ctx.ec2();

        for volume_id in volume_ids {
            let snapshot_id =
                ec2.create_snapshot(volume_id)
                    .await
                    .map_err(|source| StepError::SnapshotCreate {
                        volume_id: volume_id.clone(),
                        source,
                    })?;

            ctx.ui().say(&format!(
                "Creating snapshot of volume {volume_id} with ID {snapshot_id}"
            ));
            let mut record = SnapshotRecord::pending(volume_id, &snapshot_id);

            ctx.ui().say("Waiting for EBS volume snapshot to complete...");
            let ids = vec![snapshot_id.clone()];
            let waited = self
                .waiter
                .wait_for_state(ctx.cancel(), || {
                    let ids = ids.clone();
                    async move {
                        let views = ec2.describe_snapshots(&ids).await?;
                        match views.into_iter().next() {
                            Some(view) => {
                                let state = view.state.clone();
                                Ok((view, state))
                            }
                            None => Err(Ec2Error::not_found(ids[0].clone())),
                        }
                    }
                })
                .await;

            if let Err(source) = waited {
                return Err(StepError::SnapshotWait {
                    volume_id: volume_id.clone(),
                    snapshot_id,
                    source,
                });
            }

            record.complete();
            ctx.ui()
                .say(&format!("Snapshot {snapshot_id} of volume {volume_id} completed"));
            records.push(record);
        }

        Ok(records)
    }

    /// Resolves the configured tag set and applies it to every snapshot in
    /// one batched call.
    async fn tag_snapshots(
        &self,
        ctx: &StepContext,
        records: &[SnapshotRecord],
    ) -> Result<(), StepError> {
        ctx.ui().say("Adding tags to EBS volume snapshots");

        let tags = resolve_tags(
            &self.config.run_tags,
            ctx.ec2().region(),
            &ctx.source_image().image_id,
            &self.config.template_values,
        )?;

        let snapshot_ids: Vec<String> = records
            .iter()
            .map(|r| r.snapshot_id.clone())
            .collect();

        ctx.ec2()
            .create_tags(&snapshot_ids, &tags)
            .await
            .map_err(|source| StepError::TagApply { source })
    }
}

fn halt(ctx: &StepContext, error: StepError) -> StepAction {
    ctx.ui().error(&error.to_string());
    ctx.put_error(error);
    StepAction::Halt
}

#[async_trait]
impl Step for SnapshotVolumesStep {
    fn name(&self) -> &str {
        "snapshot_ebs_volumes"
    }

    async fn run(&self, ctx: &StepContext) -> StepAction {
        if !self.config.do_snapshot || self.config.snapshot_devices.is_empty() {
            return StepAction::Continue;
        }

        let volume_ids = self.select_volumes(ctx);
        if volume_ids.is_empty() {
            return StepAction::Continue;
        }
        debug!(volumes = volume_ids.len(), "selected volumes for snapshot");

        let records = match self.snapshot_volumes(ctx, &volume_ids).await {
            Ok(records) => records,
            Err(error) => return halt(ctx, error),
        };

        if self.config.run_tags.is_empty() {
            return StepAction::Continue;
        }

        match self.tag_snapshots(ctx, &records).await {
            Ok(()) => StepAction::Continue,
            Err(error) => halt(ctx, error),
        }
    }

    async fn cleanup(&self, _ctx: &StepContext) {
        // Snapshots are intentionally persisted, even on partial failure;
        // there is nothing to roll back.
    }
}
