//! Provider contract: the slice of the EC2 API surface the step consumes.
//!
//! The real SDK client is an external collaborator; the step only depends on
//! the [`Ec2Api`] trait so tests can drive it with scripted doubles.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned by provider calls.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Ec2Error {
    /// The request itself failed (network, auth, quota, throttling).
    #[error("EC2 API request failed: {message}")]
    Api {
        /// Provider-reported failure message.
        message: String,
    },

    /// A describe call returned no matching record.
    #[error("no record found for {resource}")]
    NotFound {
        /// The resource id that was queried.
        resource: String,
    },
}

impl Ec2Error {
    /// Creates an API request failure.
    #[must_use]
    pub fn api(message: impl Into<String>) -> Self {
        Self::Api {
            message: message.into(),
        }
    }

    /// Creates a missing-record failure.
    #[must_use]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }
}

/// One slot in an instance's block-device mapping table.
///
/// `volume_id` is present only for EBS-backed devices; ephemeral (instance
/// store) devices have a name but no volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockDeviceMapping {
    /// Device name as exposed on the instance, e.g. `/dev/sdb`.
    pub device_name: String,
    /// Attached EBS volume id, if any.
    pub volume_id: Option<String>,
}

impl BlockDeviceMapping {
    /// An EBS-backed device.
    #[must_use]
    pub fn ebs(device_name: impl Into<String>, volume_id: impl Into<String>) -> Self {
        Self {
            device_name: device_name.into(),
            volume_id: Some(volume_id.into()),
        }
    }

    /// An instance-store device with no EBS volume.
    #[must_use]
    pub fn ephemeral(device_name: impl Into<String>) -> Self {
        Self {
            device_name: device_name.into(),
            volume_id: None,
        }
    }
}

/// Read-only view of the build instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceView {
    /// The instance id.
    pub instance_id: String,
    /// Current block-device mappings, in provider order.
    pub block_device_mappings: Vec<BlockDeviceMapping>,
}

/// Read-only view of the source image the build started from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageView {
    /// The source AMI id.
    pub image_id: String,
}

/// One snapshot as returned by a describe call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotView {
    /// The snapshot id.
    pub snapshot_id: String,
    /// The volume the snapshot was taken from.
    pub volume_id: String,
    /// Provider-reported state string, e.g. `"pending"`.
    pub state: String,
}

/// A key/value tag applied to provider resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Tag key.
    pub key: String,
    /// Tag value.
    pub value: String,
}

impl Tag {
    /// Creates a tag.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// The provider operations the step consumes.
///
/// The connection handle is read-only from the step's perspective; no
/// client configuration is mutated through this trait.
#[async_trait]
pub trait Ec2Api: Send + Sync {
    /// The region the connection is bound to.
    fn region(&self) -> &str;

    /// Issues a create-snapshot request and returns the assigned snapshot id.
    async fn create_snapshot(&self, volume_id: &str) -> Result<String, Ec2Error>;

    /// Queries current state for the given snapshot ids.
    async fn describe_snapshots(
        &self,
        snapshot_ids: &[String],
    ) -> Result<Vec<SnapshotView>, Ec2Error>;

    /// Applies a tag set to the given resources in one batched call.
    async fn create_tags(&self, resource_ids: &[String], tags: &[Tag]) -> Result<(), Ec2Error>;
}
