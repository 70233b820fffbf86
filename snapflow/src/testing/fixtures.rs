//! Instance and image fixtures for step tests.

use crate::ec2::{BlockDeviceMapping, ImageView, InstanceView};

/// An instance with the given block-device mappings.
#[must_use]
pub fn instance_with(mappings: Vec<BlockDeviceMapping>) -> InstanceView {
    InstanceView {
        instance_id: "i-0123456789abcdef0".to_string(),
        block_device_mappings: mappings,
    }
}

/// The canonical test instance: a root EBS device, a data EBS device, and
/// one instance-store device with no volume.
#[must_use]
pub fn test_instance() -> InstanceView {
    instance_with(vec![
        BlockDeviceMapping::ebs("/dev/sda1", "vol-aaa"),
        BlockDeviceMapping::ebs("/dev/sdb", "vol-bbb"),
        BlockDeviceMapping::ephemeral("ephemeral0"),
    ])
}

/// The canonical test source image.
#[must_use]
pub fn test_image() -> ImageView {
    ImageView {
        image_id: "ami-0123".to_string(),
    }
}
