//! Testing utilities for snapshot steps.
//!
//! This module provides:
//! - A scripted mock of the provider contract
//! - Instance and image fixtures for step tests

mod fixtures;
mod mocks;

pub use fixtures::{instance_with, test_image, test_instance};
pub use mocks::MockEc2;
