//! Step trait and implementations.
//!
//! Steps are the units of work a build pipeline sequences; each receives
//! the shared context and signals continue or halt.

mod snapshot_volumes;
#[cfg(test)]
mod step_tests;

pub use snapshot_volumes::{SnapshotVolumesConfig, SnapshotVolumesStep};

use crate::context::StepContext;
use crate::core::StepAction;
use async_trait::async_trait;
use std::fmt::Debug;

/// Trait for pipeline steps.
#[async_trait]
pub trait Step: Send + Sync + Debug {
    /// Returns the name of the step.
    fn name(&self) -> &str;

    /// Executes the step.
    ///
    /// Returns `Continue` on success (including no-op short-circuits) and
    /// `Halt` after depositing an error into the context.
    async fn run(&self, ctx: &StepContext) -> StepAction;

    /// Releases anything the step created that requires rollback.
    ///
    /// Defaults to a no-op.
    async fn cleanup(&self, _ctx: &StepContext) {}
}
