//! # Snapflow
//!
//! A pipeline step for image builds: snapshot the EBS volumes attached to a
//! running build instance, wait for the snapshots to complete, and tag them.
//!
//! Snapflow provides:
//!
//! - **Step-based execution**: A [`step::Step`] trait returning continue/halt
//!   to a surrounding step runner
//! - **Explicit dependencies**: A typed [`context::StepContext`] instead of a
//!   dynamic state bag
//! - **Bounded polling**: A generic [`waiter::StateWaiter`] that drives
//!   asynchronous provider operations to a terminal state
//! - **Cancellation handling**: Cooperative cancellation observed between polls
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use snapflow::prelude::*;
//!
//! let step = SnapshotVolumesStep::new(
//!     SnapshotVolumesConfig {
//!         do_snapshot: true,
//!         snapshot_devices: vec!["/dev/sdb".into()],
//!         run_tags: [("env".into(), "prod".into())].into(),
//!         ..Default::default()
//!     },
//! );
//!
//! let action = step.run(&ctx).await;
//! assert_eq!(action, StepAction::Continue);
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod context;
pub mod core;
pub mod ec2;
pub mod errors;
pub mod events;
pub mod step;
pub mod tags;
pub mod testing;
pub mod waiter;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::context::StepContext;
    pub use crate::core::{SnapshotRecord, SnapshotStatus, StepAction};
    pub use crate::ec2::{
        BlockDeviceMapping, Ec2Api, Ec2Error, ImageView, InstanceView, SnapshotView, Tag,
    };
    pub use crate::errors::StepError;
    pub use crate::events::{CollectingUi, NoOpUi, TracingUi, UiSink};
    pub use crate::step::{SnapshotVolumesConfig, SnapshotVolumesStep, Step};
    pub use crate::tags::{resolve_tags, TagResolveError};
    pub use crate::waiter::{BackoffStrategy, JitterStrategy, StateWaiter, WaitError};
}
