//! Step execution context.
//!
//! Instead of a dynamic state bag with runtime-typed lookups, every
//! dependency a step needs is an explicit field: the provider connection,
//! the instance and source-image descriptors, the UI sink, and the
//! cancellation token. The only slot a step writes is the error deposited
//! for the runner to observe on halt.

use crate::cancellation::CancellationToken;
use crate::ec2::{Ec2Api, ImageView, InstanceView};
use crate::errors::StepError;
use crate::events::{NoOpUi, UiSink};
use parking_lot::RwLock;
use std::sync::Arc;

/// Dependencies and shared state for one step invocation.
pub struct StepContext {
    ec2: Arc<dyn Ec2Api>,
    instance: InstanceView,
    source_image: ImageView,
    ui: Arc<dyn UiSink>,
    cancel: Arc<CancellationToken>,
    /// Written at most once per run; the first error wins.
    error: RwLock<Option<StepError>>,
}

impl StepContext {
    /// Creates a context with a no-op UI sink and a fresh cancellation token.
    #[must_use]
    pub fn new(ec2: Arc<dyn Ec2Api>, instance: InstanceView, source_image: ImageView) -> Self {
        Self {
            ec2,
            instance,
            source_image,
            ui: Arc::new(NoOpUi),
            cancel: Arc::new(CancellationToken::new()),
            error: RwLock::new(None),
        }
    }

    /// Sets the UI sink.
    #[must_use]
    pub fn with_ui(mut self, ui: Arc<dyn UiSink>) -> Self {
        self.ui = ui;
        self
    }

    /// Sets the cancellation token.
    #[must_use]
    pub fn with_cancel(mut self, cancel: Arc<CancellationToken>) -> Self {
        self.cancel = cancel;
        self
    }

    /// The provider connection handle, read-only for steps.
    #[must_use]
    pub fn ec2(&self) -> &dyn Ec2Api {
        self.ec2.as_ref()
    }

    /// The build instance descriptor.
    #[must_use]
    pub fn instance(&self) -> &InstanceView {
        &self.instance
    }

    /// The source image descriptor.
    #[must_use]
    pub fn source_image(&self) -> &ImageView {
        &self.source_image
    }

    /// The UI sink.
    #[must_use]
    pub fn ui(&self) -> &dyn UiSink {
        self.ui.as_ref()
    }

    /// The cancellation token observed by polling loops.
    #[must_use]
    pub fn cancel(&self) -> &CancellationToken {
        self.cancel.as_ref()
    }

    /// Deposits a fatal error for the runner to observe.
    ///
    /// The first deposited error wins; later deposits are ignored.
    pub fn put_error(&self, error: StepError) {
        let mut slot = self.error.write();
        if slot.is_none() {
            *slot = Some(error);
        }
    }

    /// Returns true if an error has been deposited.
    #[must_use]
    pub fn has_error(&self) -> bool {
        self.error.read().is_some()
    }

    /// The deposited error's message, if any.
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        self.error.read().as_ref().map(ToString::to_string)
    }

    /// Removes and returns the deposited error.
    pub fn take_error(&self) -> Option<StepError> {
        self.error.write().take()
    }
}

impl std::fmt::Debug for StepContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepContext")
            .field("instance", &self.instance.instance_id)
            .field("source_image", &self.source_image.image_id)
            .field("has_error", &self.has_error())
            .finish()
    }
}
