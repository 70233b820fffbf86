//! UI sink trait and implementations.
//!
//! Steps report progress and errors to a sink; output is observational
//! only and never affects control flow.

use parking_lot::RwLock;
use tracing::{error, info};

/// Trait for sinks that receive user-facing step output.
pub trait UiSink: Send + Sync {
    /// Reports an informational message.
    fn say(&self, message: &str);

    /// Reports an error message.
    fn error(&self, message: &str);
}

/// A sink that routes messages through the tracing framework.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingUi;

impl UiSink for TracingUi {
    fn say(&self, message: &str) {
        info!("{}", message);
    }

    fn error(&self, message: &str) {
        error!("{}", message);
    }
}

/// A sink that discards all messages.
///
/// Used as the default when no sink is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpUi;

impl UiSink for NoOpUi {
    fn say(&self, _message: &str) {
        // Intentionally empty - discards all messages
    }

    fn error(&self, _message: &str) {
        // Intentionally empty - discards all messages
    }
}

/// A collecting sink for testing purposes.
#[derive(Debug, Default)]
pub struct CollectingUi {
    said: RwLock<Vec<String>>,
    errors: RwLock<Vec<String>>,
}

impl CollectingUi {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all informational messages received so far.
    #[must_use]
    pub fn said(&self) -> Vec<String> {
        self.said.read().clone()
    }

    /// Returns all error messages received so far.
    #[must_use]
    pub fn errors(&self) -> Vec<String> {
        self.errors.read().clone()
    }

    /// Returns true if any message contains the given fragment.
    #[must_use]
    pub fn saw(&self, fragment: &str) -> bool {
        self.said.read().iter().any(|m| m.contains(fragment))
            || self.errors.read().iter().any(|m| m.contains(fragment))
    }

    /// Clears all collected messages.
    pub fn clear(&self) {
        self.said.write().clear();
        self.errors.write().clear();
    }
}

impl UiSink for CollectingUi {
    fn say(&self, message: &str) {
        self.said.write().push(message.to_string());
    }

    fn error(&self, message: &str) {
        self.errors.write().push(message.to_string());
    }
}
