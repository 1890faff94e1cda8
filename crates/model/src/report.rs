use std::fmt::Display;

/// Sink for unexpected failures. Business conditions are modeled as values
/// and never pass through here; anything else must be recorded before the
/// caller falls back to a generic error state.
pub trait FailureReporter: Send + Sync {
    fn record(&self, context: &str, error: &dyn Display);
}

/// Default reporter backed by the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl FailureReporter for LogReporter {
    fn record(&self, context: &str, error: &dyn Display) {
        log::error!("{context}: {error}");
    }
}
