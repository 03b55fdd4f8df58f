use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Receives human-readable status lines while a bulk operation runs.
///
/// Reporting is fire-and-forget; sinks must not block.
pub trait ProgressSink: Send + Sync {
    fn report(&self, message: &str);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn report(&self, _message: &str) {}
}

impl<F> ProgressSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn report(&self, message: &str) {
        self(message)
    }
}

/// Cooperative cancellation flag shared between a bulk operation and the
/// layer driving it. Checked between pages and between groups of batches.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
