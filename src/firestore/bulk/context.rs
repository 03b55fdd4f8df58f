use std::future::Future;
use std::sync::Arc;

use crate::firestore::bulk::progress::{CancellationToken, NoopProgress, ProgressSink};
use crate::firestore::bulk::settings::BulkSettings;
use crate::firestore::error::{cancelled, FirestoreResult};
use crate::firestore::remote::datastore::DocumentStoreArc;
use crate::util::retry_with_backoff;

/// Everything a bulk operation runs against: the remote store, its tuning,
/// where progress goes and the flag that stops it.
#[derive(Clone)]
pub struct BulkContext {
    store: DocumentStoreArc,
    settings: BulkSettings,
    progress: Arc<dyn ProgressSink>,
    cancellation: CancellationToken,
}

impl BulkContext {
    pub fn new(store: DocumentStoreArc) -> Self {
        Self {
            store,
            settings: BulkSettings::default(),
            progress: Arc::new(NoopProgress),
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_settings(mut self, settings: BulkSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_progress(mut self, progress: impl ProgressSink + 'static) -> Self {
        self.progress = Arc::new(progress);
        self
    }

    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn store(&self) -> &DocumentStoreArc {
        &self.store
    }

    pub fn settings(&self) -> &BulkSettings {
        &self.settings
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub(crate) fn report(&self, message: &str) {
        log::debug!("{message}");
        self.progress.report(message);
    }

    pub(crate) fn ensure_not_cancelled(&self) -> FirestoreResult<()> {
        if self.cancellation.is_cancelled() {
            Err(cancelled("Operation cancelled"))
        } else {
            Ok(())
        }
    }

    /// Runs one remote call under the configured retry policy.
    pub(crate) async fn call<T, F, Fut>(&self, operation: F) -> FirestoreResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = FirestoreResult<T>>,
    {
        retry_with_backoff(&self.settings.retry, operation).await
    }
}
