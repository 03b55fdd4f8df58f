use std::convert::Infallible;

use crate::firestore::bulk::context::BulkContext;
use crate::firestore::bulk::report::WriteReport;
use crate::firestore::error::{FirestoreError, FirestoreResult};
use crate::firestore::remote::datastore::WriteOperation;
use crate::util::bounded_concurrent_map;

struct BatchOutcome {
    report: WriteReport,
    fatal: Option<FirestoreError>,
}

/// Sends writes as `batchWrite` calls, falling back to one call per document
/// for whatever a batch could not apply.
pub(crate) struct BatchWriter<'a> {
    context: &'a BulkContext,
}

impl<'a> BatchWriter<'a> {
    pub(crate) fn new(context: &'a BulkContext) -> Self {
        Self { context }
    }

    /// Writes everything in `writes`, adding results to `report`.
    ///
    /// Writes are cut into batches of `batch_size`; up to `write_concurrency`
    /// batches run at once. `after_group` sees the running report once each
    /// group has settled. Cancellation is honored between groups. A fatal
    /// error stops the run after its group, with the group's counts merged.
    pub(crate) async fn write_all<G>(
        &self,
        writes: Vec<WriteOperation>,
        report: &mut WriteReport,
        mut after_group: G,
    ) -> FirestoreResult<()>
    where
        G: FnMut(&WriteReport),
    {
        let settings = self.context.settings();
        let batch_size = settings.batch_size.max(1);
        let limit = settings.write_concurrency.max(1);

        let mut pending = writes.into_iter().peekable();
        let mut batches = Vec::new();
        while pending.peek().is_some() {
            batches.push(pending.by_ref().take(batch_size).collect::<Vec<_>>());
        }

        let mut batches = batches.into_iter().peekable();
        while batches.peek().is_some() {
            self.context.ensure_not_cancelled()?;
            let group: Vec<Vec<WriteOperation>> = batches.by_ref().take(limit).collect();
            let outcomes = bounded_concurrent_map(group, limit, |batch| async move {
                Ok::<_, Infallible>(self.write_batch(batch).await)
            })
            .await
            .unwrap_or_else(|never| match never {});

            let mut fatal = None;
            for outcome in outcomes {
                report.merge(outcome.report);
                if fatal.is_none() {
                    fatal = outcome.fatal;
                }
            }
            after_group(report);
            if let Some(error) = fatal {
                return Err(error);
            }
        }
        Ok(())
    }

    async fn write_batch(&self, batch: Vec<WriteOperation>) -> BatchOutcome {
        let mut outcome = BatchOutcome {
            report: WriteReport::new(),
            fatal: None,
        };
        let store = self.context.store();
        let result = self
            .context
            .call(|| store.batch_write(batch.clone()))
            .await;

        let individually = match result {
            Ok(statuses) if statuses.len() != batch.len() => {
                log::warn!(
                    "batch of {} writes returned {} statuses, writing documents one by one",
                    batch.len(),
                    statuses.len()
                );
                batch
            }
            Ok(statuses) => {
                let mut rejected = Vec::new();
                for (write, status) in batch.into_iter().zip(statuses) {
                    match status.to_error() {
                        None => outcome.report.record_success(),
                        Some(err) => {
                            log::warn!("batch rejected {}: {err}, retrying it alone", write.key().path());
                            rejected.push(write);
                        }
                    }
                }
                rejected
            }
            Err(err) => {
                log::warn!(
                    "batch of {} writes failed, writing documents one by one: {err}",
                    batch.len()
                );
                batch
            }
        };

        for write in individually {
            let path = write.key().path().canonical_string();
            match self.context.call(|| self.write_single(&write)).await {
                Ok(()) => outcome.report.record_success(),
                Err(err) => {
                    log::error!("failed to write {path}: {err}");
                    let fatal = err.is_fatal();
                    outcome.report.record_failure(path, err.clone());
                    if fatal {
                        outcome.fatal = Some(err);
                        break;
                    }
                }
            }
        }
        outcome
    }

    async fn write_single(&self, write: &WriteOperation) -> FirestoreResult<()> {
        let store = self.context.store();
        match write {
            WriteOperation::Update { key, fields } => store
                .update_document(key, fields.clone())
                .await
                .map(|_| ()),
            WriteOperation::Delete { key } => store.delete_document(key).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firestore::error::{internal_error, permission_denied, FirestoreErrorCode};
    use crate::firestore::model::{DatabaseId, Document, DocumentKey, ResourcePath};
    use crate::firestore::remote::datastore::{
        DocumentStore, InMemoryDocumentStore, StoreOperation, WriteStatus,
    };
    use crate::firestore::bulk::settings::BulkSettings;
    use crate::firestore::value::MapValue;
    use crate::util::{Page, RetryPolicy};
    use std::sync::Arc;

    fn updates(count: usize) -> Vec<WriteOperation> {
        (0..count)
            .map(|index| WriteOperation::Update {
                key: DocumentKey::from_string(&format!("items/i{index:04}")).unwrap(),
                fields: MapValue::default(),
            })
            .collect()
    }

    fn context(store: &InMemoryDocumentStore) -> BulkContext {
        BulkContext::new(Arc::new(store.clone()))
            .with_settings(BulkSettings::default().with_retry(RetryPolicy::none()))
    }

    #[tokio::test]
    async fn splits_into_batches_and_reports_per_group() {
        let store = InMemoryDocumentStore::new(DatabaseId::default("p"));
        let context = context(&store).with_settings(
            BulkSettings::default()
                .with_batch_size(10)
                .with_write_concurrency(2)
                .with_retry(RetryPolicy::none()),
        );
        let mut report = WriteReport::new();
        let mut seen = Vec::new();
        BatchWriter::new(&context)
            .write_all(updates(45), &mut report, |report| seen.push(report.succeeded))
            .await
            .unwrap();
        assert_eq!(report.succeeded, 45);
        assert_eq!(store.calls(StoreOperation::BatchWrite), 5);
        assert_eq!(seen, vec![20, 40, 45]);
    }

    #[tokio::test]
    async fn failed_batch_falls_back_to_single_writes() {
        let store = InMemoryDocumentStore::new(DatabaseId::default("p"));
        store.fail_always(StoreOperation::BatchWrite, internal_error("commit rejected"));
        store
            .fail_document("items/i0003", internal_error("too large"))
            .unwrap();
        let context = context(&store);
        let mut report = WriteReport::new();
        BatchWriter::new(&context)
            .write_all(updates(5), &mut report, |_| {})
            .await
            .unwrap();
        assert_eq!(report.succeeded, 4);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].path, "items/i0003");
        assert_eq!(store.calls(StoreOperation::UpdateDocument), 5);
    }

    #[tokio::test]
    async fn fatal_single_write_stops_with_partial_counts() {
        let store = InMemoryDocumentStore::new(DatabaseId::default("p"));
        store.fail_always(StoreOperation::BatchWrite, internal_error("commit rejected"));
        store
            .fail_document("items/i0002", permission_denied("read only"))
            .unwrap();
        let context = context(&store);
        let mut report = WriteReport::new();
        let err = BatchWriter::new(&context)
            .write_all(updates(5), &mut report, |_| {})
            .await
            .unwrap_err();
        assert_eq!(err.code, FirestoreErrorCode::PermissionDenied);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failures.len(), 1);
    }

    /// Answers every batch with one status too few.
    struct ShortStatusStore {
        inner: InMemoryDocumentStore,
    }

    #[async_trait::async_trait]
    impl DocumentStore for ShortStatusStore {
        fn database_id(&self) -> &DatabaseId {
            self.inner.database_id()
        }

        async fn list_collection_ids(
            &self,
            parent: &ResourcePath,
            page_size: u32,
            page_token: Option<String>,
        ) -> FirestoreResult<Page<String>> {
            self.inner.list_collection_ids(parent, page_size, page_token).await
        }

        async fn list_documents(
            &self,
            collection: &ResourcePath,
            page_size: u32,
            page_token: Option<String>,
            include_fields: bool,
        ) -> FirestoreResult<Page<Document>> {
            self.inner
                .list_documents(collection, page_size, page_token, include_fields)
                .await
        }

        async fn get_document(&self, key: &DocumentKey) -> FirestoreResult<Option<Document>> {
            self.inner.get_document(key).await
        }

        async fn create_document(
            &self,
            collection: &ResourcePath,
            document_id: Option<&str>,
            fields: MapValue,
        ) -> FirestoreResult<Document> {
            self.inner.create_document(collection, document_id, fields).await
        }

        async fn update_document(&self, key: &DocumentKey, fields: MapValue) -> FirestoreResult<Document> {
            self.inner.update_document(key, fields).await
        }

        async fn delete_document(&self, key: &DocumentKey) -> FirestoreResult<()> {
            self.inner.delete_document(key).await
        }

        async fn batch_write(&self, writes: Vec<WriteOperation>) -> FirestoreResult<Vec<WriteStatus>> {
            let mut statuses = self.inner.batch_write(writes).await?;
            statuses.pop();
            Ok(statuses)
        }
    }

    #[tokio::test]
    async fn short_status_list_falls_back_to_single_writes() {
        let inner = InMemoryDocumentStore::new(DatabaseId::default("p"));
        let context = BulkContext::new(Arc::new(ShortStatusStore { inner: inner.clone() }))
            .with_settings(BulkSettings::default().with_retry(RetryPolicy::none()));
        let mut report = WriteReport::new();
        BatchWriter::new(&context)
            .write_all(updates(3), &mut report, |_| {})
            .await
            .unwrap();
        assert_eq!(report.succeeded, 3);
        assert!(report.is_complete());
        assert_eq!(inner.calls(StoreOperation::UpdateDocument), 3);
        assert_eq!(inner.len(), 3);
    }
}
