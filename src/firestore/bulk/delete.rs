use std::pin::pin;

use futures::TryStreamExt;

use crate::firestore::bulk::batch::BatchWriter;
use crate::firestore::bulk::context::BulkContext;
use crate::firestore::bulk::report::{BulkError, WriteReport};
use crate::firestore::error::{invalid_argument, FirestoreResult};
use crate::firestore::model::ResourcePath;
use crate::firestore::remote::datastore::WriteOperation;
use crate::util::paginate;

/// Deletes every document of a collection. Subcollections are left alone.
pub struct BulkDeleter {
    context: BulkContext,
}

impl BulkDeleter {
    pub fn new(context: BulkContext) -> Self {
        Self { context }
    }

    /// Clears every collection directly under `parent` (the database root or
    /// a document). Collection ids come from a single listing call.
    pub async fn clear_database(&self, parent: &ResourcePath) -> Result<WriteReport, BulkError> {
        let store = self.context.store();
        let page_size = self.context.settings().collection_ids_page_size;
        let collections = self
            .context
            .call(|| store.list_collection_ids(parent, page_size, None))
            .await
            .map_err(|err| BulkError::new(err, WriteReport::new()))?;
        if collections.has_more() {
            log::warn!(
                "{parent} has more than {page_size} collections; only the first page is cleared"
            );
        }

        let mut total = WriteReport::new();
        for collection_id in collections.items {
            let path = parent.child([collection_id]);
            match self.clear_collection(&path).await {
                Ok(report) => total.merge(report),
                Err(mut err) => {
                    total.merge(err.report);
                    err.report = total;
                    return Err(err);
                }
            }
        }
        Ok(total)
    }

    pub async fn clear_collection(&self, path: &ResourcePath) -> Result<WriteReport, BulkError> {
        let mut report = WriteReport::new();
        match self.delete_pages(path, &mut report).await {
            Ok(()) => {
                self.context
                    .report(&format!("Cleared {path}: {}", report.summary("deleted")));
                Ok(report)
            }
            Err(error) => Err(BulkError::new(error, report)),
        }
    }

    async fn delete_pages(&self, path: &ResourcePath, report: &mut WriteReport) -> FirestoreResult<()> {
        if !path.is_collection() {
            return Err(invalid_argument(format!(
                "Expected a collection path, got '{path}'"
            )));
        }
        let store = self.context.store();
        let page_size = self.context.settings().delete_page_size;
        // List API tokens stay valid while already-listed documents disappear.
        let mut pages = pin!(paginate(|token: Option<String>| async move {
            self.context
                .call(|| store.list_documents(path, page_size, token.clone(), false))
                .await
        }));

        let writer = BatchWriter::new(&self.context);
        while let Some(page) = pages.try_next().await? {
            self.context.ensure_not_cancelled()?;
            let deletes = page
                .items
                .into_iter()
                .filter(|document| !document.is_missing())
                .map(|document| WriteOperation::Delete { key: document.key })
                .collect();
            writer
                .write_all(deletes, report, |report| {
                    self.context
                        .report(&format!("Deleted {} documents", report.succeeded));
                })
                .await?;
        }
        Ok(())
    }
}
