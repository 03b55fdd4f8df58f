use std::pin::pin;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::future::BoxFuture;
use futures::{FutureExt, TryStreamExt};

use crate::firestore::bulk::context::BulkContext;
use crate::firestore::bulk::report::{BulkError, ExportError, WriteReport};
use crate::firestore::bulk::tree::{CollectionTree, DocumentNode, ExportFile};
use crate::firestore::codec::decode_fields;
use crate::firestore::error::{invalid_argument, FirestoreError, FirestoreResult};
use crate::firestore::model::{Document, ResourcePath};
use crate::util::{bounded_concurrent_map, collect_all, paginate};

/// Reads collections, with every nested subcollection, into plain trees.
pub struct CollectionExporter {
    context: BulkContext,
    exported: AtomicUsize,
}

impl CollectionExporter {
    pub fn new(context: BulkContext) -> Self {
        Self {
            context,
            exported: AtomicUsize::new(0),
        }
    }

    /// Documents exported so far by this exporter.
    pub fn exported(&self) -> usize {
        self.exported.load(Ordering::SeqCst)
    }

    /// Exports the collection at `path` and everything below it.
    pub async fn export_collection(&self, path: &ResourcePath) -> Result<CollectionTree, BulkError> {
        if !path.is_collection() {
            return Err(self.stopped(invalid_argument(format!(
                "Expected a collection path, got '{path}'"
            ))));
        }
        let tree = self
            .export_level(path.clone())
            .await
            .map_err(|err| self.stopped(err))?;
        self.context.report(&format!(
            "Export of {path} complete: {} document(s)",
            tree.document_count()
        ));
        Ok(tree)
    }

    /// Exports every collection directly under `parent`, the database root
    /// or a document.
    ///
    /// On failure the error carries the collections finished so far.
    pub async fn export_database(&self, parent: &ResourcePath) -> Result<ExportFile, ExportError> {
        let mut export = ExportFile::new();
        let collection_ids = match self.list_all_collection_ids(parent).await {
            Ok(ids) => ids,
            Err(error) => return Err(self.stopped_export(error, export)),
        };
        for collection_id in collection_ids {
            if let Err(error) = self.context.ensure_not_cancelled() {
                return Err(self.stopped_export(error, export));
            }
            let path = parent.child([collection_id.as_str()]);
            match self.export_collection(&path).await {
                Ok(tree) => export.insert(collection_id, tree),
                Err(err) => return Err(self.stopped_export(err.error, export)),
            }
        }
        Ok(export)
    }

    async fn list_all_collection_ids(&self, parent: &ResourcePath) -> FirestoreResult<Vec<String>> {
        let store = self.context.store();
        let page_size = self.context.settings().collection_ids_page_size;
        collect_all(|token: Option<String>| async move {
            self.context
                .call(|| store.list_collection_ids(parent, page_size, token.clone()))
                .await
        })
        .await
    }

    fn export_level(&self, path: ResourcePath) -> BoxFuture<'_, FirestoreResult<CollectionTree>> {
        async move {
            let store = self.context.store();
            let settings = self.context.settings();
            let path = &path;
            let mut pages = pin!(paginate(|token: Option<String>| async move {
                self.context
                    .call(|| store.list_documents(path, settings.export_page_size, token.clone(), true))
                    .await
            }));

            let mut tree = CollectionTree::new();
            while let Some(page) = pages.try_next().await? {
                self.context.ensure_not_cancelled()?;
                let nodes = bounded_concurrent_map(page.items, settings.export_concurrency, |document| {
                    self.export_document(document)
                })
                .await?;
                for (id, node) in nodes {
                    tree.insert(id, node);
                }
                self.context
                    .report(&format!("Exported {} documents", self.exported()));
            }
            Ok(tree)
        }
        .boxed()
    }

    async fn export_document(&self, document: Document) -> FirestoreResult<(String, DocumentNode)> {
        let store = self.context.store();
        let settings = self.context.settings();
        let mut node = DocumentNode::new(decode_fields(&document.fields));

        // Collection counts per document are expected to be small: one page.
        let collections = self
            .context
            .call(|| store.list_collection_ids(document.path(), settings.collection_ids_page_size, None))
            .await?;
        if collections.has_more() {
            log::warn!(
                "{} has more than {} subcollections; only the first page is exported",
                document.path(),
                settings.collection_ids_page_size
            );
        }

        let subtrees = bounded_concurrent_map(collections.items, settings.export_concurrency, |id| {
            let child = document.path().child([id.as_str()]);
            async move {
                let tree = self.export_level(child).await?;
                Ok::<_, FirestoreError>((id, tree))
            }
        })
        .await?;
        for (id, tree) in subtrees {
            node.subcollections.insert(id, tree);
        }

        self.exported.fetch_add(1, Ordering::SeqCst);
        Ok((document.id().to_string(), node))
    }

    fn stopped(&self, error: FirestoreError) -> BulkError {
        let report = WriteReport {
            succeeded: self.exported(),
            failures: Vec::new(),
        };
        BulkError::new(error, report)
    }

    fn stopped_export(&self, error: FirestoreError, partial: ExportFile) -> ExportError {
        ExportError {
            error,
            exported: self.exported(),
            partial,
        }
    }
}
