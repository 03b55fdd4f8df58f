use futures::future::BoxFuture;
use futures::FutureExt;

use crate::firestore::bulk::batch::BatchWriter;
use crate::firestore::bulk::context::BulkContext;
use crate::firestore::bulk::report::{BulkError, WriteReport};
use crate::firestore::bulk::tree::{CollectionTree, ExportFile};
use crate::firestore::codec::{contains_wire_tags, normalize_fields, PlainFields, ValueEncoder};
use crate::firestore::error::{invalid_argument, FirestoreResult};
use crate::firestore::model::{DocumentKey, ResourcePath};
use crate::firestore::remote::datastore::WriteOperation;

/// Writes exported trees back, parents before their subcollections.
pub struct CollectionImporter {
    context: BulkContext,
    encoder: ValueEncoder,
}

impl CollectionImporter {
    pub fn new(context: BulkContext) -> Self {
        let encoder = ValueEncoder::for_database(context.store().database_id().clone());
        Self { context, encoder }
    }

    /// Imports `tree` into the collection at `path`.
    ///
    /// Documents that fail even when written on their own are listed in the
    /// report; the import goes on. Fatal errors and cancellation stop it and
    /// come back as a [`BulkError`] carrying what was written up to then.
    pub async fn import_collection(
        &self,
        path: &ResourcePath,
        tree: &CollectionTree,
    ) -> Result<WriteReport, BulkError> {
        let mut report = WriteReport::new();
        if !path.is_collection() {
            return Err(BulkError::new(
                invalid_argument(format!("Expected a collection path, got '{path}'")),
                report,
            ));
        }
        match self.import_level(path, tree, &mut report).await {
            Ok(()) => {
                self.context
                    .report(&format!("Import into {path}: {}", report.summary("imported")));
                Ok(report)
            }
            Err(error) => Err(BulkError::new(error, report)),
        }
    }

    /// Imports every root collection of an export file.
    pub async fn import_database(&self, export: &ExportFile) -> Result<WriteReport, BulkError> {
        let mut total = WriteReport::new();
        for (collection_id, tree) in export.collections() {
            let path = ResourcePath::from_segments([collection_id.as_str()]);
            match self.import_collection(&path, tree).await {
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

    fn import_level<'a>(
        &'a self,
        path: &'a ResourcePath,
        tree: &'a CollectionTree,
        report: &'a mut WriteReport,
    ) -> BoxFuture<'a, FirestoreResult<()>> {
        async move {
            let mut writes = Vec::with_capacity(tree.len());
            for (id, node) in tree.iter() {
                match DocumentKey::in_collection(path, id) {
                    Ok(key) => writes.push(WriteOperation::Update {
                        key,
                        fields: self.encoder.encode_fields(&plain_form(&node.fields)),
                    }),
                    Err(err) => {
                        log::error!("skipping document '{id}' in {path}: {err}");
                        report.record_failure(format!("{path}/{id}"), err);
                    }
                }
            }

            BatchWriter::new(&self.context)
                .write_all(writes, report, |report| {
                    self.context
                        .report(&format!("Imported {} documents", report.succeeded));
                })
                .await?;

            // Subcollection addresses hang off their parent, so they go last.
            for (id, node) in tree.iter() {
                for (collection_id, subtree) in &node.subcollections {
                    let child = path.child([id.as_str(), collection_id.as_str()]);
                    self.import_level(&child, subtree, report).await?;
                }
            }
            Ok(())
        }
        .boxed()
    }
}

/// Decodes fields saved in raw wire form; plain fields pass through.
fn plain_form(fields: &PlainFields) -> PlainFields {
    let raw = fields.values().any(contains_wire_tags);
    if raw {
        normalize_fields(fields)
    } else {
        fields.clone()
    }
}
