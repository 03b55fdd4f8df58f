use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};

use crate::firestore::error::{already_exists, invalid_argument, FirestoreError, FirestoreResult};
use crate::firestore::model::{DatabaseId, Document, DocumentKey, ResourcePath};
use crate::firestore::value::MapValue;
use crate::util::Page;

use super::{DocumentStore, WriteOperation, WriteStatus};

/// The calls an [`InMemoryDocumentStore`] counts and can be told to fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    ListCollectionIds,
    ListDocuments,
    GetDocument,
    CreateDocument,
    UpdateDocument,
    DeleteDocument,
    BatchWrite,
}

#[derive(Clone, Debug)]
struct StoredDocument {
    fields: MapValue,
    create_time: String,
    update_time: String,
}

#[derive(Clone, Debug)]
struct FailureRule {
    operation: StoreOperation,
    // `None` fails forever.
    remaining: Option<usize>,
    error: FirestoreError,
}

#[derive(Default)]
struct StoreState {
    documents: BTreeMap<String, StoredDocument>,
    calls: HashMap<StoreOperation, usize>,
    failures: Vec<FailureRule>,
    document_failures: HashMap<String, FirestoreError>,
}

/// A [`DocumentStore`] kept in process memory.
///
/// Paging tokens are the last id of the previous page. Documents that only
/// exist as ancestors of deeper documents are listed as missing, like the
/// REST API does with `showMissing`. Every call is counted, and failures can
/// be injected per operation or per document path.
#[derive(Clone)]
pub struct InMemoryDocumentStore {
    database_id: DatabaseId,
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryDocumentStore {
    pub fn new(database_id: DatabaseId) -> Self {
        Self {
            database_id,
            state: Arc::new(Mutex::new(StoreState::default())),
        }
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Stores a document directly, bypassing counters and failure rules.
    pub fn insert(&self, path: &str, fields: MapValue) -> FirestoreResult<()> {
        let key = DocumentKey::from_string(path)?;
        let mut state = self.state();
        upsert(&mut state, &key, fields);
        Ok(())
    }

    pub fn fields(&self, path: &str) -> Option<MapValue> {
        let canonical = ResourcePath::from_string(path).ok()?.canonical_string();
        self.state()
            .documents
            .get(&canonical)
            .map(|stored| stored.fields.clone())
    }

    /// Paths of all stored documents, sorted.
    pub fn document_paths(&self) -> Vec<String> {
        self.state().documents.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.state().documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn calls(&self, operation: StoreOperation) -> usize {
        self.state().calls.get(&operation).copied().unwrap_or(0)
    }

    /// Fails the next `times` calls of `operation` with `error`.
    pub fn fail_next(&self, operation: StoreOperation, times: usize, error: FirestoreError) {
        self.state().failures.push(FailureRule {
            operation,
            remaining: Some(times),
            error,
        });
    }

    /// Fails every call of `operation` with `error`.
    pub fn fail_always(&self, operation: StoreOperation, error: FirestoreError) {
        self.state().failures.push(FailureRule {
            operation,
            remaining: None,
            error,
        });
    }

    /// Fails every write touching `path`: individual calls return `error`,
    /// batch writes report it as that write's status.
    pub fn fail_document(&self, path: &str, error: FirestoreError) -> FirestoreResult<()> {
        let key = DocumentKey::from_string(path)?;
        self.state()
            .document_failures
            .insert(key.path().canonical_string(), error);
        Ok(())
    }

    pub fn clear_failures(&self) {
        let mut state = self.state();
        state.failures.clear();
        state.document_failures.clear();
    }

    /// Counts the call and applies any matching failure rule.
    fn begin(&self, operation: StoreOperation) -> FirestoreResult<MutexGuard<'_, StoreState>> {
        let mut state = self.state();
        *state.calls.entry(operation).or_insert(0) += 1;
        let rule = state
            .failures
            .iter_mut()
            .find(|rule| rule.operation == operation && rule.remaining != Some(0));
        if let Some(rule) = rule {
            if let Some(remaining) = rule.remaining.as_mut() {
                *remaining -= 1;
            }
            return Err(rule.error.clone());
        }
        Ok(state)
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn upsert(state: &mut StoreState, key: &DocumentKey, fields: MapValue) -> Document {
    let canonical = key.path().canonical_string();
    let timestamp = now();
    let create_time = state
        .documents
        .get(&canonical)
        .map(|stored| stored.create_time.clone())
        .unwrap_or_else(|| timestamp.clone());
    let stored = StoredDocument {
        fields,
        create_time,
        update_time: timestamp,
    };
    let document = to_document(key.clone(), &stored, true);
    state.documents.insert(canonical, stored);
    document
}

fn to_document(key: DocumentKey, stored: &StoredDocument, include_fields: bool) -> Document {
    Document {
        key,
        fields: if include_fields {
            stored.fields.clone()
        } else {
            MapValue::default()
        },
        create_time: Some(stored.create_time.clone()),
        update_time: Some(stored.update_time.clone()),
    }
}

fn document_failure(state: &StoreState, key: &DocumentKey) -> Option<FirestoreError> {
    state
        .document_failures
        .get(&key.path().canonical_string())
        .cloned()
}

/// Every stored document path strictly below `parent`.
fn descendants<'a>(
    state: &'a StoreState,
    parent: &'a ResourcePath,
) -> impl Iterator<Item = ResourcePath> + 'a {
    state.documents.keys().filter_map(move |canonical| {
        let path = ResourcePath::from_string(canonical).ok()?;
        let is_below = path.len() > parent.len()
            && parent
                .iter()
                .zip(path.iter())
                .all(|(expected, actual)| expected == actual);
        is_below.then_some(path)
    })
}

/// Pages `items`, sorted by id. The token is the last id handed out, so
/// removing documents that were already listed does not shift later pages.
fn paged<T>(items: Vec<(String, T)>, page_size: u32, page_token: Option<String>) -> Page<T> {
    let cursor = page_token.filter(|token| !token.is_empty());
    let mut remaining = items
        .into_iter()
        .filter(|(id, _)| cursor.as_ref().map_or(true, |cursor| id > cursor))
        .peekable();
    let mut page = Vec::new();
    let mut last_id = None;
    for (id, item) in remaining.by_ref().take(page_size.max(1) as usize) {
        page.push(item);
        last_id = Some(id);
    }
    let next_page_token = if remaining.peek().is_some() { last_id } else { None };
    Page::new(page, next_page_token)
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    fn database_id(&self) -> &DatabaseId {
        &self.database_id
    }

    async fn list_collection_ids(
        &self,
        parent: &ResourcePath,
        page_size: u32,
        page_token: Option<String>,
    ) -> FirestoreResult<Page<String>> {
        if !parent.is_empty() && !parent.is_document() {
            return Err(invalid_argument(format!(
                "Collections can only be listed under a document, got '{parent}'"
            )));
        }
        let state = self.begin(StoreOperation::ListCollectionIds)?;
        let ids: BTreeSet<String> = descendants(&state, parent)
            .filter_map(|path| path.segment(parent.len()).map(str::to_string))
            .collect();
        let entries = ids.into_iter().map(|id| (id.clone(), id)).collect();
        Ok(paged(entries, page_size, page_token))
    }

    async fn list_documents(
        &self,
        collection: &ResourcePath,
        page_size: u32,
        page_token: Option<String>,
        include_fields: bool,
    ) -> FirestoreResult<Page<Document>> {
        if !collection.is_collection() {
            return Err(invalid_argument(format!(
                "Documents can only be listed in a collection, got '{collection}'"
            )));
        }
        let state = self.begin(StoreOperation::ListDocuments)?;
        let ids: BTreeSet<String> = descendants(&state, collection)
            .filter_map(|path| path.segment(collection.len()).map(str::to_string))
            .collect();
        let documents = ids
            .into_iter()
            .map(|id| {
                let key = DocumentKey::in_collection(collection, &id)?;
                let document = match state.documents.get(&key.path().canonical_string()) {
                    Some(stored) => to_document(key, stored, include_fields),
                    None => Document::new(key, MapValue::default()),
                };
                Ok((id, document))
            })
            .collect::<FirestoreResult<Vec<_>>>()?;
        Ok(paged(documents, page_size, page_token))
    }

    async fn get_document(&self, key: &DocumentKey) -> FirestoreResult<Option<Document>> {
        let state = self.begin(StoreOperation::GetDocument)?;
        Ok(state
            .documents
            .get(&key.path().canonical_string())
            .map(|stored| to_document(key.clone(), stored, true)))
    }

    async fn create_document(
        &self,
        collection: &ResourcePath,
        document_id: Option<&str>,
        fields: MapValue,
    ) -> FirestoreResult<Document> {
        let key = DocumentKey::for_new_document(collection, document_id)?;
        let mut state = self.begin(StoreOperation::CreateDocument)?;
        if let Some(error) = document_failure(&state, &key) {
            return Err(error);
        }
        if state.documents.contains_key(&key.path().canonical_string()) {
            return Err(already_exists(format!("Document already exists: {}", key.path())));
        }
        Ok(upsert(&mut state, &key, fields))
    }

    async fn update_document(&self, key: &DocumentKey, fields: MapValue) -> FirestoreResult<Document> {
        let mut state = self.begin(StoreOperation::UpdateDocument)?;
        if let Some(error) = document_failure(&state, key) {
            return Err(error);
        }
        Ok(upsert(&mut state, key, fields))
    }

    async fn delete_document(&self, key: &DocumentKey) -> FirestoreResult<()> {
        let mut state = self.begin(StoreOperation::DeleteDocument)?;
        if let Some(error) = document_failure(&state, key) {
            return Err(error);
        }
        state.documents.remove(&key.path().canonical_string());
        Ok(())
    }

    async fn batch_write(&self, writes: Vec<WriteOperation>) -> FirestoreResult<Vec<WriteStatus>> {
        let mut state = self.begin(StoreOperation::BatchWrite)?;
        let statuses = writes
            .into_iter()
            .map(|write| {
                if let Some(error) = document_failure(&state, write.key()) {
                    return WriteStatus::failed(error.code.rpc_code(), error.message());
                }
                match write {
                    WriteOperation::Update { key, fields } => {
                        upsert(&mut state, &key, fields);
                    }
                    WriteOperation::Delete { key } => {
                        state.documents.remove(&key.path().canonical_string());
                    }
                }
                WriteStatus::ok()
            })
            .collect();
        Ok(statuses)
    }
}
