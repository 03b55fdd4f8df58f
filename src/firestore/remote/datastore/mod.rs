use std::sync::Arc;

use async_trait::async_trait;

use crate::firestore::error::{FirestoreError, FirestoreResult};
use crate::firestore::model::{DatabaseId, Document, DocumentKey, ResourcePath};
use crate::firestore::remote::rpc_error::map_rpc_code;
use crate::firestore::value::MapValue;
use crate::util::Page;

pub mod http;
pub mod in_memory;

/// One entry of a `batchWrite` request.
#[derive(Clone, Debug, PartialEq)]
pub enum WriteOperation {
    /// Replaces the whole document, creating it when missing.
    Update { key: DocumentKey, fields: MapValue },
    Delete { key: DocumentKey },
}

impl WriteOperation {
    pub fn key(&self) -> &DocumentKey {
        match self {
            WriteOperation::Update { key, .. } | WriteOperation::Delete { key } => key,
        }
    }
}

/// Outcome of a single write inside a `batchWrite` call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WriteStatus {
    pub code: i32,
    pub message: String,
}

impl WriteStatus {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn failed(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// `None` when the write was applied.
    pub fn to_error(&self) -> Option<FirestoreError> {
        map_rpc_code(self.code, &self.message)
    }
}

/// Document-level operations of the Firestore REST API.
///
/// Every method issues exactly one request; retrying is left to callers.
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    fn database_id(&self) -> &DatabaseId;

    /// Lists the ids of the collections directly under `parent`. The root
    /// path lists top-level collections.
    async fn list_collection_ids(
        &self,
        parent: &ResourcePath,
        page_size: u32,
        page_token: Option<String>,
    ) -> FirestoreResult<Page<String>>;

    /// Lists one page of a collection, including missing documents that
    /// only exist as parents of subcollections. With `include_fields`
    /// unset the server omits document data.
    async fn list_documents(
        &self,
        collection: &ResourcePath,
        page_size: u32,
        page_token: Option<String>,
        include_fields: bool,
    ) -> FirestoreResult<Page<Document>>;

    async fn get_document(&self, key: &DocumentKey) -> FirestoreResult<Option<Document>>;

    /// Creates a document, failing if it exists. Without an id (or with an
    /// empty one) a random 20-character id is used.
    async fn create_document(
        &self,
        collection: &ResourcePath,
        document_id: Option<&str>,
        fields: MapValue,
    ) -> FirestoreResult<Document>;

    /// Replaces all fields of the document, creating it if needed.
    async fn update_document(&self, key: &DocumentKey, fields: MapValue) -> FirestoreResult<Document>;

    async fn delete_document(&self, key: &DocumentKey) -> FirestoreResult<()>;

    /// Applies writes independently; one status is returned per write, in order.
    async fn batch_write(&self, writes: Vec<WriteOperation>) -> FirestoreResult<Vec<WriteStatus>>;
}

#[async_trait]
pub trait TokenProvider: Send + Sync + 'static {
    async fn get_token(&self) -> FirestoreResult<Option<String>>;
    fn invalidate_token(&self);
}

#[derive(Default, Clone)]
pub struct NoopTokenProvider;

#[async_trait]
impl TokenProvider for NoopTokenProvider {
    async fn get_token(&self) -> FirestoreResult<Option<String>> {
        Ok(None)
    }

    fn invalidate_token(&self) {}
}

/// Hands out a fixed bearer token, e.g. one minted by `gcloud auth print-access-token`.
#[derive(Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn get_token(&self) -> FirestoreResult<Option<String>> {
        Ok(Some(self.token.clone()))
    }

    fn invalidate_token(&self) {
        log::debug!("static access token rejected by the server; it cannot be refreshed");
    }
}

pub type TokenProviderArc = Arc<dyn TokenProvider>;
pub type DocumentStoreArc = Arc<dyn DocumentStore>;

pub use http::{HttpDocumentStore, HttpDocumentStoreBuilder};
pub use in_memory::{InMemoryDocumentStore, StoreOperation};
