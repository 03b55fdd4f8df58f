use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};

use crate::firestore::constants::EMPTY_FIELD_MASK;
use crate::firestore::error::{internal_error, invalid_argument, FirestoreErrorCode, FirestoreResult};
use crate::firestore::model::{DatabaseId, Document, DocumentKey, ResourcePath};
use crate::firestore::remote::connection::{documents_path, Connection, ConnectionBuilder, RequestContext};
use crate::firestore::remote::serializer::JsonProtoSerializer;
use crate::firestore::value::MapValue;
use crate::util::Page;

use super::{DocumentStore, NoopTokenProvider, TokenProviderArc, WriteOperation, WriteStatus};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct HttpDocumentStore {
    connection: Connection,
    serializer: JsonProtoSerializer,
    auth_provider: TokenProviderArc,
    request_timeout: Duration,
}

#[derive(Clone)]
pub struct HttpDocumentStoreBuilder {
    database_id: DatabaseId,
    connection_builder: ConnectionBuilder,
    auth_provider: TokenProviderArc,
    request_timeout: Duration,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListCollectionIdsResponse {
    #[serde(default)]
    collection_ids: Vec<String>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDocumentsResponse {
    #[serde(default)]
    documents: Vec<JsonValue>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct BatchWriteResponse {
    #[serde(default)]
    status: Vec<StatusPayload>,
}

#[derive(Debug, Default, Deserialize)]
struct StatusPayload {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

impl HttpDocumentStoreBuilder {
    pub fn new(database_id: DatabaseId) -> Self {
        let connection_builder = Connection::builder(database_id.clone());
        Self {
            database_id,
            connection_builder,
            auth_provider: Arc::new(NoopTokenProvider),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_connection_builder(mut self, builder: ConnectionBuilder) -> Self {
        self.connection_builder = builder;
        self
    }

    pub fn with_emulator_host(mut self, host: impl Into<String>) -> Self {
        self.connection_builder = self.connection_builder.with_emulator_host(host);
        self
    }

    pub fn with_auth_provider(mut self, provider: TokenProviderArc) -> Self {
        self.auth_provider = provider;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn build(self) -> FirestoreResult<HttpDocumentStore> {
        let connection = self.connection_builder.build()?;
        Ok(HttpDocumentStore {
            connection,
            serializer: JsonProtoSerializer::new(self.database_id),
            auth_provider: self.auth_provider,
            request_timeout: self.request_timeout,
        })
    }
}

impl HttpDocumentStore {
    pub fn builder(database_id: DatabaseId) -> HttpDocumentStoreBuilder {
        HttpDocumentStoreBuilder::new(database_id)
    }

    pub fn from_database_id(database_id: DatabaseId) -> FirestoreResult<Self> {
        Self::builder(database_id).build()
    }

    async fn request_context(&self) -> FirestoreResult<RequestContext> {
        let auth_token = self.auth_provider.get_token().await?;
        Ok(RequestContext {
            auth_token,
            request_timeout: Some(self.request_timeout),
        })
    }

    /// Drops the cached credential when the server rejected it, so the next
    /// request asks the provider for a fresh one.
    fn observe<T>(&self, result: FirestoreResult<T>) -> FirestoreResult<T> {
        if let Err(err) = &result {
            if err.code == FirestoreErrorCode::Unauthenticated {
                log::debug!("access token rejected, invalidating: {err}");
                self.auth_provider.invalidate_token();
            }
        }
        result
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&JsonValue>,
    ) -> FirestoreResult<JsonValue> {
        let context = self.request_context().await?;
        let result = self
            .connection
            .invoke_json(method, path, query, body, &context)
            .await;
        self.observe(result)
    }

    async fn send_optional(&self, method: Method, path: &str) -> FirestoreResult<Option<JsonValue>> {
        let context = self.request_context().await?;
        let result = self
            .connection
            .invoke_json_optional(method, path, &[], None, &context)
            .await;
        self.observe(result)
    }
}

fn parse_response<T: DeserializeOwned + Default>(value: JsonValue, what: &str) -> FirestoreResult<T> {
    if value.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(value).map_err(|err| internal_error(format!("Malformed {what} response: {err}")))
}

fn page_token_query(page_size: u32, page_token: Option<String>) -> Vec<(&'static str, String)> {
    let mut query = vec![("pageSize", page_size.to_string())];
    if let Some(token) = page_token.filter(|token| !token.is_empty()) {
        query.push(("pageToken", token));
    }
    query
}

#[async_trait]
impl DocumentStore for HttpDocumentStore {
    fn database_id(&self) -> &DatabaseId {
        self.serializer.database_id()
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
        let path = format!("{}:listCollectionIds", documents_path(parent));
        let mut body = json!({ "pageSize": page_size });
        if let Some(token) = page_token.filter(|token| !token.is_empty()) {
            body["pageToken"] = JsonValue::String(token);
        }
        let response = self.send(Method::POST, &path, &[], Some(&body)).await?;
        let parsed: ListCollectionIdsResponse = parse_response(response, "listCollectionIds")?;
        Ok(Page::new(parsed.collection_ids, parsed.next_page_token))
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
        let mut query = page_token_query(page_size, page_token);
        query.push(("showMissing", "true".to_string()));
        if !include_fields {
            query.push(("mask.fieldPaths", EMPTY_FIELD_MASK.to_string()));
        }
        let response = self
            .send(Method::GET, &documents_path(collection), &query, None)
            .await?;
        let parsed: ListDocumentsResponse = parse_response(response, "listDocuments")?;
        let documents = parsed
            .documents
            .iter()
            .map(|document| self.serializer.decode_document(document))
            .collect::<FirestoreResult<Vec<_>>>()?;
        Ok(Page::new(documents, parsed.next_page_token))
    }

    async fn get_document(&self, key: &DocumentKey) -> FirestoreResult<Option<Document>> {
        let response = self
            .send_optional(Method::GET, &documents_path(key.path()))
            .await?;
        response
            .map(|document| self.serializer.decode_document(&document))
            .transpose()
    }

    async fn create_document(
        &self,
        collection: &ResourcePath,
        document_id: Option<&str>,
        fields: MapValue,
    ) -> FirestoreResult<Document> {
        // Validates the id before anything is sent.
        let key = DocumentKey::for_new_document(collection, document_id)?;
        let body = self.serializer.encode_document_fields(&fields);
        let query = [("documentId", key.id().to_string())];
        let response = self
            .send(Method::POST, &documents_path(collection), &query, Some(&body))
            .await?;
        self.serializer.decode_document(&response)
    }

    async fn update_document(&self, key: &DocumentKey, fields: MapValue) -> FirestoreResult<Document> {
        let body = self.serializer.encode_document_fields(&fields);
        let response = self
            .send(Method::PATCH, &documents_path(key.path()), &[], Some(&body))
            .await?;
        self.serializer.decode_document(&response)
    }

    async fn delete_document(&self, key: &DocumentKey) -> FirestoreResult<()> {
        self.send(Method::DELETE, &documents_path(key.path()), &[], None)
            .await
            .map(|_| ())
    }

    async fn batch_write(&self, writes: Vec<WriteOperation>) -> FirestoreResult<Vec<WriteStatus>> {
        if writes.is_empty() {
            return Ok(Vec::new());
        }
        let body = self.serializer.encode_batch_write_body(&writes);
        let response = self
            .send(Method::POST, "documents:batchWrite", &[], Some(&body))
            .await?;
        let parsed: BatchWriteResponse = parse_response(response, "batchWrite")?;
        if parsed.status.len() != writes.len() {
            return Err(internal_error(format!(
                "batchWrite returned {} statuses for {} writes",
                parsed.status.len(),
                writes.len()
            )));
        }
        Ok(parsed
            .status
            .into_iter()
            .map(|status| WriteStatus::failed(status.code, status.message))
            .collect())
    }
}
