use std::time::Duration;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde_json::Value as JsonValue;

use crate::firestore::error::{deadline_exceeded, internal_error, unavailable, FirestoreError, FirestoreResult};
use crate::firestore::model::{DatabaseId, ResourcePath};

use super::rpc_error::map_http_error;

const FIRESTORE_API_HOST: &str = "https://firestore.googleapis.com";
const FIRESTORE_API_VERSION: &str = "v1";
const EMULATOR_HOST_ENV: &str = "FIRESTORE_EMULATOR_HOST";

/// Characters escaped inside a single path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'?')
    .add(b'`')
    .add(b'<')
    .add(b'>')
    .add(b'{')
    .add(b'}');

#[derive(Clone, Debug)]
pub struct Connection {
    client: Client,
    base_url: String,
}

#[derive(Clone, Debug)]
pub struct ConnectionBuilder {
    database_id: DatabaseId,
    emulator_host: Option<String>,
}

#[derive(Default, Clone, Debug)]
pub struct RequestContext {
    pub auth_token: Option<String>,
    pub request_timeout: Option<Duration>,
}

impl ConnectionBuilder {
    pub fn new(database_id: DatabaseId) -> Self {
        Self {
            database_id,
            emulator_host: std::env::var(EMULATOR_HOST_ENV).ok(),
        }
    }

    pub fn with_emulator_host(mut self, host: impl Into<String>) -> Self {
        self.emulator_host = Some(host.into());
        self
    }

    pub fn build(self) -> FirestoreResult<Connection> {
        let client = Client::builder()
            .build()
            .map_err(|err| internal_error(err.to_string()))?;
        let base_url = build_base_url(&self.database_id, self.emulator_host.as_deref());
        Ok(Connection { client, base_url })
    }
}

impl Connection {
    pub fn builder(database_id: DatabaseId) -> ConnectionBuilder {
        ConnectionBuilder::new(database_id)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sends a request and parses the JSON response body.
    pub async fn invoke_json(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&JsonValue>,
        context: &RequestContext,
    ) -> FirestoreResult<JsonValue> {
        let (status, text) = self.send(method, path, query, body, context).await?;
        if status.is_success() {
            parse_body(&text)
        } else {
            Err(map_http_error(status, &text))
        }
    }

    /// Like [`Connection::invoke_json`], but maps `404 Not Found` to `None`.
    pub async fn invoke_json_optional(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&JsonValue>,
        context: &RequestContext,
    ) -> FirestoreResult<Option<JsonValue>> {
        let (status, text) = self.send(method, path, query, body, context).await?;
        if status.is_success() {
            parse_body(&text).map(Some)
        } else if status == StatusCode::NOT_FOUND {
            Ok(None)
        } else {
            Err(map_http_error(status, &text))
        }
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&JsonValue>,
        context: &RequestContext,
    ) -> FirestoreResult<(StatusCode, String)> {
        let mut request = self.build_request(method, path, context);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await.map_err(map_transport_error)?;
        let status = response.status();
        let text = response.text().await.map_err(map_transport_error)?;
        Ok((status, text))
    }

    fn build_request(&self, method: Method, path: &str, context: &RequestContext) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let mut builder = self.client.request(method, url);
        if let Some(timeout) = context.request_timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(token) = context.auth_token.as_deref() {
            builder = builder.bearer_auth(token);
        }
        builder = builder.header("Content-Type", "application/json");
        builder
    }
}

/// `documents[/{escaped path}]`, the REST path of a document or collection.
pub fn documents_path(path: &ResourcePath) -> String {
    let mut rendered = String::from("documents");
    for segment in path.iter() {
        rendered.push('/');
        rendered.extend(utf8_percent_encode(segment, PATH_SEGMENT));
    }
    rendered
}

fn parse_body(text: &str) -> FirestoreResult<JsonValue> {
    if text.is_empty() {
        Ok(JsonValue::Null)
    } else {
        serde_json::from_str(text).map_err(|err| internal_error(err.to_string()))
    }
}

/// Maps a `reqwest` failure that happened before a status was received.
///
/// Connect and timeout failures get dedicated codes; the rest keep the
/// transport description so transient-error classification can inspect it.
fn map_transport_error(err: reqwest::Error) -> FirestoreError {
    let message = describe_transport_error(&err);
    if err.is_timeout() {
        deadline_exceeded(message)
    } else if err.is_connect() {
        unavailable(message)
    } else {
        internal_error(message)
    }
}

fn describe_transport_error(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn build_base_url(database_id: &DatabaseId, emulator_host: Option<&str>) -> String {
    match emulator_host {
        Some(host) => format!(
            "http://{host}/{api_version}/projects/{}/databases/{}",
            database_id.project_id(),
            database_id.database(),
            api_version = FIRESTORE_API_VERSION
        ),
        None => format!(
            "{host}/{api_version}/projects/{}/databases/{}",
            database_id.project_id(),
            database_id.database(),
            host = FIRESTORE_API_HOST,
            api_version = FIRESTORE_API_VERSION
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn production_base_url() {
        let url = build_base_url(&DatabaseId::default("demo"), None);
        assert_eq!(
            url,
            "https://firestore.googleapis.com/v1/projects/demo/databases/(default)"
        );
    }

    #[test]
    fn emulator_base_url() {
        let url = build_base_url(&DatabaseId::default("demo"), Some("localhost:8080"));
        assert_eq!(url, "http://localhost:8080/v1/projects/demo/databases/(default)");
    }

    #[test]
    fn escapes_path_segments() {
        let path = ResourcePath::from_segments(["users", "ada lovelace", "notes", "a?b"]);
        assert_eq!(
            documents_path(&path),
            "documents/users/ada%20lovelace/notes/a%3Fb"
        );
        assert_eq!(documents_path(&ResourcePath::root()), "documents");
    }
}
