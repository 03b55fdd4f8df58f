pub mod connection;
pub mod datastore;
pub mod rpc_error;
pub mod serializer;

pub use connection::{Connection, ConnectionBuilder, RequestContext};
pub use datastore::{
    DocumentStore, DocumentStoreArc, HttpDocumentStore, HttpDocumentStoreBuilder, InMemoryDocumentStore,
    NoopTokenProvider, StaticTokenProvider, StoreOperation, TokenProvider, TokenProviderArc, WriteOperation,
    WriteStatus,
};
pub use rpc_error::map_http_error;
pub use serializer::JsonProtoSerializer;
