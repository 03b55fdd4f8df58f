pub mod bulk;
pub mod codec;
pub mod constants;
pub mod error;
pub mod model;
pub mod registry;
pub mod remote;
pub mod value;

pub use bulk::{
    BulkContext, BulkDeleter, BulkError, BulkSettings, CancellationToken, CollectionExporter, CollectionImporter,
    CollectionTree, DocumentNode, ExportError, ExportFile, ProgressSink, WriteReport,
};
pub use codec::{decode_fields, decode_value, encode_fields, encode_value, PlainFields, PlainValue};
pub use error::{FirestoreError, FirestoreErrorCode, FirestoreResult};
pub use model::{DatabaseId, Document, DocumentKey, GeoPoint, ResourcePath};
pub use registry::{ClientKey, ClientRegistry};
pub use remote::{
    DocumentStore, DocumentStoreArc, HttpDocumentStore, InMemoryDocumentStore, StaticTokenProvider, TokenProvider,
    WriteOperation,
};
pub use value::{MapValue, WireValue};
