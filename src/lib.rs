//! Engine of a Firestore browser: a codec between Firestore's typed REST
//! values and plain JSON, document-store clients for the v1 REST API and for
//! memory, and bulk export, import and delete of collection hierarchies.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use firestore_explorer::firestore::{
//!     BulkContext, CollectionExporter, DatabaseId, HttpDocumentStore, ResourcePath, StaticTokenProvider,
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let store = HttpDocumentStore::builder(DatabaseId::for_project("my-project")?)
//!     .with_auth_provider(Arc::new(StaticTokenProvider::new("ya29.token")))
//!     .build()?;
//! let exporter = CollectionExporter::new(BulkContext::new(Arc::new(store)));
//! let export = exporter.export_database(&ResourcePath::root()).await?;
//! export.write_to_path("export.json")?;
//! # Ok(())
//! # }
//! ```

pub mod firestore;
pub mod platform;
pub mod util;

#[cfg(test)]
pub mod test_support;
