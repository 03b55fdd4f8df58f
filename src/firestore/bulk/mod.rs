//! Export, import and bulk delete of whole collection hierarchies.
//!
//! All three run against a [`BulkContext`]: remote calls are retried with
//! backoff, writes go out as `batchWrite` calls with a per-document fallback,
//! and fan-out is bounded by [`BulkSettings`].

mod batch;
pub mod context;
pub mod delete;
pub mod export;
pub mod import;
pub mod progress;
pub mod report;
pub mod settings;
pub mod tree;

pub use context::BulkContext;
pub use delete::BulkDeleter;
pub use export::CollectionExporter;
pub use import::CollectionImporter;
pub use progress::{CancellationToken, NoopProgress, ProgressSink};
pub use report::{BulkError, ExportError, WriteFailure, WriteReport};
pub use settings::BulkSettings;
pub use tree::{CollectionTree, DocumentNode, ExportFile};
