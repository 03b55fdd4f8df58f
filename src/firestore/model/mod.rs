mod database_id;
mod document;
mod document_key;
mod geo_point;
mod resource_path;

pub use database_id::DatabaseId;
pub use document::Document;
pub use document_key::{generate_auto_id, DocumentKey, AUTO_ID_LENGTH};
pub use geo_point::GeoPoint;
pub use resource_path::ResourcePath;
