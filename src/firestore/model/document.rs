use crate::firestore::model::{DocumentKey, ResourcePath};
use crate::firestore::value::MapValue;

/// A document as returned by the REST API.
///
/// `create_time` is absent for "missing" documents: documents that were never
/// written but have subcollections underneath them.
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    pub key: DocumentKey,
    pub fields: MapValue,
    pub create_time: Option<String>,
    pub update_time: Option<String>,
}

impl Document {
    pub fn new(key: DocumentKey, fields: MapValue) -> Self {
        Self {
            key,
            fields,
            create_time: None,
            update_time: None,
        }
    }

    pub fn id(&self) -> &str {
        self.key.id()
    }

    pub fn path(&self) -> &ResourcePath {
        self.key.path()
    }

    pub fn is_missing(&self) -> bool {
        self.create_time.is_none()
    }
}
