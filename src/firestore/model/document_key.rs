use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};

use crate::firestore::error::{invalid_argument, FirestoreResult};
use crate::firestore::model::ResourcePath;

/// Length of the ids generated for documents created without one.
pub const AUTO_ID_LENGTH: usize = 20;

/// Random document id of [`AUTO_ID_LENGTH`] ASCII letters and digits.
pub fn generate_auto_id() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .map(char::from)
        .take(AUTO_ID_LENGTH)
        .collect()
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DocumentKey {
    path: ResourcePath,
}

impl DocumentKey {
    pub fn from_path(path: ResourcePath) -> FirestoreResult<Self> {
        if !path.is_document() {
            return Err(invalid_argument(format!(
                "Document keys must point to a document (even number of segments): '{path}'"
            )));
        }
        Ok(Self { path })
    }

    pub fn from_string(path: &str) -> FirestoreResult<Self> {
        let resource = ResourcePath::from_string(path)?;
        Self::from_path(resource)
    }

    /// Key of document `id` inside the collection at `collection`.
    pub fn in_collection(collection: &ResourcePath, id: &str) -> FirestoreResult<Self> {
        if id.is_empty() || id.contains('/') {
            return Err(invalid_argument(format!("Invalid document id '{id}'")));
        }
        Self::from_path(collection.child([id]))
    }

    /// Key for a document about to be created. A missing or empty id is
    /// replaced by a generated one.
    pub fn for_new_document(collection: &ResourcePath, id: Option<&str>) -> FirestoreResult<Self> {
        match id.filter(|id| !id.is_empty()) {
            Some(id) => Self::in_collection(collection, id),
            None => Self::in_collection(collection, &generate_auto_id()),
        }
    }

    pub fn path(&self) -> &ResourcePath {
        &self.path
    }

    pub fn id(&self) -> &str {
        self.path
            .last_segment()
            .expect("DocumentKey path always has id")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_even_segments() {
        let err = DocumentKey::from_string("cities").unwrap_err();
        assert_eq!(err.code_str(), "firestore/invalid-argument");
    }

    #[test]
    fn parses_valid_path() {
        let key = DocumentKey::from_string("cities/sf").unwrap();
        assert_eq!(key.id(), "sf");
        assert_eq!(key.path().canonical_string(), "cities/sf");
    }

    #[test]
    fn builds_key_inside_subcollection() {
        let collection = ResourcePath::from_string("cities/sf/landmarks").unwrap();
        let key = DocumentKey::in_collection(&collection, "bridge").unwrap();
        assert_eq!(key.path().canonical_string(), "cities/sf/landmarks/bridge");
        assert!(DocumentKey::in_collection(&collection, "a/b").is_err());
    }

    #[test]
    fn auto_ids_are_twenty_alphanumerics() {
        let id = generate_auto_id();
        assert_eq!(id.len(), AUTO_ID_LENGTH);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(id, generate_auto_id());
    }

    #[test]
    fn new_documents_without_id_get_one() {
        let collection = ResourcePath::from_segments(["notes"]);
        for id in [None, Some("")] {
            let key = DocumentKey::for_new_document(&collection, id).unwrap();
            assert_eq!(key.id().len(), AUTO_ID_LENGTH);
            assert_eq!(key.path(), &collection.child([key.id()]));
        }
        let named = DocumentKey::for_new_document(&collection, Some("n1")).unwrap();
        assert_eq!(named.id(), "n1");
    }
}
