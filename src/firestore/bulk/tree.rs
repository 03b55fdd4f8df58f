use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::firestore::codec::PlainFields;
use crate::firestore::error::{internal_error, invalid_argument, FirestoreResult};

/// One exported document: its plain fields and the collections below it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentNode {
    #[serde(rename = "_fields", default)]
    pub fields: PlainFields,
    #[serde(
        rename = "_subcollections",
        default,
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub subcollections: BTreeMap<String, CollectionTree>,
}

impl DocumentNode {
    pub fn new(fields: PlainFields) -> Self {
        Self {
            fields,
            subcollections: BTreeMap::new(),
        }
    }

    pub fn with_subcollection(mut self, id: impl Into<String>, tree: CollectionTree) -> Self {
        self.subcollections.insert(id.into(), tree);
        self
    }
}

/// Documents of one collection keyed by document id.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionTree {
    documents: BTreeMap<String, DocumentNode>,
}

impl CollectionTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, node: DocumentNode) -> Option<DocumentNode> {
        self.documents.insert(id.into(), node)
    }

    pub fn get(&self, id: &str) -> Option<&DocumentNode> {
        self.documents.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &DocumentNode)> {
        self.documents.iter()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Documents at this level and in every nested subcollection.
    pub fn document_count(&self) -> usize {
        self.documents
            .values()
            .map(|node| {
                1 + node
                    .subcollections
                    .values()
                    .map(CollectionTree::document_count)
                    .sum::<usize>()
            })
            .sum()
    }
}

impl FromIterator<(String, DocumentNode)> for CollectionTree {
    fn from_iter<I: IntoIterator<Item = (String, DocumentNode)>>(iter: I) -> Self {
        Self {
            documents: iter.into_iter().collect(),
        }
    }
}

/// The export file: root collection id to its tree, with no envelope.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExportFile {
    collections: BTreeMap<String, CollectionTree>,
}

impl ExportFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, collection_id: impl Into<String>, tree: CollectionTree) {
        self.collections.insert(collection_id.into(), tree);
    }

    pub fn get(&self, collection_id: &str) -> Option<&CollectionTree> {
        self.collections.get(collection_id)
    }

    pub fn collections(&self) -> impl Iterator<Item = (&String, &CollectionTree)> {
        self.collections.iter()
    }

    pub fn document_count(&self) -> usize {
        self.collections.values().map(CollectionTree::document_count).sum()
    }

    pub fn to_json_string(&self) -> FirestoreResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|err| internal_error(format!("Failed to serialize export: {err}")))
    }

    pub fn from_json_str(json: &str) -> FirestoreResult<Self> {
        serde_json::from_str(json)
            .map_err(|err| invalid_argument(format!("Not a valid export file: {err}")))
    }

    pub fn write_to_path(&self, path: impl AsRef<Path>) -> FirestoreResult<()> {
        let path = path.as_ref();
        let json = self.to_json_string()?;
        std::fs::write(path, json)
            .map_err(|err| internal_error(format!("Failed to write {}: {err}", path.display())))
    }

    pub fn read_from_path(path: impl AsRef<Path>) -> FirestoreResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|err| invalid_argument(format!("Failed to read {}: {err}", path.display())))?;
        Self::from_json_str(&json)
    }
}

impl From<BTreeMap<String, CollectionTree>> for ExportFile {
    fn from(collections: BTreeMap<String, CollectionTree>) -> Self {
        Self { collections }
    }
}
