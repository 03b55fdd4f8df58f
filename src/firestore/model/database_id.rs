use crate::firestore::constants::DEFAULT_DATABASE_ID;
use crate::firestore::error::{invalid_argument, missing_project_id, FirestoreResult};
use crate::firestore::model::ResourcePath;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DatabaseId {
    project_id: String,
    database: String,
}

impl DatabaseId {
    pub fn new(project_id: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            database: database.into(),
        }
    }

    pub fn default(project_id: impl Into<String>) -> Self {
        Self::new(project_id, DEFAULT_DATABASE_ID)
    }

    /// Builds a database id for `project_id`, rejecting blank project ids.
    pub fn for_project(project_id: &str) -> FirestoreResult<Self> {
        if project_id.trim().is_empty() {
            return Err(missing_project_id());
        }
        Ok(Self::default(project_id))
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// `projects/{project}/databases/{database}`
    pub fn database_name(&self) -> String {
        format!("projects/{}/databases/{}", self.project_id, self.database)
    }

    /// `projects/{project}/databases/{database}/documents`
    pub fn documents_root(&self) -> String {
        format!("{}/documents", self.database_name())
    }

    /// Fully qualified resource name of the document or collection at `path`.
    pub fn resource_name(&self, path: &ResourcePath) -> String {
        if path.is_empty() {
            self.documents_root()
        } else {
            format!("{}/{}", self.documents_root(), path.canonical_string())
        }
    }

    /// Strips this database's documents root from a fully qualified name.
    pub fn relative_path(&self, name: &str) -> FirestoreResult<ResourcePath> {
        let root = self.documents_root();
        let relative = name
            .strip_prefix(&root)
            .ok_or_else(|| invalid_argument(format!("Resource name '{name}' is outside {root}")))?;
        if !relative.is_empty() && !relative.starts_with('/') {
            return Err(invalid_argument(format!(
                "Resource name '{name}' is outside {root}"
            )));
        }
        ResourcePath::from_string(relative)
    }
}
