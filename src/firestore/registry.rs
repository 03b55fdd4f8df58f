use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::firestore::error::FirestoreResult;
use crate::firestore::model::DatabaseId;
use crate::firestore::remote::datastore::{DocumentStoreArc, HttpDocumentStore, TokenProviderArc};

/// Identifies one remote client: the signed-in account and the project it
/// browses.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ClientKey {
    pub account: String,
    pub project_id: String,
}

impl ClientKey {
    pub fn new(account: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            project_id: project_id.into(),
        }
    }
}

type StoreFactory = dyn Fn(&ClientKey) -> FirestoreResult<DocumentStoreArc> + Send + Sync;

/// One document-store client per `(account, project)`.
///
/// Owned by whoever wires the application together; clients are created on
/// first use through the factory and reused afterwards.
pub struct ClientRegistry {
    factory: Box<StoreFactory>,
    clients: Mutex<HashMap<ClientKey, DocumentStoreArc>>,
}

impl ClientRegistry {
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn(&ClientKey) -> FirestoreResult<DocumentStoreArc> + Send + Sync + 'static,
    {
        Self {
            factory: Box::new(factory),
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// A registry of [`HttpDocumentStore`]s on each project's default
    /// database, authenticated with the token provider `tokens` returns for
    /// the account.
    pub fn http<T>(tokens: T) -> Self
    where
        T: Fn(&str) -> TokenProviderArc + Send + Sync + 'static,
    {
        Self::new(move |key| {
            let database_id = DatabaseId::for_project(&key.project_id)?;
            let store = HttpDocumentStore::builder(database_id)
                .with_auth_provider(tokens(&key.account))
                .build()?;
            Ok(Arc::new(store) as DocumentStoreArc)
        })
    }

    fn clients(&self) -> MutexGuard<'_, HashMap<ClientKey, DocumentStoreArc>> {
        self.clients
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }

    pub fn get_or_create(&self, account: &str, project_id: &str) -> FirestoreResult<DocumentStoreArc> {
        let key = ClientKey::new(account, project_id);
        let mut clients = self.clients();
        if let Some(existing) = clients.get(&key) {
            return Ok(existing.clone());
        }
        log::debug!("creating client for project '{project_id}' as '{account}'");
        let store = (self.factory)(&key)?;
        clients.insert(key, store.clone());
        Ok(store)
    }

    pub fn get(&self, account: &str, project_id: &str) -> Option<DocumentStoreArc> {
        self.clients()
            .get(&ClientKey::new(account, project_id))
            .cloned()
    }

    /// Forgets the client, e.g. after the account signed out.
    pub fn remove(&self, account: &str, project_id: &str) -> Option<DocumentStoreArc> {
        self.clients().remove(&ClientKey::new(account, project_id))
    }

    /// Forgets every client of `account`.
    pub fn remove_account(&self, account: &str) -> usize {
        let mut clients = self.clients();
        let before = clients.len();
        clients.retain(|key, _| key.account != account);
        before - clients.len()
    }

    pub fn len(&self) -> usize {
        self.clients().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firestore::error::FirestoreErrorCode;
    use crate::firestore::remote::datastore::{InMemoryDocumentStore, StaticTokenProvider};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn in_memory_registry(created: Arc<AtomicUsize>) -> ClientRegistry {
        ClientRegistry::new(move |key| {
            created.fetch_add(1, Ordering::SeqCst);
            let database_id = DatabaseId::for_project(&key.project_id)?;
            Ok(Arc::new(InMemoryDocumentStore::new(database_id)) as DocumentStoreArc)
        })
    }

    #[test]
    fn reuses_client_per_account_and_project() {
        let created = Arc::new(AtomicUsize::new(0));
        let registry = in_memory_registry(created.clone());

        let first = registry.get_or_create("ada@example.com", "alpha").unwrap();
        let again = registry.get_or_create("ada@example.com", "alpha").unwrap();
        assert!(Arc::ptr_eq(&first, &again));

        registry.get_or_create("ada@example.com", "beta").unwrap();
        registry.get_or_create("bob@example.com", "alpha").unwrap();
        assert_eq!(created.load(Ordering::SeqCst), 3);
        assert_eq!(registry.len(), 3);
        assert_eq!(first.database_id().project_id(), "alpha");
    }

    #[test]
    fn removing_an_account_drops_its_clients() {
        let registry = in_memory_registry(Arc::new(AtomicUsize::new(0)));
        registry.get_or_create("ada@example.com", "alpha").unwrap();
        registry.get_or_create("ada@example.com", "beta").unwrap();
        registry.get_or_create("bob@example.com", "alpha").unwrap();

        assert_eq!(registry.remove_account("ada@example.com"), 2);
        assert!(registry.get("ada@example.com", "alpha").is_none());
        assert!(registry.get("bob@example.com", "alpha").is_some());
    }

    #[test]
    fn factory_errors_are_not_cached() {
        let registry = ClientRegistry::http(|_| Arc::new(StaticTokenProvider::new("token")));
        let err = registry.get_or_create("ada@example.com", " ").err().unwrap();
        assert_eq!(err.code, FirestoreErrorCode::MissingProjectId);
        assert!(registry.is_empty());
    }
}
