//! Datastore registry
//!
//! Maps datastore identities to their configuration, collection descriptors,
//! and connection state. The registry is owned by the adapter instance, so
//! two adapters never share lifecycle state.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::collection::CollectionDescriptor;
use crate::config::DatastoreConfig;
use crate::error::{AdapterError, Result};
use crate::pool::ConnectionState;
use crate::sql::ident::{DEFAULT_SCHEMA, TableRef};

/// Everything the adapter knows about one registered datastore
pub(crate) struct DatastoreEntry {
    pub(crate) identity: String,
    pub(crate) collections: HashMap<String, CollectionDescriptor>,
    pub(crate) connections: ConnectionState,
}

impl DatastoreEntry {
    pub(crate) fn new(
        config: &DatastoreConfig,
        collections: HashMap<String, CollectionDescriptor>,
    ) -> Self {
        Self {
            identity: config.identity.clone(),
            collections,
            connections: ConnectionState::new(
                config.persistent,
                config.marshal(),
                config.pool.max,
            ),
        }
    }

    /// Descriptor for a registered collection
    pub(crate) fn collection(&self, collection: &str) -> Result<&CollectionDescriptor> {
        self.collections
            .get(collection)
            .ok_or_else(|| AdapterError::unknown_collection(&self.identity, collection))
    }

    /// Table reference for a collection name
    ///
    /// DDL and describe work on tables that may not be registered, so an
    /// unknown collection falls back to the default schema instead of
    /// erroring.
    pub(crate) fn table_ref(&self, collection: &str) -> TableRef {
        match self.collections.get(collection) {
            Some(descriptor) => descriptor.table_ref(collection),
            None => TableRef::new(DEFAULT_SCHEMA, collection),
        }
    }
}

/// Identity-keyed set of registered datastores
pub(crate) struct Registry {
    entries: RwLock<HashMap<String, Arc<DatastoreEntry>>>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub(crate) fn insert(&self, entry: Arc<DatastoreEntry>) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if entries.contains_key(&entry.identity) {
            return Err(AdapterError::DuplicateIdentity(entry.identity.clone()));
        }
        entries.insert(entry.identity.clone(), entry);
        Ok(())
    }

    pub(crate) fn get(&self, identity: &str) -> Result<Arc<DatastoreEntry>> {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(identity)
            .cloned()
            .ok_or_else(|| AdapterError::UnknownDatastore(identity.to_string()))
    }

    pub(crate) fn remove(&self, identity: &str) -> Option<Arc<DatastoreEntry>> {
        self.entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(identity)
    }

    /// Remove and return every entry, for full teardown
    pub(crate) fn drain(&self) -> Vec<Arc<DatastoreEntry>> {
        self.entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .drain()
            .map(|(_, entry)| entry)
            .collect()
    }
}
