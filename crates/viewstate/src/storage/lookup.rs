#![forbid(unsafe_code)]

//! Path → store registry, for sharing one [`LocalStorage`] between
//! unrelated view trees.

use ahash::AHashMap;
use tracing::{debug, error, warn};

use crate::error::{Result, StateError};
use crate::params::Params;
use crate::registry::SubscriberRegistry;
use crate::storage::LocalStorage;

/// Stores addressed by path.
#[derive(Debug)]
pub struct StorageLookup {
    registry: SubscriberRegistry,
    by_path: AHashMap<String, LocalStorage>,
}

impl StorageLookup {
    #[must_use]
    pub fn new(registry: &SubscriberRegistry) -> Self {
        Self {
            registry: registry.clone(),
            by_path: AHashMap::new(),
        }
    }

    /// The store at `path`, created from `params` if there is none yet.
    /// `params` is ignored for an existing store.
    pub fn get_or_create(&mut self, path: &str, params: &Params) -> LocalStorage {
        if let Some(existing) = self.by_path.get(path) {
            debug!(path, "returning existing storage");
            return existing.clone();
        }
        debug!(path, entries = params.len(), "creating storage");
        let storage = LocalStorage::from_params(&self.registry, params);
        self.by_path.insert(path.to_owned(), storage.clone());
        storage
    }

    /// Register an existing store under `path`.
    pub fn add(&mut self, path: &str, storage: LocalStorage) -> Result<()> {
        if self.by_path.contains_key(path) {
            error!(path, "storage path already taken");
            return Err(StateError::StorageExists {
                path: path.to_owned(),
            });
        }
        self.by_path.insert(path.to_owned(), storage);
        Ok(())
    }

    /// Clear and remove the store at `path`.
    ///
    /// Returns `false` if there is none, or if it still has subscribers (the
    /// store stays registered and untouched).
    pub fn delete(&mut self, path: &str) -> bool {
        let Some(storage) = self.by_path.get(path) else {
            warn!(path, "delete of unknown storage path");
            return false;
        };
        if !storage.about_to_be_deleted() {
            warn!(path, "storage still has subscribers; not deleted");
            return false;
        }
        self.by_path.remove(path);
        true
    }

    #[must_use]
    pub fn has(&self, path: &str) -> bool {
        self.by_path.contains_key(path)
    }

    #[must_use]
    pub fn get(&self, path: &str) -> Option<LocalStorage> {
        self.by_path.get(path).cloned()
    }
}
