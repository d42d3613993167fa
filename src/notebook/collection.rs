use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::model::Identified;
use crate::storage::{KeyValueStore, StoreError, StoreKey};

/// An insertion-ordered collection mirrored to one store key.
///
/// Every effective mutation bumps `version` and rewrites the whole value. A
/// failed write keeps the in-memory items and is remembered as
/// `persistence_error` until taken.
#[derive(Debug)]
pub struct PersistedCollection<T, S> {
    store: S,
    key: StoreKey,
    items: Vec<T>,
    version: u64,
    persistence_error: Option<StoreError>,
}

impl<T, S> PersistedCollection<T, S>
where
    T: Identified + Serialize + DeserializeOwned,
    S: KeyValueStore,
{
    pub fn load(store: S, key: StoreKey) -> Self {
        let items: Vec<T> = store.load(key.as_ref(), Vec::new());
        tracing::info!(%key, count = items.len(), "collection loaded");
        Self {
            store,
            key,
            items,
            version: 0,
            persistence_error: None,
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn get(&self, id: &T::Id) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn push(&mut self, item: T) {
        self.items.push(item);
        self.commit();
    }

    /// Applies `edit` to the first item with `id`. Returns whether one matched.
    pub fn update(&mut self, id: &T::Id, edit: impl FnOnce(&mut T)) -> bool {
        let Some(item) = self.items.iter_mut().find(|item| item.id() == id) else {
            return false;
        };
        edit(item);
        self.commit();
        true
    }

    /// Removes every item with `id`. Returns whether any was removed.
    pub fn remove(&mut self, id: &T::Id) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id() != id);
        if self.items.len() == before {
            return false;
        }
        self.commit();
        true
    }

    pub fn persistence_error(&self) -> Option<&StoreError> {
        self.persistence_error.as_ref()
    }

    pub fn take_persistence_error(&mut self) -> Option<StoreError> {
        self.persistence_error.take()
    }

    fn commit(&mut self) {
        self.version += 1;
        match self.store.save(self.key.as_ref(), &self.items) {
            Ok(()) => self.persistence_error = None,
            Err(err) => {
                tracing::warn!(%err, key = %self.key, "persisting collection failed, keeping in-memory state");
                self.persistence_error = Some(err);
            }
        }
    }
}
