use crate::model::{Tag, TagId};
use crate::storage::{KeyValueStore, StoreError, StoreKey};

use super::collection::PersistedCollection;

pub struct TagRepository<S> {
    tags: PersistedCollection<Tag, S>,
}

impl<S: KeyValueStore> TagRepository<S> {
    pub fn load(store: S) -> Self {
        Self {
            tags: PersistedCollection::load(store, StoreKey::Tags),
        }
    }

    pub fn tags(&self) -> &[Tag] {
        self.tags.items()
    }

    pub fn tag(&self, id: &TagId) -> Option<&Tag> {
        self.tags.get(id)
    }

    pub fn version(&self) -> u64 {
        self.tags.version()
    }

    pub fn add_tag(&mut self, label: impl Into<String>) -> Tag {
        let tag = Tag {
            id: TagId::generate(),
            label: label.into(),
        };
        tracing::debug!(id = %tag.id, label = %tag.label, "tag added");
        self.tags.push(tag.clone());
        tag
    }

    pub fn update_tag(&mut self, id: &TagId, label: impl Into<String>) -> bool {
        let label = label.into();
        let updated = self.tags.update(id, |tag| tag.label = label);
        tracing::debug!(%id, updated, "tag label update");
        updated
    }

    /// Removes the tag record only. Notes keep referencing its id.
    pub fn delete_tag(&mut self, id: &TagId) -> bool {
        let removed = self.tags.remove(id);
        tracing::debug!(%id, removed, "tag delete");
        removed
    }

    pub fn persistence_error(&self) -> Option<&StoreError> {
        self.tags.persistence_error()
    }

    pub fn take_persistence_error(&mut self) -> Option<StoreError> {
        self.tags.take_persistence_error()
    }
}
