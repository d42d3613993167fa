use crate::model::{NoteData, NoteId, RawNote};
use crate::storage::{KeyValueStore, StoreError, StoreKey};

use super::collection::PersistedCollection;

/// Raw notes in their stored, normalized form.
pub struct NoteRepository<S> {
    notes: PersistedCollection<RawNote, S>,
}

impl<S: KeyValueStore> NoteRepository<S> {
    pub fn load(store: S) -> Self {
        Self {
            notes: PersistedCollection::load(store, StoreKey::Notes),
        }
    }

    pub fn notes(&self) -> &[RawNote] {
        self.notes.items()
    }

    pub fn note(&self, id: &NoteId) -> Option<&RawNote> {
        self.notes.get(id)
    }

    pub fn version(&self) -> u64 {
        self.notes.version()
    }

    pub fn create_note(&mut self, data: NoteData) -> NoteId {
        let id = NoteId::generate();
        let tag_ids = data.tag_ids();
        tracing::debug!(%id, tags = tag_ids.len(), "note created");
        self.notes.push(RawNote {
            id: id.clone(),
            title: data.title,
            markdown: data.markdown,
            tag_ids,
        });
        id
    }

    pub fn update_note(&mut self, id: &NoteId, data: NoteData) -> bool {
        let tag_ids = data.tag_ids();
        let updated = self.notes.update(id, |note| {
            note.title = data.title;
            note.markdown = data.markdown;
            note.tag_ids = tag_ids;
        });
        tracing::debug!(%id, updated, "note update");
        updated
    }

    /// Replaces title and markdown, leaving the stored `tag_ids` untouched.
    pub fn update_note_text(
        &mut self,
        id: &NoteId,
        title: impl Into<String>,
        markdown: impl Into<String>,
    ) -> bool {
        let (title, markdown) = (title.into(), markdown.into());
        let updated = self.notes.update(id, |note| {
            note.title = title;
            note.markdown = markdown;
        });
        tracing::debug!(%id, updated, "note text update");
        updated
    }

    pub fn delete_note(&mut self, id: &NoteId) -> bool {
        let removed = self.notes.remove(id);
        tracing::debug!(%id, removed, "note delete");
        removed
    }

    pub fn persistence_error(&self) -> Option<&StoreError> {
        self.notes.persistence_error()
    }

    pub fn take_persistence_error(&mut self) -> Option<StoreError> {
        self.notes.take_persistence_error()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::model::{Tag, TagId};
    use crate::storage::MemoryStore;

    fn work() -> Tag {
        Tag {
            id: TagId::from("t1"),
            label: "work".into(),
        }
    }

    #[test]
    fn create_stores_only_tag_ids() {
        let mut repo = NoteRepository::load(MemoryStore::new());
        let id = repo.create_note(NoteData::new("Plan", "...", vec![work()]));

        let stored = repo.note(&id).expect("note stored");
        assert_eq!(stored.title, "Plan");
        assert_eq!(stored.tag_ids, vec![TagId::from("t1")]);
    }

    #[test]
    fn duplicate_tags_are_kept_in_tag_ids() {
        let mut repo = NoteRepository::load(MemoryStore::new());
        let id = repo.create_note(NoteData::new("Dup", "", vec![work(), work()]));
        assert_eq!(repo.note(&id).expect("note").tag_ids.len(), 2);
    }

    #[test]
    fn update_replaces_fields_of_matching_note_only() {
        let mut repo = NoteRepository::load(MemoryStore::new());
        let first = repo.create_note(NoteData::new("First", "a", vec![work()]));
        let second = repo.create_note(NoteData::new("Second", "b", Vec::new()));

        assert!(repo.update_note(&first, NoteData::new("First v2", "a2", Vec::new())));

        let notes = repo.notes();
        assert_eq!(notes[0].id, first);
        assert_eq!(notes[0].title, "First v2");
        assert_eq!(notes[0].markdown, "a2");
        assert!(notes[0].tag_ids.is_empty());
        assert_eq!(notes[1].id, second);
        assert_eq!(notes[1].title, "Second");
    }

    #[test]
    fn text_update_keeps_every_stored_tag_id() {
        let mut repo = NoteRepository::load(MemoryStore::new());
        let id = repo.create_note(NoteData::new("Plan", "a", vec![work()]));
        let before = repo.version();

        assert!(repo.update_note_text(&id, "Plan v2", "b"));
        let stored = repo.note(&id).expect("note");
        assert_eq!(stored.title, "Plan v2");
        assert_eq!(stored.markdown, "b");
        assert_eq!(stored.tag_ids, vec![TagId::from("t1")]);
        assert_eq!(repo.version(), before + 1);
        assert!(!repo.update_note_text(&NoteId::from("missing"), "x", ""));
        assert_eq!(repo.version(), before + 1);
    }

    #[test]
    fn unknown_ids_are_ignored() {
        let mut repo = NoteRepository::load(MemoryStore::new());
        repo.create_note(NoteData::new("Only", "", Vec::new()));
        let missing = NoteId::from("missing");

        assert!(!repo.update_note(&missing, NoteData::new("x", "", Vec::new())));
        assert!(!repo.delete_note(&missing));
        assert_eq!(repo.notes().len(), 1);
        assert_eq!(repo.version(), 1);
    }

    #[test]
    fn ids_stay_unique_across_mixed_operations() {
        let mut repo = NoteRepository::load(MemoryStore::new());
        let mut created = Vec::new();
        for round in 0..50 {
            let id = repo.create_note(NoteData::new(format!("note {round}"), "", Vec::new()));
            created.push(id);
            if round % 3 == 0 {
                repo.update_note(
                    &created[round / 2],
                    NoteData::new("edited", "", vec![work()]),
                );
            }
            if round % 5 == 0 {
                repo.delete_note(&created[round / 3]);
            }
        }

        let ids: HashSet<&NoteId> = repo.notes().iter().map(|note| &note.id).collect();
        assert_eq!(ids.len(), repo.notes().len());
    }

    #[test]
    fn notes_survive_reload_in_order() {
        let store = MemoryStore::new();
        let mut repo = NoteRepository::load(store.clone());
        repo.create_note(NoteData::new("one", "", Vec::new()));
        repo.create_note(NoteData::new("two", "", vec![work()]));
        repo.create_note(NoteData::new("three", "", Vec::new()));

        let reloaded = NoteRepository::load(store);
        assert_eq!(reloaded.notes(), repo.notes());
    }
}
