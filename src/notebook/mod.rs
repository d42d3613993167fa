//! Root state: both repositories plus the projection derived from them.
//!
//! Notes and tags are co-mutated. Every read of the joined view goes through
//! [`Notebook::notes`], which re-projects whenever either collection's version
//! has moved since the last read.

use std::sync::Arc;

use crate::model::{Note, NoteData, NoteId, RawNote, Tag, TagId};
use crate::search::NoteFilter;
use crate::storage::{KeyValueStore, StoreError};
use crate::view::{select_current, NotFound, Projection};

mod collection;
mod notes;
mod tags;

pub use notes::NoteRepository;
pub use tags::TagRepository;

pub struct Notebook<S> {
    notes: NoteRepository<S>,
    tags: TagRepository<S>,
    projection: Projection,
}

impl<S: KeyValueStore + Clone> Notebook<S> {
    pub fn load(store: S) -> Self {
        Self {
            tags: TagRepository::load(store.clone()),
            notes: NoteRepository::load(store),
            projection: Projection::new(),
        }
    }
}

impl<S: KeyValueStore> Notebook<S> {
    pub fn tags(&self) -> &[Tag] {
        self.tags.tags()
    }

    pub fn tag(&self, id: &TagId) -> Option<&Tag> {
        self.tags.tag(id)
    }

    pub fn raw_notes(&self) -> &[RawNote] {
        self.notes.notes()
    }

    /// The joined view. Repeated calls without mutations in between return the same `Arc`.
    pub fn notes(&mut self) -> Arc<[Note]> {
        self.projection.view(
            self.notes.notes(),
            self.notes.version(),
            self.tags.tags(),
            self.tags.version(),
        )
    }

    pub fn filter(&mut self, filter: &NoteFilter) -> Vec<Note> {
        let view = self.notes();
        filter.apply(&view).into_iter().cloned().collect()
    }

    pub fn select(&mut self, id: &str) -> Result<Note, NotFound> {
        let view = self.notes();
        select_current(&view, id).cloned()
    }

    pub fn add_tag(&mut self, label: impl Into<String>) -> Tag {
        self.tags.add_tag(label)
    }

    pub fn update_tag(&mut self, id: &TagId, label: impl Into<String>) -> bool {
        self.tags.update_tag(id, label)
    }

    pub fn delete_tag(&mut self, id: &TagId) -> bool {
        self.tags.delete_tag(id)
    }

    pub fn create_note(&mut self, data: NoteData) -> NoteId {
        self.notes.create_note(data)
    }

    pub fn update_note(&mut self, id: &NoteId, data: NoteData) -> bool {
        self.notes.update_note(id, data)
    }

    pub fn update_note_text(&mut self, id: &NoteId, title: &str, markdown: &str) -> bool {
        self.notes.update_note_text(id, title, markdown)
    }

    pub fn delete_note(&mut self, id: &NoteId) -> bool {
        self.notes.delete_note(id)
    }

    /// Number of raw notes whose `tag_ids` mention `id`, resolved or not.
    pub fn tag_usage(&self, id: &TagId) -> usize {
        self.notes
            .notes()
            .iter()
            .filter(|note| note.tag_ids.contains(id))
            .count()
    }

    pub fn persistence_error(&self) -> Option<&StoreError> {
        self.notes
            .persistence_error()
            .or_else(|| self.tags.persistence_error())
    }

    pub fn take_persistence_errors(&mut self) -> Vec<StoreError> {
        self.notes
            .take_persistence_error()
            .into_iter()
            .chain(self.tags.take_persistence_error())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::parse_query;
    use crate::storage::{JsonFileStore, MemoryStore};
    use assert_matches::assert_matches;
    use tempfile::TempDir;

    #[test]
    fn deleting_a_tag_leaves_orphan_reference() {
        let mut book = Notebook::load(MemoryStore::new());
        let work = book.add_tag("work");
        let note_id = book.create_note(NoteData::new("Plan", "...", vec![work.clone()]));

        assert_eq!(
            book.raw_notes()[0].tag_ids,
            vec![work.id.clone()],
            "only the id is stored"
        );
        let projected = book.select(note_id.as_str()).expect("note projected");
        assert_eq!(projected.tags, vec![work.clone()]);

        assert!(book.delete_tag(&work.id));
        let projected = book.select(note_id.as_str()).expect("note still projected");
        assert!(projected.tags.is_empty());
        assert_eq!(book.raw_notes()[0].tag_ids, vec![work.id.clone()]);
        assert_eq!(book.tag_usage(&work.id), 1);
        assert!(book.tag(&work.id).is_none());
    }

    #[test]
    fn view_is_stable_until_a_mutation() {
        let mut book = Notebook::load(MemoryStore::new());
        book.create_note(NoteData::new("one", "", Vec::new()));

        let first = book.notes();
        let second = book.notes();
        assert!(Arc::ptr_eq(&first, &second));

        book.add_tag("fresh");
        let after_tag = book.notes();
        assert!(!Arc::ptr_eq(&first, &after_tag));

        let missing = NoteId::from("missing");
        book.delete_note(&missing);
        assert!(Arc::ptr_eq(&after_tag, &book.notes()));
    }

    #[test]
    fn tag_label_change_shows_in_projection() {
        let mut book = Notebook::load(MemoryStore::new());
        let tag = book.add_tag("draft");
        let id = book.create_note(NoteData::new("Essay", "", vec![tag.clone()]));

        book.update_tag(&tag.id, "final");
        let note = book.select(id.as_str()).expect("note");
        assert_eq!(note.tags[0].label, "final");
    }

    #[test]
    fn filter_runs_against_projected_tags() -> anyhow::Result<()> {
        let mut book = Notebook::load(MemoryStore::new());
        let a = book.add_tag("a");
        let b = book.add_tag("b");
        book.create_note(NoteData::new("Only A", "", vec![a.clone()]));
        book.create_note(NoteData::new("Both", "", vec![b.clone(), a.clone()]));
        book.create_note(NoteData::new("Both again", "", vec![a, b.clone()]));

        let filter = parse_query("both tag:a tag:b").resolve(book.tags())?;
        let titles: Vec<String> = book
            .filter(&filter)
            .into_iter()
            .map(|note| note.title)
            .collect();
        assert_eq!(titles, vec!["Both", "Both again"]);

        book.delete_tag(&b.id);
        let after = parse_query("tag:a").resolve(book.tags())?;
        assert_eq!(book.filter(&after).len(), 3);
        Ok(())
    }

    #[test]
    fn select_after_delete_is_not_found() {
        let mut book = Notebook::load(MemoryStore::new());
        let id = book.create_note(NoteData::new("Short lived", "", Vec::new()));
        book.delete_note(&id);
        assert_matches!(book.select(id.as_str()), Err(NotFound { .. }));
    }

    #[test]
    fn reload_from_files_restores_both_collections() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let store = JsonFileStore::new(temp.path());
        let (tag, note_id) = {
            let mut book = Notebook::load(store.clone());
            let tag = book.add_tag("work");
            let note_id = book.create_note(NoteData::new("Plan", "body", vec![tag.clone()]));
            (tag, note_id)
        };

        let mut book = Notebook::load(store);
        assert_eq!(book.tags(), &[tag.clone()]);
        let note = book.select(note_id.as_str())?;
        assert_eq!(note.markdown, "body");
        assert_eq!(note.tags, vec![tag]);
        Ok(())
    }

    #[test]
    fn failed_save_keeps_memory_state_and_reports() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let blocker = temp.path().join("blocker");
        std::fs::write(&blocker, b"")?;
        let mut book = Notebook::load(JsonFileStore::new(&blocker));

        let id = book.create_note(NoteData::new("Unsaved", "", Vec::new()));
        assert!(book.select(id.as_str()).is_ok());
        assert_matches!(book.persistence_error(), Some(StoreError::Io { .. }));

        let errors = book.take_persistence_errors();
        assert_eq!(errors.len(), 1);
        assert!(book.persistence_error().is_none());
        Ok(())
    }
}
