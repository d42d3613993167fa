use std::collections::HashSet;
use std::sync::Arc;

use crate::model::{Note, RawNote, Tag, TagId};

mod selector;

pub use selector::{select_current, NotFound};

/// Joins raw notes with the tag collection.
///
/// Each note's tags follow the order of `tags`, not of `tag_ids`. Ids that
/// resolve to nothing are dropped.
pub fn project(raw_notes: &[RawNote], tags: &[Tag]) -> Vec<Note> {
    raw_notes
        .iter()
        .map(|raw| {
            let wanted: HashSet<&TagId> = raw.tag_ids.iter().collect();
            Note {
                id: raw.id.clone(),
                title: raw.title.clone(),
                markdown: raw.markdown.clone(),
                tags: tags
                    .iter()
                    .filter(|tag| wanted.contains(&tag.id))
                    .cloned()
                    .collect(),
            }
        })
        .collect()
}

/// Last projection, keyed by the versions of both source collections.
#[derive(Debug, Default)]
pub struct Projection {
    cached: Option<CachedView>,
}

#[derive(Debug)]
struct CachedView {
    notes_version: u64,
    tags_version: u64,
    view: Arc<[Note]>,
}

impl Projection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached view when neither version moved, recomputing otherwise.
    pub fn view(
        &mut self,
        raw_notes: &[RawNote],
        notes_version: u64,
        tags: &[Tag],
        tags_version: u64,
    ) -> Arc<[Note]> {
        if let Some(cached) = &self.cached {
            if cached.notes_version == notes_version && cached.tags_version == tags_version {
                return Arc::clone(&cached.view);
            }
        }
        tracing::trace!(notes_version, tags_version, "recomputing note projection");
        let view: Arc<[Note]> = project(raw_notes, tags).into();
        self.cached = Some(CachedView {
            notes_version,
            tags_version,
            view: Arc::clone(&view),
        });
        view
    }
}
