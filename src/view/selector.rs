use thiserror::Error;

use crate::model::Note;

/// The requested note is not in the current view; callers fall back to the list.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("note {id} not found")]
pub struct NotFound {
    pub id: String,
}

pub fn select_current<'a>(notes: &'a [Note], id: &str) -> Result<&'a Note, NotFound> {
    notes
        .iter()
        .find(|note| note.id.as_str() == id)
        .ok_or_else(|| NotFound { id: id.to_owned() })
}
