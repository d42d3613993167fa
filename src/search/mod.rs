use thiserror::Error;

use crate::model::{Note, Tag};

/// A title query plus a conjunctive tag selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteFilter {
    pub title_query: String,
    pub selected_tags: Vec<Tag>,
}

impl NoteFilter {
    pub fn new(title_query: impl Into<String>, selected_tags: Vec<Tag>) -> Self {
        Self {
            title_query: title_query.into(),
            selected_tags,
        }
    }

    pub fn matches(&self, note: &Note) -> bool {
        self.title_matches(note) && self.tags_match(note)
    }

    /// Matching notes in input order.
    pub fn apply<'a>(&self, notes: &'a [Note]) -> Vec<&'a Note> {
        notes.iter().filter(|note| self.matches(note)).collect()
    }

    fn title_matches(&self, note: &Note) -> bool {
        self.title_query.is_empty()
            || note
                .title
                .to_lowercase()
                .contains(&self.title_query.to_lowercase())
    }

    // every selected tag must be present; extra note tags are irrelevant
    fn tags_match(&self, note: &Note) -> bool {
        self.selected_tags.iter().all(|tag| note.has_tag(&tag.id))
    }
}

pub fn filter<'a>(notes: &'a [Note], title_query: &str, selected_tags: &[Tag]) -> Vec<&'a Note> {
    NoteFilter::new(title_query, selected_tags.to_vec()).apply(notes)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown tag '{0}'")]
pub struct UnknownTag(pub String);

/// Parsed form of a free-text query such as `plan tag:work`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    pub title: String,
    pub tags: Vec<String>,
}

impl SearchQuery {
    /// Resolves tag selectors against `available`, producing a filter.
    pub fn resolve(&self, available: &[Tag]) -> Result<NoteFilter, UnknownTag> {
        let mut selected: Vec<Tag> = Vec::with_capacity(self.tags.len());
        for selector in &self.tags {
            let tag = find_tag(available, selector).ok_or_else(|| UnknownTag(selector.clone()))?;
            if !selected.iter().any(|existing| existing.id == tag.id) {
                selected.push(tag.clone());
            }
        }
        Ok(NoteFilter::new(self.title.clone(), selected))
    }
}

pub fn parse_query(input: &str) -> SearchQuery {
    let mut query = SearchQuery::default();
    let mut title_terms = Vec::new();
    for raw in input.split_whitespace() {
        if let Some(tag) = raw.strip_prefix("tag:") {
            if let Some(value) = sanitize_term(tag) {
                query.tags.push(value);
            }
            continue;
        }
        title_terms.push(raw);
    }
    query.title = title_terms.join(" ");
    query
}

/// Finds a tag by exact id, then by case-insensitive label in collection order.
pub fn find_tag<'a>(tags: &'a [Tag], selector: &str) -> Option<&'a Tag> {
    tags.iter()
        .find(|tag| tag.id.as_str() == selector)
        .or_else(|| {
            tags.iter()
                .find(|tag| tag.label.to_lowercase() == selector.to_lowercase())
        })
}

fn sanitize_term(raw: &str) -> Option<String> {
    let term = raw.trim();
    if term.is_empty() {
        None
    } else {
        Some(term.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NoteId, TagId};
    use assert_matches::assert_matches;

    fn tag(id: &str) -> Tag {
        Tag {
            id: TagId::from(id),
            label: id.to_uppercase(),
        }
    }

    fn note(id: &str, title: &str, tags: &[&str]) -> Note {
        Note {
            id: NoteId::from(id),
            title: title.into(),
            markdown: String::new(),
            tags: tags.iter().map(|id| tag(id)).collect(),
        }
    }

    fn ids(notes: &[&Note]) -> Vec<String> {
        notes.iter().map(|note| note.id.to_string()).collect()
    }

    #[test]
    fn empty_filter_returns_everything_in_order() {
        let notes = vec![note("3", "c", &[]), note("1", "a", &["a"]), note("2", "b", &[])];
        assert_eq!(ids(&filter(&notes, "", &[])), vec!["3", "1", "2"]);
    }

    #[test]
    fn title_match_is_case_insensitive_substring() {
        let notes = vec![
            note("1", "Weekly Plan", &[]),
            note("2", "Shopping", &[]),
            note("3", "PLANets", &[]),
        ];
        assert_eq!(ids(&filter(&notes, "plan", &[])), vec!["1", "3"]);
    }

    #[test]
    fn whitespace_query_is_not_treated_as_empty() {
        let notes = vec![note("1", "Plan", &[]), note("2", "Two words", &[])];
        assert_eq!(ids(&filter(&notes, " ", &[])), vec!["2"]);
    }

    #[test]
    fn selected_tags_are_conjunctive() {
        let notes = vec![
            note("only-a", "x", &["a"]),
            note("abc", "x", &["a", "b", "c"]),
            note("ba", "x", &["b", "a"]),
            note("none", "x", &[]),
        ];
        let selected = vec![tag("a"), tag("b")];
        assert_eq!(ids(&filter(&notes, "", &selected)), vec!["abc", "ba"]);
    }

    #[test]
    fn both_predicates_must_pass() {
        let notes = vec![
            note("1", "Plan", &["a"]),
            note("2", "Plan", &[]),
            note("3", "Other", &["a"]),
        ];
        assert_eq!(ids(&filter(&notes, "plan", &[tag("a")])), vec!["1"]);
    }

    #[test]
    fn parse_query_splits_tags_from_title_terms() {
        let query = parse_query("  weekly tag:work   plan tag:  tag:Home ");
        assert_eq!(query.title, "weekly plan");
        assert_eq!(query.tags, vec!["work", "Home"]);
    }

    #[test]
    fn resolve_prefers_id_then_label() {
        let available = vec![
            Tag {
                id: TagId::from("t1"),
                label: "work".into(),
            },
            Tag {
                id: TagId::from("work"),
                label: "oddly named".into(),
            },
            Tag {
                id: TagId::from("t3"),
                label: "Home".into(),
            },
        ];
        let filter = parse_query("tag:work tag:home tag:t3")
            .resolve(&available)
            .expect("tags resolve");
        let selected: Vec<&str> = filter.selected_tags.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(selected, vec!["work", "t3"]);
    }

    #[test]
    fn resolve_reports_unknown_selector() {
        let result = parse_query("tag:missing").resolve(&[tag("a")]);
        assert_matches!(result, Err(UnknownTag(name)) if name == "missing");
    }
}
