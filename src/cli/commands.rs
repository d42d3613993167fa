use std::fmt::Write as _;
use std::io::{self, Read};

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};

use crate::config::{AppConfig, DisplayOptions};
use crate::model::{Note, NoteData, NoteId, Tag};
use crate::notebook::Notebook;
use crate::search::{find_tag, parse_query};
use crate::storage::KeyValueStore;
use crate::view::NotFound;

#[derive(Args, Debug, Clone)]
pub struct NewArgs {
    /// Title for the note (prompted if omitted)
    #[arg()]
    pub title: Option<String>,
    /// Provide the note body inline. If omitted, reads from stdin.
    #[arg(long)]
    pub body: Option<String>,
    /// Tag label or id; unknown labels become new tags
    #[arg(long = "tag")]
    pub tags: Vec<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    /// Title text to match plus optional tag:<label> tokens (all must match)
    #[arg()]
    pub query: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ShowArgs {
    /// Note identifier
    pub id: String,
}

#[derive(Args, Debug, Clone)]
pub struct EditArgs {
    /// Note identifier
    pub id: String,
    /// Replace the title
    #[arg(long)]
    pub title: Option<String>,
    /// Replace the body
    #[arg(long)]
    pub body: Option<String>,
    /// Replace the tag set with these labels or ids
    #[arg(long = "tag")]
    pub tags: Vec<String>,
    /// Drop all tags (combined with --tag, only the given tags remain)
    #[arg(long)]
    pub clear_tags: bool,
}

#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    /// Note identifier
    pub id: String,
}

#[derive(Subcommand, Debug, Clone)]
pub enum TagCommand {
    /// Create a tag
    Add(TagAddArgs),
    /// Change a tag's label
    Rename(TagRenameArgs),
    /// Delete a tag; notes keep their reference to it
    Delete(TagDeleteArgs),
    /// List all tags with usage counts
    List,
}

#[derive(Args, Debug, Clone)]
pub struct TagAddArgs {
    /// Label for the new tag (whitespace trimmed)
    pub label: String,
}

#[derive(Args, Debug, Clone)]
pub struct TagRenameArgs {
    /// Tag id or label
    pub tag: String,
    /// New label
    pub label: String,
}

#[derive(Args, Debug, Clone)]
pub struct TagDeleteArgs {
    /// Tag id or label
    pub tag: String,
}

#[derive(Args, Debug, Clone)]
pub struct TagArgs {
    #[command(subcommand)]
    pub command: TagCommand,
}

pub fn new_note<S: KeyValueStore>(notebook: &mut Notebook<S>, args: NewArgs) -> Result<String> {
    let title = match args.title {
        Some(t) => t,
        None => prompt("Title")?,
    };
    let body = match args.body {
        Some(body) => body,
        None => read_stdin()?.unwrap_or_default(),
    };
    run_new(notebook, &title, &body, &args.tags)
}

fn run_new<S: KeyValueStore>(
    notebook: &mut Notebook<S>,
    title: &str,
    body: &str,
    tag_selectors: &[String],
) -> Result<String> {
    let title = title.trim();
    if title.is_empty() {
        bail!("note title cannot be empty");
    }
    let tags = resolve_or_create_tags(notebook, tag_selectors);
    let id = notebook.create_note(NoteData::new(title, body, tags));
    Ok(format!("Created note {id}\n"))
}

pub fn list_notes<S: KeyValueStore>(
    config: &AppConfig,
    notebook: &mut Notebook<S>,
    args: ListArgs,
) -> Result<String> {
    let query = parse_query(&args.query.join(" "));
    let filter = query
        .resolve(notebook.tags())
        .context("resolving tag filter")?;
    let matches = notebook.filter(&filter);
    tracing::debug!(
        title = %filter.title_query,
        tags = filter.selected_tags.len(),
        matches = matches.len(),
        "notes filtered"
    );
    Ok(format_note_list(
        &matches,
        config.search.max_results,
        &config.display,
    ))
}

pub fn show_note<S: KeyValueStore>(
    config: &AppConfig,
    notebook: &mut Notebook<S>,
    args: ShowArgs,
) -> Result<String> {
    match notebook.select(&args.id) {
        Ok(note) => Ok(format_note_detail(&note, &config.display)),
        Err(missing) => fall_back_to_list(config, notebook, missing),
    }
}

pub fn edit_note<S: KeyValueStore>(
    config: &AppConfig,
    notebook: &mut Notebook<S>,
    args: EditArgs,
) -> Result<String> {
    let note = match notebook.select(&args.id) {
        Ok(note) => note,
        Err(missing) => return fall_back_to_list(config, notebook, missing),
    };

    let mut data = NoteData::from(&note);
    if let Some(title) = args.title {
        let title = title.trim();
        if title.is_empty() {
            bail!("note title cannot be empty");
        }
        data.title = title.to_owned();
    }
    if let Some(body) = args.body {
        data.markdown = body;
    }
    // without a tag change, stored ids (orphans included) stay as they are
    if args.clear_tags || !args.tags.is_empty() {
        data.tags = resolve_or_create_tags(notebook, &args.tags);
        notebook.update_note(&note.id, data);
    } else {
        notebook.update_note_text(&note.id, &data.title, &data.markdown);
    }
    Ok(format!("Updated note {}\n", note.id))
}

pub fn delete_note<S: KeyValueStore>(
    notebook: &mut Notebook<S>,
    args: DeleteArgs,
) -> Result<String> {
    let id = NoteId::from(args.id);
    if notebook.delete_note(&id) {
        Ok(format!("Deleted note {id}\n"))
    } else {
        Ok(format!("note {id} not found; nothing deleted\n"))
    }
}

pub fn handle_tag_command<S: KeyValueStore>(
    notebook: &mut Notebook<S>,
    args: TagArgs,
) -> Result<String> {
    match args.command {
        TagCommand::Add(args) => tag_add(notebook, args),
        TagCommand::Rename(args) => tag_rename(notebook, args),
        TagCommand::Delete(args) => tag_delete(notebook, args),
        TagCommand::List => Ok(tag_list(notebook)),
    }
}

/// Surfaces any save failure from this run as the command's error.
pub fn ensure_persisted<S: KeyValueStore>(notebook: &mut Notebook<S>) -> Result<()> {
    let mut errors = notebook.take_persistence_errors().into_iter();
    let Some(first) = errors.next() else {
        return Ok(());
    };
    for other in errors {
        tracing::error!(%other, "additional save failure");
    }
    Err(anyhow::Error::new(first).context("changes from this run were not saved"))
}

fn tag_add<S: KeyValueStore>(notebook: &mut Notebook<S>, args: TagAddArgs) -> Result<String> {
    let label = args.label.trim();
    if label.is_empty() {
        bail!("tag cannot be empty");
    }
    let tag = notebook.add_tag(label);
    Ok(format!("Created tag '{}' ({})\n", tag.label, tag.id))
}

fn tag_rename<S: KeyValueStore>(
    notebook: &mut Notebook<S>,
    args: TagRenameArgs,
) -> Result<String> {
    let label = args.label.trim();
    if label.is_empty() {
        bail!("tag label cannot be empty");
    }
    let Some(tag) = find_tag(notebook.tags(), args.tag.trim()).cloned() else {
        return Ok(format!("tag '{}' not found; nothing renamed\n", args.tag));
    };
    notebook.update_tag(&tag.id, label);
    Ok(format!("Renamed tag '{}' to '{label}'\n", tag.label))
}

fn tag_delete<S: KeyValueStore>(
    notebook: &mut Notebook<S>,
    args: TagDeleteArgs,
) -> Result<String> {
    let Some(tag) = find_tag(notebook.tags(), args.tag.trim()).cloned() else {
        return Ok(format!("tag '{}' not found; nothing deleted\n", args.tag));
    };
    notebook.delete_tag(&tag.id);
    let referencing = notebook.tag_usage(&tag.id);
    let mut out = format!("Deleted tag '{}' ({})\n", tag.label, tag.id);
    if referencing > 0 {
        let _ = writeln!(
            &mut out,
            "{referencing} note{} still reference{} its id",
            plural(referencing),
            if referencing == 1 { "s" } else { "" }
        );
    }
    Ok(out)
}

fn tag_list<S: KeyValueStore>(notebook: &Notebook<S>) -> String {
    if notebook.tags().is_empty() {
        return "(no tags)\n".to_string();
    }
    let mut out = String::new();
    for tag in notebook.tags() {
        let uses = notebook.tag_usage(&tag.id);
        let _ = writeln!(
            &mut out,
            "{}  {}  ({uses} note{})",
            tag.id,
            tag.label,
            plural(uses)
        );
    }
    out
}

fn fall_back_to_list<S: KeyValueStore>(
    config: &AppConfig,
    notebook: &mut Notebook<S>,
    missing: NotFound,
) -> Result<String> {
    tracing::info!(id = %missing.id, "requested note is gone, showing list");
    let mut out = format!("{missing}; showing all notes\n\n");
    out.push_str(&list_notes(config, notebook, ListArgs::default())?);
    Ok(out)
}

/// Maps selectors to tags, creating a tag for every selector that matches none.
fn resolve_or_create_tags<S: KeyValueStore>(
    notebook: &mut Notebook<S>,
    selectors: &[String],
) -> Vec<Tag> {
    let mut tags: Vec<Tag> = Vec::with_capacity(selectors.len());
    for selector in selectors {
        let selector = selector.trim();
        if selector.is_empty() {
            continue;
        }
        let tag = match find_tag(notebook.tags(), selector) {
            Some(existing) => existing.clone(),
            None => notebook.add_tag(selector),
        };
        if !tags.iter().any(|known| known.id == tag.id) {
            tags.push(tag);
        }
    }
    tags
}

fn format_note_list(notes: &[Note], limit: usize, display: &DisplayOptions) -> String {
    if notes.is_empty() {
        return "No notes found.\n".to_string();
    }
    let mut out = String::new();
    for note in notes.iter().take(limit) {
        let _ = writeln!(&mut out, "{}  {}", note.id, note.title);
        if !note.tags.is_empty() {
            let _ = writeln!(&mut out, "    tags    {}", format_tags(&note.tags, display));
        }
        if let Some(preview) = build_preview(&note.markdown, display.preview_chars) {
            let _ = writeln!(&mut out, "    {preview}");
        }
        out.push('\n');
    }
    if notes.len() > limit {
        let _ = writeln!(&mut out, "({} more not shown)", notes.len() - limit);
    }
    out
}

fn format_note_detail(note: &Note, display: &DisplayOptions) -> String {
    let mut out = String::new();
    let _ = writeln!(&mut out, "{}", note.title);
    let _ = writeln!(&mut out, "id      {}", note.id);
    if !note.tags.is_empty() {
        let _ = writeln!(&mut out, "tags    {}", format_tags(&note.tags, display));
    }
    out.push('\n');
    out.push_str(&note.markdown);
    if !note.markdown.ends_with('\n') {
        out.push('\n');
    }
    out
}

fn format_tags(tags: &[Tag], display: &DisplayOptions) -> String {
    tags.iter()
        .map(|tag| {
            if display.show_tag_ids {
                format!("#{}({})", tag.label, tag.id)
            } else {
                format!("#{}", tag.label)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn build_preview(markdown: &str, max_chars: usize) -> Option<String> {
    if max_chars == 0 {
        return None;
    }
    let segments: Vec<&str> = markdown
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .take(2)
        .collect();
    if segments.is_empty() {
        None
    } else {
        Some(segments.join(" ").chars().take(max_chars).collect())
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

fn prompt(label: &str) -> Result<String> {
    use std::io::Write;
    let mut stdout = io::stdout();
    write!(stdout, "{}: ", label)?;
    stdout.flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim_end().to_owned())
}

fn read_stdin() -> Result<Option<String>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }
    let mut buf = String::new();
    io::stdin()
        .read_to_string(&mut buf)
        .context("reading note body from stdin")?;
    Ok(Some(buf))
}
