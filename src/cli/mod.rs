use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{ConfigLoader, CONFIG_ENV, DATA_ENV};
use crate::notebook::Notebook;
use crate::storage::{AnyStore, JsonFileStore, MemoryStore};

pub mod commands;

use self::commands::{DeleteArgs, EditArgs, ListArgs, NewArgs, ShowArgs, TagArgs};

#[derive(Parser, Debug)]
#[command(name = "notekeep", version, about = "Tagged local notes")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Override the config file location (takes precedence over NOTEKEEP_CONFIG)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the data directory (takes precedence over NOTEKEEP_DATA)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Minimum log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    pub log_level: String,

    /// Keep notes in memory for this run; no files are created or written
    #[arg(long)]
    pub ephemeral: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a new note
    New(NewArgs),
    /// List notes, optionally filtered by title text and tag:<label> tokens (default)
    List(ListArgs),
    /// Print a single note
    Show(ShowArgs),
    /// Change a note's title, body or tags
    Edit(EditArgs),
    /// Delete a note
    Delete(DeleteArgs),
    /// Manage tags
    Tag(TagArgs),
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.config {
        env::set_var(CONFIG_ENV, path);
    }
    if let Some(path) = &cli.data_dir {
        env::set_var(DATA_ENV, path);
    }

    init_tracing(&cli.log_level)
        .with_context(|| format!("initialising logging at level {}", cli.log_level))?;
    let loader = ConfigLoader::discover()?;
    let config = if cli.ephemeral {
        loader.load_or_default()?
    } else {
        loader.load_or_init()?
    };

    let store = if cli.ephemeral {
        tracing::info!("using in-memory store");
        AnyStore::Memory(MemoryStore::new())
    } else {
        AnyStore::File(JsonFileStore::with_options(&config.storage))
    };
    let mut notebook = Notebook::load(store);

    let command = cli
        .command
        .unwrap_or_else(|| Commands::List(ListArgs::default()));
    let output = match command {
        Commands::New(args) => commands::new_note(&mut notebook, args),
        Commands::List(args) => commands::list_notes(&config, &mut notebook, args),
        Commands::Show(args) => commands::show_note(&config, &mut notebook, args),
        Commands::Edit(args) => commands::edit_note(&config, &mut notebook, args),
        Commands::Delete(args) => commands::delete_note(&mut notebook, args),
        Commands::Tag(args) => commands::handle_tag_command(&mut notebook, args),
    }?;
    print!("{output}");
    commands::ensure_persisted(&mut notebook)
}

fn init_tracing(level: &str) -> Result<()> {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_try_init(|| {
        let env_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
        fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|err| anyhow::anyhow!("installing tracing subscriber: {err}"))
    })
    .map(|_| ())
}
