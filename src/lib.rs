pub mod cli;
pub mod config;
pub mod model;
pub mod notebook;
pub mod search;
pub mod storage;
pub mod view;

pub use config::{AppConfig, ConfigLoader, ConfigPaths};
pub use model::{Note, NoteData, NoteId, RawNote, Tag, TagId};
pub use notebook::Notebook;
pub use search::{filter, NoteFilter};
pub use storage::{JsonFileStore, KeyValueStore, MemoryStore, StoreKey};
pub use view::{project, select_current, NotFound};
