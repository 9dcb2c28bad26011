pub mod actions;
pub mod error;
pub mod execution;
pub mod file;
pub mod settings;

pub use actions::{FileAction, FileTool, Workspace};
pub use error::{FileError, Result};
pub use file::context::{active_manager_id, ActiveManagerGuard};
pub use file::handle::{FileHandle, Match, Scope, ScrollDirection, TextReplacement};
pub use file::id::{IdAllocator, RandomIdAllocator, SequentialIdAllocator};
pub use file::lint::{CommandLinter, Linter, NoLint};
pub use file::manager::{DirEntryInfo, EntryKind, FileManager, FileManagerBuilder};
pub use file::search::{FindOptions, GrepOptions};
pub use settings::{Settings, SettingsManager};
