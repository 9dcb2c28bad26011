use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::error::{FileError, IoContext, Result};
use crate::execution::{run_shell, DEFAULT_COMMAND_TIMEOUT};
use crate::file::context::{self, ActiveManagerGuard};
use crate::file::handle::{FileHandle, Match, DEFAULT_WINDOW};
use crate::file::id::{IdAllocator, RandomIdAllocator};
use crate::file::resolver::{normalize, resolve, resolve_all, same_anchor};
use crate::file::search::{self, FindOptions, GrepOptions};
use crate::file::tree::render_tree;
use crate::settings::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirEntryInfo {
    pub name: String,
    pub kind: EntryKind,
}

/// A sandboxed view of the filesystem rooted at a working directory, plus
/// the files opened through it.
///
/// Every relative path handed to the manager is resolved against the working
/// directory, never against the process current directory.
pub struct FileManager {
    id: String,
    working_dir: PathBuf,
    files: HashMap<PathBuf, FileHandle>,
    recent: Option<PathBuf>,
    window: usize,
    command_timeout: Duration,
}

impl std::fmt::Debug for FileManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileManager")
            .field("id", &self.id)
            .field("working_dir", &self.working_dir)
            .field("open_files", &self.files.len())
            .field("recent", &self.recent)
            .finish()
    }
}

pub struct FileManagerBuilder {
    working_dir: Option<PathBuf>,
    id_allocator: Option<Arc<dyn IdAllocator>>,
    window: usize,
    command_timeout: Duration,
}

impl Default for FileManagerBuilder {
    fn default() -> Self {
        Self {
            working_dir: None,
            id_allocator: None,
            window: DEFAULT_WINDOW,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }
}

impl FileManagerBuilder {
    /// Defaults to the process current directory.
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn id_allocator(mut self, allocator: Arc<dyn IdAllocator>) -> Self {
        self.id_allocator = Some(allocator);
        self
    }

    pub fn window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub fn settings(self, settings: &Settings) -> Self {
        self.window(settings.file.window)
            .command_timeout(Duration::from_secs(settings.execution.timeout_seconds))
    }

    pub fn build(self) -> Result<FileManager> {
        let cwd = || env::current_dir().io_context(|| "Failed to read current directory");
        let working_dir = match self.working_dir {
            Some(dir) if dir.is_absolute() => normalize(&dir),
            Some(dir) => normalize(&cwd()?.join(dir)),
            None => cwd()?,
        };
        ensure_directory(&working_dir)?;

        let allocator = self.id_allocator.unwrap_or_else(RandomIdAllocator::global);
        let id = allocator.allocate();
        tracing::debug!(%id, dir = %working_dir.display(), "Created file manager");

        Ok(FileManager {
            id,
            working_dir,
            files: HashMap::new(),
            recent: None,
            window: self.window,
            command_timeout: self.command_timeout,
        })
    }
}

impl FileManager {
    pub fn new(working_dir: impl Into<PathBuf>) -> Result<Self> {
        Self::builder().working_dir(working_dir).build()
    }

    pub fn builder() -> FileManagerBuilder {
        FileManagerBuilder::default()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn command_timeout(&self) -> Duration {
        self.command_timeout
    }

    /// Moves the sandbox root. The target must be an existing directory on
    /// the same filesystem root as the current working directory. Nothing
    /// changes on failure.
    pub fn chdir(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let target = resolve(&self.working_dir, path)?;
        if !same_anchor(&self.working_dir, &target) {
            return Err(FileError::AccessDenied(target));
        }
        ensure_directory(&target)?;

        tracing::info!(from = %self.working_dir.display(), to = %target.display(), "Changed working directory");
        self.working_dir = target;
        Ok(())
    }

    /// Returns the registered handle for `path`, registering a new one (and
    /// making it the recent file) if this is the first open.
    pub fn open(&mut self, path: impl AsRef<Path>) -> Result<&mut FileHandle> {
        let target = resolve(&self.working_dir, path)?;
        match self.files.entry(target) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let metadata = fs::metadata(entry.key()).map_err(|e| {
                    if e.kind() == io::ErrorKind::NotFound {
                        FileError::NotFound(entry.key().clone())
                    } else {
                        FileError::io(format!("Failed to open {}", entry.key().display()), e)
                    }
                })?;
                if metadata.is_dir() {
                    return Err(FileError::InvalidArgument(format!(
                        "'{}' is a directory, not a file",
                        entry.key().display()
                    )));
                }

                self.recent = Some(entry.key().clone());
                let handle = FileHandle::new(entry.key().clone(), self.window);
                Ok(entry.insert(handle))
            }
        }
    }

    /// Creates `path` (truncating any existing file) and registers a fresh
    /// handle for it as the recent file.
    pub fn create(&mut self, path: impl AsRef<Path>) -> Result<&mut FileHandle> {
        let target = resolve(&self.working_dir, path)?;
        fs::File::create(&target)
            .io_context(|| format!("could not create file {}", target.display()))?;

        self.recent = Some(target.clone());
        let handle = FileHandle::new(target.clone(), self.window);
        Ok(match self.files.entry(target) {
            Entry::Occupied(mut entry) => {
                entry.insert(handle);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(handle),
        })
    }

    pub fn recent(&self) -> Option<&FileHandle> {
        self.recent.as_ref().and_then(|path| self.files.get(path))
    }

    pub fn recent_mut(&mut self) -> Option<&mut FileHandle> {
        let path = self.recent.as_ref()?;
        self.files.get_mut(path)
    }

    /// An already registered handle, without touching the disk.
    pub fn file(&self, path: impl AsRef<Path>) -> Option<&FileHandle> {
        let target = resolve(&self.working_dir, path).ok()?;
        self.files.get(&target)
    }

    /// Direct children of the working directory, sorted by name.
    pub fn ls(&self) -> Result<Vec<DirEntryInfo>> {
        let read = fs::read_dir(&self.working_dir).io_context(|| {
            format!("Failed to read directory: {}", self.working_dir.display())
        })?;

        let mut entries = Vec::new();
        for entry in read {
            let entry = entry.io_context(|| {
                format!("Failed to read directory: {}", self.working_dir.display())
            })?;
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            entries.push(DirEntryInfo {
                name: entry.file_name().to_string_lossy().into_owned(),
                kind: if is_dir { EntryKind::Dir } else { EntryKind::File },
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    pub fn grep(
        &self,
        word: &str,
        pattern: &str,
        options: GrepOptions,
    ) -> Result<BTreeMap<String, Vec<Match>>> {
        search::grep(&self.working_dir, word, pattern, options)
    }

    pub fn find(&self, pattern: &str, options: &FindOptions) -> Result<Vec<String>> {
        search::find(&self.working_dir, pattern, options)
    }

    pub fn tree<S: AsRef<Path>>(&self, depth: Option<usize>, exclude: &[S]) -> Result<String> {
        let exclude = resolve_all(&self.working_dir, exclude)?;
        render_tree(&self.working_dir, depth, &exclude)
    }

    /// Runs `command` through bash in the working directory and returns its
    /// stdout. A non-zero exit is an error carrying stderr.
    pub async fn execute_command(&self, command: &str) -> Result<String> {
        let result = run_shell(&self.working_dir, command, self.command_timeout).await?;
        if !result.success() {
            return Err(FileError::CommandFailed {
                code: result.code,
                stderr: result.err,
            });
        }
        Ok(result.out)
    }

    /// Binds the process current directory to this manager until the guard
    /// is dropped.
    ///
    /// # Panics
    ///
    /// Panics if a different manager is already active.
    pub fn activate(&self) -> Result<ActiveManagerGuard> {
        context::activate(&self.id, &self.working_dir)
    }
}

fn ensure_directory(path: &Path) -> Result<()> {
    match fs::metadata(path) {
        Ok(metadata) if metadata.is_dir() => Ok(()),
        Ok(_) => Err(FileError::NotADirectory(path.to_path_buf())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Err(FileError::NotFound(path.to_path_buf()))
        }
        Err(e) => Err(FileError::io(
            format!("Failed to inspect {}", path.display()),
            e,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::context::{active_manager_id, cwd_test_lock};
    use crate::file::id::SequentialIdAllocator;

    fn workspace() -> (tempfile::TempDir, FileManager) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(root.join("README.md"), "hello\n").unwrap();
        fs::write(root.join("src/lib.rs"), "pub fn f() {}\n").unwrap();
        let manager = FileManager::new(&root).unwrap();
        (dir, manager)
    }

    #[test]
    fn test_builder_applies_settings_and_allocator() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.file.window = 7;
        settings.execution.timeout_seconds = 3;

        let allocator: Arc<dyn IdAllocator> = Arc::new(SequentialIdAllocator::new("fm-"));
        let mut manager = FileManager::builder()
            .working_dir(dir.path())
            .id_allocator(allocator)
            .settings(&settings)
            .build()
            .unwrap();

        assert_eq!(manager.id(), "fm-0");
        assert_eq!(manager.command_timeout(), Duration::from_secs(3));
        fs::write(dir.path().join("a.txt"), "").unwrap();
        assert_eq!(manager.open("a.txt").unwrap().window(), 7);
    }

    #[test]
    fn test_build_rejects_missing_or_file_root() {
        let dir = tempfile::tempdir().unwrap();
        let missing = FileManager::new(dir.path().join("nope")).unwrap_err();
        assert!(matches!(missing, FileError::NotFound(_)));

        fs::write(dir.path().join("file"), "").unwrap();
        let file = FileManager::new(dir.path().join("file")).unwrap_err();
        assert!(matches!(file, FileError::NotADirectory(_)));
    }

    #[test]
    fn test_chdir_relative_and_parent() {
        let (dir, mut manager) = workspace();
        let root = dir.path().canonicalize().unwrap();

        manager.chdir("src").unwrap();
        assert_eq!(manager.working_dir(), root.join("src"));
        manager.chdir("..").unwrap();
        assert_eq!(manager.working_dir(), root);
    }

    #[test]
    fn test_chdir_failures_leave_state_untouched() {
        let (dir, mut manager) = workspace();
        let root = dir.path().canonicalize().unwrap();

        let err = manager.chdir("missing").unwrap_err();
        assert!(matches!(err, FileError::NotFound(_)));
        let err = manager.chdir("README.md").unwrap_err();
        assert!(matches!(err, FileError::NotADirectory(_)));
        assert_eq!(err.to_string(), format!("'{}' is not a valid directory", root.join("README.md").display()));
        let err = manager.chdir("bad\0path").unwrap_err();
        assert!(matches!(err, FileError::InvalidArgument(_)));

        assert_eq!(manager.working_dir(), root);
    }

    #[test]
    fn test_open_registers_and_tracks_recent() {
        let (dir, mut manager) = workspace();
        let root = dir.path().canonicalize().unwrap();
        assert!(manager.recent().is_none());

        manager.open("README.md").unwrap().scroll(3, crate::ScrollDirection::Down);
        assert_eq!(manager.recent().unwrap().path(), root.join("README.md"));

        manager.open("src/lib.rs").unwrap();
        assert_eq!(manager.recent().unwrap().path(), root.join("src/lib.rs"));

        // cached handles keep their window and do not move `recent`
        let cached = manager.open("README.md").unwrap();
        assert_eq!(cached.start(), 3);
        assert_eq!(manager.recent().unwrap().path(), root.join("src/lib.rs"));
        assert!(manager.file("README.md").is_some());
    }

    #[test]
    fn test_open_errors() {
        let (_dir, mut manager) = workspace();
        assert!(matches!(
            manager.open("missing.txt").unwrap_err(),
            FileError::NotFound(_)
        ));
        assert!(matches!(
            manager.open("src").unwrap_err(),
            FileError::InvalidArgument(_)
        ));
        assert!(manager.recent().is_none());
    }

    #[test]
    fn test_create_truncates_and_resets_handle() {
        let (dir, mut manager) = workspace();
        let root = dir.path().canonicalize().unwrap();

        manager.open("README.md").unwrap().goto(10);
        let handle = manager.create("README.md").unwrap();
        assert_eq!(handle.start(), 0);
        assert_eq!(fs::read_to_string(root.join("README.md")).unwrap(), "");

        manager.create("new.txt").unwrap();
        assert!(root.join("new.txt").is_file());
        assert_eq!(manager.recent().unwrap().path(), root.join("new.txt"));

        let err = manager.create("no/such/dir/file.txt").unwrap_err();
        assert!(err.to_string().starts_with("could not create file"));
        assert_eq!(manager.recent().unwrap().path(), root.join("new.txt"));
    }

    #[test]
    fn test_ls_sorted_with_kinds() {
        let (_dir, manager) = workspace();
        let entries = manager.ls().unwrap();
        assert_eq!(
            entries,
            vec![
                DirEntryInfo {
                    name: "README.md".into(),
                    kind: EntryKind::File
                },
                DirEntryInfo {
                    name: "src".into(),
                    kind: EntryKind::Dir
                },
            ]
        );
    }

    #[test]
    fn test_tree_excludes_relative_dirs() {
        let (_dir, manager) = workspace();
        let tree = manager.tree(None, &["src"]).unwrap();
        assert_eq!(tree, "__ README.md\n__ src\n");
    }

    #[tokio::test]
    async fn test_execute_command_in_working_dir() {
        let (dir, manager) = workspace();
        let root = dir.path().canonicalize().unwrap();

        let out = manager.execute_command("pwd").await.unwrap();
        assert_eq!(out.trim(), root.to_string_lossy());

        let err = manager
            .execute_command("echo oops >&2; exit 3")
            .await
            .unwrap_err();
        match err {
            FileError::CommandFailed { code, stderr } => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "oops\n");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_execute_command_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let manager = FileManager::builder()
            .working_dir(dir.path())
            .command_timeout(Duration::from_millis(200))
            .build()
            .unwrap();

        let err = manager.execute_command("sleep 5").await.unwrap_err();
        assert!(matches!(err, FileError::Timeout { .. }));
    }

    #[test]
    fn test_activate_uses_working_dir() {
        let _lock = cwd_test_lock();
        let (dir, manager) = workspace();
        let root = dir.path().canonicalize().unwrap();

        let guard = manager.activate().unwrap();
        assert_eq!(env::current_dir().unwrap(), root);
        assert_eq!(active_manager_id().as_deref(), Some(manager.id()));
        drop(guard);
        assert_eq!(active_manager_id(), None);
    }
}
