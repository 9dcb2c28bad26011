//! Named, JSON-driven operations over a [`Workspace`] of file managers.
//!
//! Each action deserializes its arguments into a typed request, runs against
//! one manager, and answers with a JSON object that always carries `error`
//! and `current_working_directory`. A request may name the manager through
//! `file_manager_id`; otherwise the most recently used manager serves it.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::file::handle::FileHandle;
use crate::file::lint::Linter;
use crate::file::manager::FileManager;
use crate::file::resolver::relative_to;

pub mod chdir;
pub mod create;
pub mod edit;
pub mod execute;
pub mod find;
pub mod list;
pub mod open;
pub mod scroll;
pub mod search;
pub mod tree;
pub mod write;

/// The set of file managers a client can address, plus the linter guarding
/// edits made through them.
pub struct Workspace {
    managers: HashMap<String, FileManager>,
    recent: Option<String>,
    linter: Arc<dyn Linter>,
}

impl Workspace {
    pub fn new(linter: Arc<dyn Linter>) -> Self {
        Self {
            managers: HashMap::new(),
            recent: None,
            linter,
        }
    }

    /// Registers `manager`, makes it the default target and returns its id.
    pub fn add_manager(&mut self, manager: FileManager) -> String {
        let id = manager.id().to_string();
        tracing::debug!(%id, "Registering file manager");
        self.managers.insert(id.clone(), manager);
        self.recent = Some(id.clone());
        id
    }

    pub fn manager(&self, id: Option<&str>) -> Result<&FileManager> {
        let id = self.target(id)?;
        self.managers
            .get(&id)
            .with_context(|| format!("Unknown file manager: {id}"))
    }

    /// Looks up the manager for `id` (or the most recent one) and marks it
    /// as the most recently used.
    pub fn manager_mut(&mut self, id: Option<&str>) -> Result<&mut FileManager> {
        let id = self.target(id)?;
        let Some(manager) = self.managers.get_mut(&id) else {
            bail!("Unknown file manager: {id}");
        };
        self.recent = Some(id);
        Ok(manager)
    }

    pub fn linter(&self) -> Arc<dyn Linter> {
        Arc::clone(&self.linter)
    }

    pub fn len(&self) -> usize {
        self.managers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.managers.is_empty()
    }

    fn target(&self, id: Option<&str>) -> Result<String> {
        match id {
            Some(id) => Ok(id.to_string()),
            None => self
                .recent
                .clone()
                .context("No file manager registered in the workspace"),
        }
    }
}

#[async_trait::async_trait]
pub trait FileAction: Send + Sync {
    fn name(&self) -> &'static str;
    fn display_name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn input_schema(&self) -> Value;

    /// Runs the action. Failures of the operation itself are reported inside
    /// the response; `Err` is reserved for malformed arguments and unknown
    /// managers.
    async fn execute(&self, workspace: &mut Workspace, arguments: Value) -> Result<Value>;
}

/// Registry of actions addressed by name.
pub struct FileTool {
    actions: BTreeMap<&'static str, Box<dyn FileAction>>,
}

impl Default for FileTool {
    fn default() -> Self {
        Self::new(vec![
            Box::new(chdir::ChangeWorkingDirectory),
            Box::new(create::CreateFile),
            Box::new(open::OpenFile),
            Box::new(edit::EditFile),
            Box::new(write::WriteFile),
            Box::new(scroll::ScrollFile),
            Box::new(list::ListFiles),
            Box::new(tree::Tree),
            Box::new(search::SearchWord),
            Box::new(find::FindFile),
            Box::new(execute::ExecuteCommand),
        ])
    }
}

impl FileTool {
    pub fn new(actions: Vec<Box<dyn FileAction>>) -> Self {
        let mut tool = Self {
            actions: BTreeMap::new(),
        };
        for action in actions {
            tool.register(action);
        }
        tool
    }

    pub fn register(&mut self, action: Box<dyn FileAction>) {
        tracing::debug!(action = action.name(), "Registering action");
        self.actions.insert(action.name(), action);
    }

    pub fn list_actions(&self) -> Vec<&str> {
        self.actions.keys().copied().collect()
    }

    pub fn get(&self, name: &str) -> Option<&dyn FileAction> {
        self.actions.get(name).map(|a| a.as_ref())
    }

    /// Name, display name, description and input schema of every action.
    pub fn definitions(&self) -> Vec<Value> {
        self.actions
            .values()
            .map(|action| {
                json!({
                    "name": action.name(),
                    "display_name": action.display_name(),
                    "description": action.description(),
                    "input_schema": action.input_schema(),
                })
            })
            .collect()
    }

    pub async fn execute(
        &self,
        workspace: &mut Workspace,
        name: &str,
        arguments: Value,
    ) -> Result<Value> {
        let Some(action) = self.actions.get(name) else {
            tracing::error!(action = name, "Unknown action");
            bail!(
                "Unknown action: {name}. Available actions: {}",
                self.list_actions().join(", ")
            );
        };
        action.execute(workspace, arguments).await
    }
}

/// Missing arguments are read as an empty object.
pub(crate) fn parse_request<T: DeserializeOwned>(action: &str, arguments: Value) -> Result<T> {
    let arguments = match arguments {
        Value::Null => Value::Object(Map::new()),
        other => other,
    };
    serde_json::from_value(arguments).with_context(|| format!("Invalid arguments for {action}"))
}

pub(crate) fn schema_of<T: JsonSchema>() -> Value {
    serde_json::to_value(schemars::schema_for!(T)).unwrap_or(Value::Null)
}

/// Builds the response object: `data`'s fields on success, only the error
/// otherwise, and the manager's working directory in both cases.
pub(crate) fn respond<T: Serialize>(
    manager: &FileManager,
    outcome: std::result::Result<T, String>,
) -> Result<Value> {
    let mut body = Map::new();
    let error = match outcome {
        Ok(data) => {
            match serde_json::to_value(data).context("Failed to serialize response")? {
                Value::Object(fields) => body.extend(fields),
                Value::Null => {}
                other => {
                    body.insert("result".to_string(), other);
                }
            }
            Value::Null
        }
        Err(message) => Value::String(message),
    };
    body.insert("error".to_string(), error);
    body.insert(
        "current_working_directory".to_string(),
        Value::String(manager.working_dir().to_string_lossy().into_owned()),
    );
    Ok(Value::Object(body))
}

/// The handle for `file_path`, opening it if needed, or the manager's recent
/// file when no path is given.
pub(crate) fn target_handle<'a>(
    manager: &'a mut FileManager,
    file_path: Option<&str>,
) -> std::result::Result<&'a mut FileHandle, String> {
    match file_path.filter(|p| !p.trim().is_empty()) {
        Some(path) => manager.open(path).map_err(|e| e.to_string()),
        None => manager
            .recent_mut()
            .ok_or_else(|| "no file is open, provide file_path".to_string()),
    }
}

/// The visible part of a file, as returned by `open_file` and `scroll`.
#[derive(Debug, Serialize)]
pub struct WindowView {
    pub file: String,
    pub start: i64,
    pub end: i64,
    pub total_lines: usize,
    pub lines: BTreeMap<usize, String>,
}

impl WindowView {
    pub(crate) fn of(manager: &FileManager, handle: &FileHandle) -> crate::Result<Self> {
        Ok(Self {
            file: relative_to(manager.working_dir(), handle.path()),
            start: handle.start(),
            end: handle.end(),
            total_lines: handle.total_lines()?,
            lines: handle.read()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::id::SequentialIdAllocator;
    use crate::file::lint::NoLint;

    fn workspace_with(dirs: &[&std::path::Path]) -> (Workspace, Vec<String>) {
        let allocator = Arc::new(SequentialIdAllocator::new("m"));
        let mut workspace = Workspace::new(Arc::new(NoLint));
        let ids = dirs
            .iter()
            .map(|dir| {
                let manager = FileManager::builder()
                    .working_dir(*dir)
                    .id_allocator(allocator.clone())
                    .build()
                    .unwrap();
                workspace.add_manager(manager)
            })
            .collect();
        (workspace, ids)
    }

    #[test]
    fn test_manager_lookup_defaults_to_recent() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        let (mut workspace, ids) = workspace_with(&[a.path(), b.path()]);
        assert_eq!(ids, vec!["m0", "m1"]);
        assert_eq!(workspace.len(), 2);

        assert_eq!(workspace.manager(None).unwrap().id(), "m1");
        workspace.manager_mut(Some("m0")).unwrap();
        assert_eq!(workspace.manager(None).unwrap().id(), "m0");

        let err = workspace.manager(Some("zzz")).unwrap_err();
        assert!(err.to_string().contains("Unknown file manager"));
    }

    #[test]
    fn test_empty_workspace_has_no_target() {
        let workspace = Workspace::new(Arc::new(NoLint));
        assert!(workspace.is_empty());
        assert!(workspace.manager(None).is_err());
    }

    #[tokio::test]
    async fn test_unknown_action() {
        let dir = tempfile::tempdir().unwrap();
        let (mut workspace, _) = workspace_with(&[dir.path()]);
        let err = FileTool::default()
            .execute(&mut workspace, "delete_everything", json!({}))
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Unknown action: delete_everything"));
    }

    #[test]
    fn test_definitions_expose_schemas() {
        let tool = FileTool::default();
        assert_eq!(tool.list_actions().len(), 11);
        for definition in tool.definitions() {
            assert!(definition["input_schema"].is_object(), "{definition}");
            assert!(!definition["description"].as_str().unwrap().is_empty());
        }
        let edit = tool.get("edit_file").unwrap().input_schema();
        assert!(edit["properties"]["start_line"].is_object());
    }

    #[test]
    fn test_respond_shapes() {
        let dir = tempfile::tempdir().unwrap();
        let manager = FileManager::new(dir.path()).unwrap();

        let ok = respond(&manager, Ok(json!({"file": "a.txt"}))).unwrap();
        assert_eq!(ok["file"], "a.txt");
        assert!(ok["error"].is_null());
        assert_eq!(
            ok["current_working_directory"],
            dir.path().to_string_lossy().into_owned()
        );

        let err = respond::<Value>(&manager, Err("boom".to_string())).unwrap();
        assert_eq!(err["error"], "boom");
        assert!(err.get("file").is_none());
    }
}
