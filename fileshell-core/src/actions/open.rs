use anyhow::Result;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::actions::{parse_request, respond, schema_of, FileAction, WindowView, Workspace};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct OpenFileRequest {
    #[serde(default)]
    pub file_manager_id: Option<String>,

    /// File to open, relative to the current working directory or absolute.
    pub file_path: String,

    /// 0-based line to move the window to. Keeps the current window when
    /// omitted.
    #[serde(default)]
    pub line: Option<i64>,
}

pub struct OpenFile;

#[async_trait::async_trait]
impl FileAction for OpenFile {
    fn name(&self) -> &'static str {
        "open_file"
    }

    fn display_name(&self) -> &'static str {
        "Open a file"
    }

    fn description(&self) -> &'static str {
        "Opens a file and shows the lines in its window, keyed by 1-based line number. Pass `line` \
         to move the window so it starts there."
    }

    fn input_schema(&self) -> Value {
        schema_of::<OpenFileRequest>()
    }

    async fn execute(&self, workspace: &mut Workspace, arguments: Value) -> Result<Value> {
        let request: OpenFileRequest = parse_request(self.name(), arguments)?;
        let manager = workspace.manager_mut(request.file_manager_id.as_deref())?;

        let outcome = manager
            .open(&request.file_path)
            .map(|handle| {
                if let Some(line) = request.line {
                    handle.goto(line);
                }
                handle.clone()
            })
            .and_then(|handle| WindowView::of(manager, &handle));
        respond(manager, outcome.map_err(|e| e.to_string()))
    }
}
