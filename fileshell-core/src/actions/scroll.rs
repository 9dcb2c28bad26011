use anyhow::Result;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::actions::{
    parse_request, respond, schema_of, target_handle, FileAction, WindowView, Workspace,
};
use crate::file::handle::ScrollDirection;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ScrollRequest {
    #[serde(default)]
    pub file_manager_id: Option<String>,

    /// File to scroll. Defaults to the currently open file.
    #[serde(default)]
    pub file_path: Option<String>,

    pub direction: ScrollDirection,

    /// How many lines to move the window by.
    pub lines: usize,
}

pub struct ScrollFile;

#[async_trait::async_trait]
impl FileAction for ScrollFile {
    fn name(&self) -> &'static str {
        "scroll"
    }

    fn display_name(&self) -> &'static str {
        "Scroll a file"
    }

    fn description(&self) -> &'static str {
        "Moves the window of an open file up or down by a number of lines and shows the lines now \
         visible."
    }

    fn input_schema(&self) -> Value {
        schema_of::<ScrollRequest>()
    }

    async fn execute(&self, workspace: &mut Workspace, arguments: Value) -> Result<Value> {
        let request: ScrollRequest = parse_request(self.name(), arguments)?;
        let manager = workspace.manager_mut(request.file_manager_id.as_deref())?;

        let outcome = target_handle(manager, request.file_path.as_deref())
            .map(|handle| {
                handle.scroll(request.lines, request.direction);
                handle.clone()
            })
            .and_then(|handle| WindowView::of(manager, &handle).map_err(|e| e.to_string()));
        respond(manager, outcome)
    }
}
