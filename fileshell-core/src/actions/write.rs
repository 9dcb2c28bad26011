use anyhow::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::actions::{parse_request, respond, schema_of, target_handle, FileAction, Workspace};
use crate::file::resolver::relative_to;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct WriteRequest {
    #[serde(default)]
    pub file_manager_id: Option<String>,

    /// File to overwrite. Defaults to the currently open file.
    #[serde(default)]
    pub file_path: Option<String>,

    /// New content of the whole file.
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct WriteResponse {
    pub file: String,
}

pub struct WriteFile;

#[async_trait::async_trait]
impl FileAction for WriteFile {
    fn name(&self) -> &'static str {
        "write"
    }

    fn display_name(&self) -> &'static str {
        "Write a file"
    }

    fn description(&self) -> &'static str {
        "Overwrites the whole content of a file with `text`."
    }

    fn input_schema(&self) -> Value {
        schema_of::<WriteRequest>()
    }

    async fn execute(&self, workspace: &mut Workspace, arguments: Value) -> Result<Value> {
        let request: WriteRequest = parse_request(self.name(), arguments)?;
        let manager = workspace.manager_mut(request.file_manager_id.as_deref())?;

        let outcome = target_handle(manager, request.file_path.as_deref()).and_then(|handle| {
            handle
                .write(&request.text)
                .map(|()| handle.path().to_path_buf())
                .map_err(|e| e.to_string())
        });
        let outcome = outcome.map(|path| WriteResponse {
            file: relative_to(manager.working_dir(), &path),
        });
        respond(manager, outcome)
    }
}
