use anyhow::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::actions::{parse_request, respond, schema_of, FileAction, Workspace};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ExecuteCommandRequest {
    #[serde(default)]
    pub file_manager_id: Option<String>,

    /// Shell command, run with `bash -c` in the working directory.
    pub command: String,
}

#[derive(Debug, Serialize)]
pub struct ExecuteCommandResponse {
    pub output: String,
}

pub struct ExecuteCommand;

#[async_trait::async_trait]
impl FileAction for ExecuteCommand {
    fn name(&self) -> &'static str {
        "execute_command"
    }

    fn display_name(&self) -> &'static str {
        "Execute a command"
    }

    fn description(&self) -> &'static str {
        "Runs a shell command in the current working directory and returns its standard output. \
         A non-zero exit returns standard error as the error. Long running commands are killed \
         after the configured timeout."
    }

    fn input_schema(&self) -> Value {
        schema_of::<ExecuteCommandRequest>()
    }

    async fn execute(&self, workspace: &mut Workspace, arguments: Value) -> Result<Value> {
        let request: ExecuteCommandRequest = parse_request(self.name(), arguments)?;
        let manager = workspace.manager_mut(request.file_manager_id.as_deref())?;

        let outcome = manager
            .execute_command(&request.command)
            .await
            .map(|output| ExecuteCommandResponse { output })
            .map_err(|e| e.to_string());
        respond(manager, outcome)
    }
}
