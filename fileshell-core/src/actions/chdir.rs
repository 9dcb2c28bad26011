use anyhow::Result;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::actions::{parse_request, respond, schema_of, FileAction, Workspace};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ChdirRequest {
    /// ID of the file manager to use. The most recently used manager serves
    /// the request when omitted.
    #[serde(default)]
    pub file_manager_id: Option<String>,

    /// Directory to move to. Can be absolute, relative to the current
    /// working directory, or use '..' to go up.
    pub path: String,
}

pub struct ChangeWorkingDirectory;

#[async_trait::async_trait]
impl FileAction for ChangeWorkingDirectory {
    fn name(&self) -> &'static str {
        "change_working_directory"
    }

    fn display_name(&self) -> &'static str {
        "Change Working Directory"
    }

    fn description(&self) -> &'static str {
        "Changes the working directory of the file manager. Later actions run relative to the new \
         directory. Fails if the target does not exist, is not a directory, or lies on another \
         filesystem root."
    }

    fn input_schema(&self) -> Value {
        schema_of::<ChdirRequest>()
    }

    async fn execute(&self, workspace: &mut Workspace, arguments: Value) -> Result<Value> {
        let request: ChdirRequest = parse_request(self.name(), arguments)?;
        let manager = workspace.manager_mut(request.file_manager_id.as_deref())?;
        let outcome = manager.chdir(&request.path).map_err(|e| e.to_string());
        respond(manager, outcome)
    }
}
