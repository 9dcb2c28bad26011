use anyhow::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::actions::{parse_request, respond, schema_of, FileAction, Workspace};
use crate::file::manager::DirEntryInfo;

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct ListFilesRequest {
    #[serde(default)]
    pub file_manager_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListFilesResponse {
    pub entries: Vec<DirEntryInfo>,
}

pub struct ListFiles;

#[async_trait::async_trait]
impl FileAction for ListFiles {
    fn name(&self) -> &'static str {
        "list_files"
    }

    fn display_name(&self) -> &'static str {
        "List files"
    }

    fn description(&self) -> &'static str {
        "Lists the entries of the current working directory with their type (file or dir)."
    }

    fn input_schema(&self) -> Value {
        schema_of::<ListFilesRequest>()
    }

    async fn execute(&self, workspace: &mut Workspace, arguments: Value) -> Result<Value> {
        let request: ListFilesRequest = parse_request(self.name(), arguments)?;
        let manager = workspace.manager_mut(request.file_manager_id.as_deref())?;

        let outcome = manager
            .ls()
            .map(|entries| ListFilesResponse { entries })
            .map_err(|e| e.to_string());
        respond(manager, outcome)
    }
}
