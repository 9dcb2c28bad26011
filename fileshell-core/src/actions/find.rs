use anyhow::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::actions::{parse_request, respond, schema_of, FileAction, Workspace};
use crate::file::search::FindOptions;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct FindFileRequest {
    #[serde(default)]
    pub file_manager_id: Option<String>,

    /// Regex matched against paths relative to the working directory.
    pub pattern: String,

    /// Directory levels to descend, 0 for no limit.
    #[serde(default)]
    pub depth: usize,

    #[serde(default)]
    pub case_sensitive: bool,

    /// Directories to search from. Defaults to the working directory.
    #[serde(default)]
    pub include: Vec<String>,

    /// Directories to skip. `.git` is always skipped.
    #[serde(default)]
    pub exclude: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct FindFileResponse {
    pub files: Vec<String>,
}

pub struct FindFile;

#[async_trait::async_trait]
impl FileAction for FindFile {
    fn name(&self) -> &'static str {
        "find_file"
    }

    fn display_name(&self) -> &'static str {
        "Find files"
    }

    fn description(&self) -> &'static str {
        "Finds files and directories whose relative path matches a regex."
    }

    fn input_schema(&self) -> Value {
        schema_of::<FindFileRequest>()
    }

    async fn execute(&self, workspace: &mut Workspace, arguments: Value) -> Result<Value> {
        let request: FindFileRequest = parse_request(self.name(), arguments)?;
        let manager = workspace.manager_mut(request.file_manager_id.as_deref())?;

        let options = FindOptions {
            depth: request.depth,
            case_sensitive: request.case_sensitive,
            include: request.include,
            exclude: request.exclude,
        };
        let outcome = manager
            .find(&request.pattern, &options)
            .map(|files| FindFileResponse { files })
            .map_err(|e| e.to_string());
        respond(manager, outcome)
    }
}
