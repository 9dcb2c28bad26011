use anyhow::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::actions::{parse_request, respond, schema_of, FileAction, Workspace};
use crate::file::resolver::relative_to;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateFileRequest {
    #[serde(default)]
    pub file_manager_id: Option<String>,

    /// File to create. Relative paths are created below the current working
    /// directory. An existing file is overwritten.
    pub file_path: String,
}

#[derive(Debug, Serialize)]
pub struct CreateFileResponse {
    pub file: String,
    pub success: bool,
}

fn validate_file_path(path: &str) -> std::result::Result<(), String> {
    if path.trim().is_empty() {
        return Err("file name cannot be empty or just whitespace".to_string());
    }
    if path == "." || path == ".." {
        return Err(r#"file name cannot be "." or "..""#.to_string());
    }
    Ok(())
}

pub struct CreateFile;

#[async_trait::async_trait]
impl FileAction for CreateFile {
    fn name(&self) -> &'static str {
        "create_file"
    }

    fn display_name(&self) -> &'static str {
        "Create a new file"
    }

    fn description(&self) -> &'static str {
        "Creates a new, empty file and opens it. Relative paths are created below the current \
         working directory. An existing file at the path is truncated."
    }

    fn input_schema(&self) -> Value {
        schema_of::<CreateFileRequest>()
    }

    async fn execute(&self, workspace: &mut Workspace, arguments: Value) -> Result<Value> {
        let request: CreateFileRequest = parse_request(self.name(), arguments)?;
        let manager = workspace.manager_mut(request.file_manager_id.as_deref())?;

        let outcome = validate_file_path(&request.file_path).and_then(|()| {
            manager
                .create(&request.file_path)
                .map(|handle| handle.path().to_path_buf())
                .map_err(|e| e.to_string())
        });
        let outcome = outcome.map(|path| CreateFileResponse {
            file: relative_to(manager.working_dir(), &path),
            success: true,
        });
        respond(manager, outcome)
    }
}
