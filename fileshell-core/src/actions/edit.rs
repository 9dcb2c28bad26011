use anyhow::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::actions::{parse_request, respond, schema_of, target_handle, FileAction, Workspace};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct EditFileRequest {
    #[serde(default)]
    pub file_manager_id: Option<String>,

    /// File to edit. When omitted the currently open file is edited; when
    /// given, that file is opened and becomes the current one.
    #[serde(default)]
    pub file_path: Option<String>,

    /// Text that replaces the line range.
    pub text: String,

    /// First line to replace, 1-based and inclusive.
    pub start_line: i64,

    /// Last line to replace, 1-based and inclusive.
    pub end_line: i64,
}

#[derive(Debug, Serialize)]
pub struct EditFileResponse {
    pub old_text: String,
    pub updated_text: String,
}

pub struct EditFile;

#[async_trait::async_trait]
impl FileAction for EditFile {
    fn name(&self) -> &'static str {
        "edit_file"
    }

    fn display_name(&self) -> &'static str {
        "Edit a file"
    }

    fn description(&self) -> &'static str {
        "Replaces lines start_line..=end_line of a file with `text`. The edit is limited to the \
         visible window and indentation must be written out in full. Files with a configured \
         checker (Python by default) are checked afterwards; if the check fails the edit is \
         reverted and the error returned. Use `write` to replace a whole file."
    }

    fn input_schema(&self) -> Value {
        schema_of::<EditFileRequest>()
    }

    async fn execute(&self, workspace: &mut Workspace, arguments: Value) -> Result<Value> {
        let request: EditFileRequest = parse_request(self.name(), arguments)?;
        let linter = workspace.linter();
        let manager = workspace.manager_mut(request.file_manager_id.as_deref())?;

        let outcome = match target_handle(manager, request.file_path.as_deref()) {
            Ok(handle) => handle
                .write_and_run_lint(
                    &request.text,
                    request.start_line,
                    request.end_line,
                    linter.as_ref(),
                )
                .await
                .map(|replacement| EditFileResponse {
                    old_text: replacement.replaced_text,
                    updated_text: replacement.replaced_with,
                })
                .map_err(|e| e.to_string()),
            Err(e) => Err(e),
        };
        let outcome = outcome.map_err(|e| format!("No Update, found error: {e}"));
        respond(manager, outcome)
    }
}
