use anyhow::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::actions::{parse_request, respond, schema_of, FileAction, Workspace};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct TreeRequest {
    #[serde(default)]
    pub file_manager_id: Option<String>,

    /// How many directory levels to expand below the working directory.
    /// Unlimited when omitted.
    #[serde(default)]
    pub depth: Option<usize>,

    /// Directories to list without expanding.
    #[serde(default)]
    pub exclude: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct TreeResponse {
    pub tree: String,
}

pub struct Tree;

#[async_trait::async_trait]
impl FileAction for Tree {
    fn name(&self) -> &'static str {
        "tree"
    }

    fn display_name(&self) -> &'static str {
        "Show directory tree"
    }

    fn description(&self) -> &'static str {
        "Shows the directory structure below the current working directory. Files are listed \
         before subdirectories at every level."
    }

    fn input_schema(&self) -> Value {
        schema_of::<TreeRequest>()
    }

    async fn execute(&self, workspace: &mut Workspace, arguments: Value) -> Result<Value> {
        let request: TreeRequest = parse_request(self.name(), arguments)?;
        let manager = workspace.manager_mut(request.file_manager_id.as_deref())?;

        let outcome = manager
            .tree(request.depth, &request.exclude)
            .map(|tree| TreeResponse { tree })
            .map_err(|e| e.to_string());
        respond(manager, outcome)
    }
}
