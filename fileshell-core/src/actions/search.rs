use std::collections::BTreeMap;

use anyhow::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::actions::{parse_request, respond, schema_of, FileAction, Workspace};
use crate::file::handle::Match;
use crate::file::search::GrepOptions;

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchWordRequest {
    #[serde(default)]
    pub file_manager_id: Option<String>,

    /// Text to look for. Matched as a plain substring, not a regex.
    pub word: String,

    /// Directory, file or glob to search. Empty searches the whole working
    /// directory.
    #[serde(default)]
    pub pattern: String,

    /// Descend into subdirectories, and let glob wildcards cross `/`.
    #[serde(default = "default_true")]
    pub recursive: bool,

    #[serde(default = "default_true")]
    pub case_insensitive: bool,
}

#[derive(Debug, Serialize)]
pub struct SearchWordResponse {
    /// Matches keyed by path relative to the working directory
    pub matches: BTreeMap<String, Vec<Match>>,
}

pub struct SearchWord;

#[async_trait::async_trait]
impl FileAction for SearchWord {
    fn name(&self) -> &'static str {
        "search_word"
    }

    fn display_name(&self) -> &'static str {
        "Search for a word"
    }

    fn description(&self) -> &'static str {
        "Searches files for lines containing `word`. `pattern` narrows the search to a directory, \
         a file, or a glob such as `src/*.rs`. Hidden files are skipped."
    }

    fn input_schema(&self) -> Value {
        schema_of::<SearchWordRequest>()
    }

    async fn execute(&self, workspace: &mut Workspace, arguments: Value) -> Result<Value> {
        let request: SearchWordRequest = parse_request(self.name(), arguments)?;
        let manager = workspace.manager_mut(request.file_manager_id.as_deref())?;

        let options = GrepOptions::default()
            .with_recursive(request.recursive)
            .with_case_insensitive(request.case_insensitive);
        let outcome = manager
            .grep(&request.word, &request.pattern, options)
            .map(|matches| SearchWordResponse { matches })
            .map_err(|e| e.to_string());
        respond(manager, outcome)
    }
}
