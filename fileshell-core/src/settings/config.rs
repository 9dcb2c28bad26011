use std::collections::HashMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::execution::DEFAULT_COMMAND_TIMEOUT;
use crate::file::handle::DEFAULT_WINDOW;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FileSettings {
    /// Number of lines a newly opened file shows at once
    #[serde(default = "default_window")]
    pub window: usize,
}

fn default_window() -> usize {
    DEFAULT_WINDOW
}

impl Default for FileSettings {
    fn default() -> Self {
        Self {
            window: default_window(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ExecutionSettings {
    /// Seconds a shell command may run before it is killed
    #[serde(default = "default_command_timeout")]
    pub timeout_seconds: u64,
}

fn default_command_timeout() -> u64 {
    DEFAULT_COMMAND_TIMEOUT.as_secs()
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: default_command_timeout(),
        }
    }
}

/// Post-edit checks, keyed by file extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct LintSettings {
    #[serde(default = "default_lint_timeout")]
    pub timeout_seconds: u64,

    /// Command template per extension. `{path}` is replaced with the edited
    /// file.
    #[serde(default = "default_lint_commands")]
    pub commands: HashMap<String, String>,
}

fn default_lint_timeout() -> u64 {
    30
}

fn default_lint_commands() -> HashMap<String, String> {
    HashMap::from([("py".to_string(), "python3 -m py_compile {path}".to_string())])
}

impl Default for LintSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: default_lint_timeout(),
            commands: default_lint_commands(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Settings {
    #[serde(default)]
    pub file: FileSettings,

    #[serde(default)]
    pub execution: ExecutionSettings,

    #[serde(default)]
    pub lint: LintSettings,
}
