use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::execution::run_cmd;
use crate::settings::config::LintSettings;

/// Post-edit syntax check. An `Err` carries the message shown to the caller
/// and causes the edit to be rolled back.
#[async_trait::async_trait]
pub trait Linter: Send + Sync {
    async fn lint(&self, path: &Path) -> Result<(), String>;
}

/// Accepts every edit.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLint;

#[async_trait::async_trait]
impl Linter for NoLint {
    async fn lint(&self, _path: &Path) -> Result<(), String> {
        Ok(())
    }
}

/// Runs an external checker chosen by file extension. Command templates are
/// split shell-style and `{path}` is replaced with the edited file. Files
/// with no configured command pass.
#[derive(Debug, Clone)]
pub struct CommandLinter {
    commands: HashMap<String, String>,
    timeout: Duration,
}

impl CommandLinter {
    pub fn new(commands: HashMap<String, String>, timeout: Duration) -> Self {
        Self { commands, timeout }
    }

    pub fn from_settings(settings: &LintSettings) -> Self {
        Self::new(
            settings.commands.clone(),
            Duration::from_secs(settings.timeout_seconds),
        )
    }

    fn command_for(&self, path: &Path) -> Option<&str> {
        let ext = path.extension()?.to_str()?;
        self.commands.get(ext).map(String::as_str)
    }
}

#[async_trait::async_trait]
impl Linter for CommandLinter {
    async fn lint(&self, path: &Path) -> Result<(), String> {
        let Some(template) = self.command_for(path) else {
            return Ok(());
        };

        let parts = shell_words::split(template)
            .map_err(|e| format!("Failed to parse lint command {template:?}: {e:?}"))?;
        let Some((program, args)) = parts.split_first() else {
            return Err(format!("Empty lint command for {}", path.display()));
        };

        let path_str = path.to_string_lossy();
        let args: Vec<String> = args.iter().map(|a| a.replace("{path}", &path_str)).collect();
        let dir = path.parent().unwrap_or_else(|| Path::new("."));

        let result = run_cmd(dir, program, &args, self.timeout)
            .await
            .map_err(|e| e.to_string())?;

        if result.success() {
            return Ok(());
        }

        let detail = if result.err.trim().is_empty() {
            result.out
        } else {
            result.err
        };
        Err(detail.trim().to_string())
    }
}
