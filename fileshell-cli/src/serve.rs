use std::sync::Arc;

use anyhow::Result;
use fileshell_core::{CommandLinter, FileManager, FileTool, Settings, Workspace};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};

#[derive(Debug, Deserialize)]
struct ServeRequest {
    action: String,
    #[serde(default)]
    arguments: Value,
}

/// Reads one `{"action", "arguments"}` object per line from stdin and writes
/// one response object per line to stdout. A line that cannot be dispatched
/// gets `{"error": ...}` back and the loop continues.
pub async fn run_serve(manager: FileManager, settings: &Settings) -> Result<()> {
    let mut workspace = Workspace::new(Arc::new(CommandLinter::from_settings(&settings.lint)));
    let id = workspace.add_manager(manager);
    let tool = FileTool::default();
    tracing::info!(%id, actions = ?tool.list_actions(), "Serving actions");

    let mut stdout = io::stdout();
    let mut stdin = BufReader::new(io::stdin()).lines();
    while let Some(line) = stdin.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<ServeRequest>(&line) {
            Ok(request) => tool
                .execute(&mut workspace, &request.action, request.arguments)
                .await
                .unwrap_or_else(|e| json!({ "error": format!("{e:#}") })),
            Err(e) => json!({ "error": format!("Invalid request: {e}") }),
        };

        let json = serde_json::to_string(&response)?;
        stdout.write_all(format!("{json}\n").as_bytes()).await?;
        stdout.flush().await?;
    }
    Ok(())
}
