use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;

use crate::error::{FileError, IoContext, Result};

/// Hard limit for shell commands issued through a file manager.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, Serialize)]
pub struct CommandResult {
    pub command: String,
    /// `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    pub out: String,
    pub err: String,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs `bash -c <cmd>` in `dir`.
pub async fn run_shell(dir: &Path, cmd: &str, timeout: Duration) -> Result<CommandResult> {
    let args = vec!["-c".to_string(), cmd.to_string()];
    run_cmd(dir, "bash", &args, timeout).await
}

/// Spawns `program` in `dir`, buffers stdout and stderr, and waits for it to
/// exit with both pipes closed. If `timeout` passes first the process is
/// killed and [`FileError::Timeout`] is returned; if the kill itself fails
/// the result is [`FileError::KillFailed`] instead.
pub async fn run_cmd(
    dir: &Path,
    program: &str,
    args: &[String],
    timeout: Duration,
) -> Result<CommandResult> {
    let command = display_command(program, args);
    tracing::info!(?dir, %command, ?timeout, "Attempting to run_cmd");

    let mut child = Command::new(program)
        .args(args)
        .current_dir(dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .io_context(|| format!("Failed to spawn command: {command}"))?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());
    let readers = [stdout.abort_handle(), stderr.abort_handle()];

    // A background job can inherit the pipes and keep them open after the
    // shell exits, so the deadline covers draining the output too.
    let finished = tokio::time::timeout(timeout, async {
        let status = child
            .wait()
            .await
            .io_context(|| format!("Failed to wait for command: {command}"))?;
        let out = collect(stdout).await?;
        let err = collect(stderr).await?;
        Ok::<_, FileError>((status, out, err))
    })
    .await;

    let (status, out, err) = match finished {
        Ok(outcome) => outcome?,
        Err(_) => {
            for reader in &readers {
                reader.abort();
            }
            tracing::warn!(%command, ?timeout, "Command timed out, killing process");
            if !matches!(child.try_wait(), Ok(Some(_))) {
                child.kill().await.map_err(FileError::KillFailed)?;
            }
            return Err(FileError::Timeout {
                seconds: timeout.as_secs(),
            });
        }
    };

    tracing::info!(%command, code = ?status.code(), "Command finished");

    Ok(CommandResult {
        command,
        code: status.code(),
        out,
        err,
    })
}

fn drain<R>(pipe: Option<R>) -> JoinHandle<std::io::Result<Vec<u8>>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            pipe.read_to_end(&mut buf).await?;
        }
        Ok(buf)
    })
}

async fn collect(handle: JoinHandle<std::io::Result<Vec<u8>>>) -> Result<String> {
    let bytes = handle
        .await
        .map_err(|e| FileError::io("Output reader task failed", std::io::Error::other(e)))?
        .io_context(|| "Failed to read command output")?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn display_command(program: &str, args: &[String]) -> String {
    if program == "bash" && args.len() == 2 && args[0] == "-c" {
        return args[1].clone();
    }
    std::iter::once(program.to_string())
        .chain(args.iter().cloned())
        .collect::<Vec<_>>()
        .join(" ")
}
