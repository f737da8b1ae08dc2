// src/exec/command.rs

use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

use crate::engine::reaction::{Invocation, Reaction, ReactionFuture};

/// Reaction that runs a shell command for each file.
///
/// The command runs through `sh -c` (`cmd /C` on Windows) in `workdir` with:
///
/// - `BISTRO_TASK`: task name
/// - `BISTRO_METHOD`: `update` or `remove`
/// - `BISTRO_NAME`: file name without extension
/// - `BISTRO_FILE`: absolute file path
///
/// Contents read for `read = true` tasks are written to stdin.
#[derive(Debug, Clone)]
pub struct ShellReaction {
    command: String,
    workdir: PathBuf,
}

impl ShellReaction {
    pub fn new(command: impl Into<String>, workdir: impl AsRef<Path>) -> Self {
        Self {
            command: command.into(),
            workdir: workdir.as_ref().to_path_buf(),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

impl Reaction for ShellReaction {
    fn call(&self, invocation: Invocation) -> ReactionFuture {
        let command = self.command.clone();
        let workdir = self.workdir.clone();
        Box::pin(async move { run_command(&command, &workdir, invocation).await })
    }
}

async fn run_command(command: &str, workdir: &Path, inv: Invocation) -> Result<()> {
    debug!(task = %inv.task, method = %inv.method, cmd = %command, "starting reaction process");

    // Build a shell command appropriate for the platform.
    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(command);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(command);
        c
    };

    cmd.current_dir(workdir)
        .env("BISTRO_TASK", &inv.task)
        .env("BISTRO_METHOD", inv.method.as_str())
        .env("BISTRO_NAME", &inv.name)
        .env("BISTRO_FILE", &inv.path)
        .stdin(if inv.contents.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning `{}` for task '{}'", command, inv.task))?;

    if let (Some(mut stdin), Some(contents)) = (child.stdin.take(), inv.contents) {
        // A command that ignores its input may exit before reading it.
        tokio::spawn(async move {
            let _ = stdin.write_all(contents.as_bytes()).await;
        });
    }

    if let Some(stdout) = child.stdout.take() {
        let task = inv.task.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                info!(task = %task, "{}", line);
            }
        });
    }

    // Always consume stderr so buffers don't fill; log at debug.
    if let Some(stderr) = child.stderr.take() {
        let task = inv.task.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(task = %task, "stderr: {}", line);
            }
        });
    }

    let status = child
        .wait()
        .await
        .with_context(|| format!("waiting for `{}` of task '{}'", command, inv.task))?;

    debug!(task = %inv.task, exit_code = ?status.code(), "reaction process exited");

    if !status.success() {
        match status.code() {
            Some(code) => bail!("`{}` exited with status {}", command, code),
            None => bail!("`{}` was terminated by a signal", command),
        }
    }
    Ok(())
}
