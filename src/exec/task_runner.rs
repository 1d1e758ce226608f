// src/exec/task_runner.rs

//! Execution of a single action for a single triggering file.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{anyhow, Context, Result};
use tokio::process::Command;
use tracing::{debug, error, info};

use crate::exec::DispatchOutcome;
use crate::types::Action;

/// Run `action` for `path` to completion and report the outcome.
///
/// Errors are logged with the rule name and path and turned into
/// [`DispatchOutcome::Failed`]; nothing is propagated.
pub async fn run_action(
    rule: String,
    action: Action,
    path: PathBuf,
    path_env: String,
) -> DispatchOutcome {
    let res = match &action {
        Action::Command(cmd) => run_command(&rule, cmd, &path, &path_env).await,
        Action::Callback(callback) => {
            debug!(rule = %rule, path = ?path, "invoking callback action");
            callback(path.clone()).await
        }
    };

    match res {
        Ok(()) => DispatchOutcome::Succeeded,
        Err(err) => {
            error!(
                rule = %rule,
                path = ?path,
                error = %format!("{err:#}"),
                "action failed"
            );
            DispatchOutcome::Failed(format!("{err:#}"))
        }
    }
}

/// Run a shell command with the triggering path exported as `path_env`.
///
/// Stdio is inherited so command output shows up next to the host's output.
async fn run_command(rule: &str, cmd_str: &str, path: &Path, path_env: &str) -> Result<()> {
    info!(rule = %rule, path = ?path, cmd = %cmd_str, "running command");

    // Build a shell command appropriate for the platform.
    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd_str);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd_str);
        c
    };

    cmd.env(path_env, path)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .kill_on_drop(false);

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning command for rule '{rule}'"))?;

    let status = child
        .wait()
        .await
        .with_context(|| format!("waiting for command of rule '{rule}'"))?;

    if status.success() {
        debug!(rule = %rule, path = ?path, "command finished");
        Ok(())
    } else {
        match status.code() {
            Some(code) => Err(anyhow!("command `{cmd_str}` exited with code {code}")),
            None => Err(anyhow!("command `{cmd_str}` was terminated by a signal")),
        }
    }
}
