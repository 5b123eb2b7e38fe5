//! External command execution.
//!
//! Build tools run with the caller's environment plus the invocation's
//! overrides; upstream makefiles and toolchains rely on `PATH`, `HOME` and
//! friends, so nothing is cleared.

use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info};

use crate::execute::types::{ExecuteError, Invocation};

/// Run an invocation to completion.
///
/// With `quiet`, stdout and stderr are captured and only logged at debug
/// level when the command fails. Otherwise both go to pinforge's stderr so
/// long builds stay visible.
pub async fn execute_cmd(invocation: &Invocation, quiet: bool) -> Result<(), ExecuteError> {
  info!(cmd = %invocation, "executing command");

  let mut command = Command::new(&invocation.program);
  command.args(&invocation.args).envs(&invocation.env).stdin(Stdio::null());

  if let Some(cwd) = &invocation.cwd {
    command.current_dir(cwd);
  }

  debug!(program = %invocation.program, cwd = ?invocation.cwd, "spawning process");

  let status = if quiet {
    let output = command.output().await.map_err(|source| ExecuteError::Spawn {
      program: invocation.program.clone(),
      source,
    })?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      let stdout = String::from_utf8_lossy(&output.stdout);
      if !stderr.is_empty() {
        debug!(stderr = %stderr, "command stderr");
      }
      if !stdout.is_empty() {
        debug!(stdout = %stdout, "command stdout");
      }
    }
    output.status
  } else {
    // stdout is reserved for pinforge's own report.
    command.stdout(Stdio::from(std::io::stderr())).stderr(Stdio::inherit());
    command.status().await.map_err(|source| ExecuteError::Spawn {
      program: invocation.program.clone(),
      source,
    })?
  };

  if !status.success() {
    return Err(ExecuteError::CmdFailed {
      command: invocation.to_string(),
      code: status.code(),
    });
  }

  Ok(())
}

#[cfg(test)]
#[cfg(unix)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  fn sh(script: &str) -> Invocation {
    Invocation::new("/bin/sh").args(["-c", script])
  }

  #[tokio::test]
  async fn successful_command() {
    execute_cmd(&sh("exit 0"), true).await.unwrap();
  }

  #[tokio::test]
  async fn failing_command_reports_exit_code() {
    let result = execute_cmd(&sh("exit 3"), true).await;
    assert!(matches!(result, Err(ExecuteError::CmdFailed { code: Some(3), .. })));
  }

  #[tokio::test]
  async fn missing_program_is_spawn_error() {
    let result = execute_cmd(&Invocation::new("/nonexistent/tool-12345"), true).await;
    assert!(matches!(result, Err(ExecuteError::Spawn { .. })));
  }

  #[tokio::test]
  async fn runs_in_working_directory_with_env() {
    let temp = TempDir::new().unwrap();
    let inv = sh("echo \"$GREETING\" > marker").cwd(temp.path()).env("GREETING", "hello");

    execute_cmd(&inv, true).await.unwrap();

    let content = std::fs::read_to_string(temp.path().join("marker")).unwrap();
    assert_eq!(content.trim(), "hello");
  }

  #[tokio::test]
  async fn inherits_parent_environment() {
    let temp = TempDir::new().unwrap();
    let inv = sh("test -n \"$PATH\" && touch ok").cwd(temp.path());

    execute_cmd(&inv, true).await.unwrap();

    assert!(temp.path().join("ok").exists());
  }
}
