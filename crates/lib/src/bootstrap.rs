//! OS package bootstrap.
//!
//! Build prerequisites are installed once, before any component builds, with
//! a single package-manager invocation. A failure is fatal to the run.

use std::collections::BTreeSet;

use thiserror::Error;
use tracing::info;

use crate::execute::{ExecuteError, Invocation, Runner};
use crate::pipeline::Bootstrap;

#[derive(Debug, Error)]
pub enum BootstrapError {
  #[error("bootstrap command is empty")]
  EmptyCommand,

  #[error("failed to install build prerequisites: {0}")]
  Install(#[source] ExecuteError),
}

/// The package-manager invocation for `bootstrap`, packages deduplicated and
/// sorted so the command line is stable.
pub fn bootstrap_invocation(bootstrap: &Bootstrap) -> Result<Invocation, BootstrapError> {
  let packages: BTreeSet<&str> = bootstrap.packages.iter().map(String::as_str).collect();
  let invocation = Invocation::from_argv(&bootstrap.command).ok_or(BootstrapError::EmptyCommand)?;
  Ok(invocation.args(packages))
}

pub async fn bootstrap(runner: &impl Runner, bootstrap: &Bootstrap) -> Result<(), BootstrapError> {
  let invocation = bootstrap_invocation(bootstrap)?;
  info!(packages = bootstrap.packages.len(), "installing build prerequisites");
  runner.run(&invocation).await.map_err(BootstrapError::Install)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::util::testutil::RecordingRunner;

  fn packages(names: &[&str]) -> Bootstrap {
    Bootstrap {
      command: vec!["dnf".to_string(), "install".to_string(), "-y".to_string()],
      packages: names.iter().map(|s| s.to_string()).collect(),
    }
  }

  #[tokio::test]
  async fn single_sorted_deduplicated_invocation() {
    let runner = RecordingRunner::dry();

    bootstrap(&runner, &packages(&["make", "git", "go", "git"])).await.unwrap();

    assert_eq!(runner.commands(), vec!["dnf install -y git go make"]);
  }

  #[tokio::test]
  async fn failure_is_bootstrap_error() {
    let runner = RecordingRunner::dry().failing_on("dnf");

    let result = bootstrap(&runner, &packages(&["git"])).await;

    assert!(matches!(result, Err(BootstrapError::Install(_))));
  }

  #[test]
  fn empty_command_rejected() {
    let empty = Bootstrap {
      command: vec![],
      packages: vec!["git".to_string()],
    };
    assert!(matches!(bootstrap_invocation(&empty), Err(BootstrapError::EmptyCommand)));
  }
}
