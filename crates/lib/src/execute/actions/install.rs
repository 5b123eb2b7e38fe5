//! Copying build output into the artifact directory.

use std::path::Path;

use tokio::fs;
use tracing::debug;

use crate::execute::types::ExecuteError;

/// Copy `from` to `to`, creating parent directories, and apply `mode`.
///
/// The copy goes through a sibling temporary name so `to` only appears once
/// it is complete.
pub async fn execute_install(from: &Path, to: &Path, mode: u32) -> Result<(), ExecuteError> {
  debug!(from = %from.display(), to = %to.display(), mode = %format!("{mode:o}"), "installing file");

  if let Some(parent) = to.parent() {
    fs::create_dir_all(parent).await?;
  }

  let staging = to.with_extension("installing");
  fs::copy(from, &staging).await?;
  set_mode(&staging, mode).await?;
  fs::rename(&staging, to).await?;
  Ok(())
}

#[cfg(unix)]
async fn set_mode(path: &Path, mode: u32) -> std::io::Result<()> {
  use std::os::unix::fs::PermissionsExt;
  fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).await
}

#[cfg(not(unix))]
async fn set_mode(_path: &Path, _mode: u32) -> std::io::Result<()> {
  Ok(())
}
