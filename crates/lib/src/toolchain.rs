//! External toolchain preconditions.
//!
//! Some components need a build tool that the OS bootstrap does not provide
//! (kubernetes needs a specific bazel release). A [`Toolchain`] names the
//! binary, where it must live and where to get it. Ensuring it is a
//! capability check that runs before the component's recipe and is skipped
//! entirely once the binary is present.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::execute::{ExecuteError, Runner};
use crate::pipeline::{Mode, Toolchain};
use crate::placeholder::{PlaceholderError, Resolver, substitute, substitute_path};

#[derive(Debug, Error)]
pub enum ToolchainError {
  #[error("toolchain '{name}': {source}")]
  Placeholder {
    name: String,
    #[source]
    source: PlaceholderError,
  },

  #[error("failed to install toolchain '{name}' to '{}': {source}", path.display())]
  Install {
    name: String,
    path: PathBuf,
    #[source]
    source: ExecuteError,
  },
}

/// Make sure `toolchain` exists at its fixed path, downloading it if absent.
///
/// Returns the resolved path of the binary.
pub async fn ensure_toolchain(
  runner: &impl Runner,
  toolchain: &Toolchain,
  resolver: &impl Resolver,
) -> Result<PathBuf, ToolchainError> {
  let placeholder = |source| ToolchainError::Placeholder {
    name: toolchain.name.clone(),
    source,
  };
  let path = substitute_path(&toolchain.path, resolver).map_err(placeholder)?;

  if path.exists() {
    debug!(toolchain = %toolchain.name, path = %path.display(), "toolchain present");
    return Ok(path);
  }

  let url = substitute(&toolchain.url, resolver).map_err(placeholder)?;
  info!(toolchain = %toolchain.name, url = %url, "installing toolchain");

  let install = |source| ToolchainError::Install {
    name: toolchain.name.clone(),
    path: path.clone(),
    source,
  };
  runner.download(&url, &path).await.map_err(install)?;
  set_mode(&path, toolchain.mode).map_err(|e| install(ExecuteError::Io(e)))?;

  Ok(path)
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: Mode) -> std::io::Result<()> {
  use std::os::unix::fs::PermissionsExt;
  std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode.0))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: Mode) -> std::io::Result<()> {
  Ok(())
}

/// `PATH` with the toolchain directories prepended so recipes can call
/// toolchains by name. `configured` is a `PATH` set in the pipeline or
/// component env; without one the process `PATH` is extended.
pub fn search_path(resolved: &[PathBuf], configured: Option<&str>) -> Option<String> {
  let dirs: Vec<&Path> = resolved.iter().filter_map(|p| p.parent()).collect();
  if dirs.is_empty() {
    return None;
  }
  let base = match configured {
    Some(path) => OsString::from(path),
    None => std::env::var_os("PATH").unwrap_or_default(),
  };
  let mut entries: Vec<PathBuf> = dirs.into_iter().map(Path::to_path_buf).collect();
  entries.extend(std::env::split_paths(&base));
  let joined = std::env::join_paths(entries).ok()?;
  Some(joined.to_string_lossy().into_owned())
}
