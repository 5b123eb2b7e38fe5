//! Package assembly.
//!
//! The packaging tool reads the rendered manifest and finds every declared
//! source in the flat directory. Both directories are passed as absolute
//! paths since the tool resolves them from its own working directory.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::execute::{ExecuteError, Invocation, Runner};
use crate::pipeline::PackagingTool;

#[derive(Debug, Error)]
pub enum PackageError {
  #[error("cannot resolve '{}': {source}", path.display())]
  Resolve {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("packaging tool failed: {0}")]
  ToolFailed(#[source] ExecuteError),
}

fn absolute(path: &Path) -> Result<PathBuf, PackageError> {
  std::path::absolute(path).map_err(|source| PackageError::Resolve {
    path: path.to_path_buf(),
    source,
  })
}

pub fn package_invocation(
  tool: &PackagingTool,
  manifest: &Path,
  source_dir: &Path,
  top_dir: &Path,
) -> Result<Invocation, PackageError> {
  let source_dir = absolute(source_dir)?;
  let top_dir = absolute(top_dir)?;
  Ok(
    Invocation::new(&tool.program)
      .args(["--define".to_string(), format!("_sourcedir {}", source_dir.display())])
      .args(["--define".to_string(), format!("_topdir {}", top_dir.display())])
      .args(&tool.args)
      .arg(manifest.to_string_lossy()),
  )
}

/// Run the packaging tool on `manifest`.
pub async fn package(
  runner: &impl Runner,
  tool: &PackagingTool,
  manifest: &Path,
  source_dir: &Path,
  top_dir: &Path,
) -> Result<(), PackageError> {
  let invocation = package_invocation(tool, manifest, source_dir, top_dir)?;
  info!(manifest = %manifest.display(), "assembling package");
  runner.run(&invocation).await.map_err(PackageError::ToolFailed)
}
