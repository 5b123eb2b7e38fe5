use std::path::PathBuf;

use thiserror::Error;

use crate::bootstrap::BootstrapError;
use crate::build::BuildError;
use crate::cache_lock::CacheLockError;
use crate::link::LinkError;
use crate::manifest::ManifestError;
use crate::package::PackageError;
use crate::pipeline::PipelineError;

/// Any error that aborts a run.
#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Pipeline(#[from] PipelineError),

  #[error(transparent)]
  Lock(#[from] CacheLockError),

  #[error(transparent)]
  Bootstrap(#[from] BootstrapError),

  #[error(transparent)]
  Build(#[from] BuildError),

  #[error(transparent)]
  Manifest(#[from] ManifestError),

  #[error("failed to write manifest '{}': {source}", path.display())]
  WriteManifest {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error(transparent)]
  Link(#[from] LinkError),

  #[error(transparent)]
  Package(#[from] PackageError),

  /// The manifest was requested from the cache but a component is missing.
  #[error("component '{0}' has not been built yet; run `pinforge build` first")]
  NotBuilt(String),

  #[error("failed to prepare cache '{}': {source}", path.display())]
  Cache {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}
