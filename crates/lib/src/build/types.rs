use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use super::patch::PatchError;
use crate::cache::CacheRoot;
use crate::collect::{Artifact, CollectError};
use crate::execute::ExecuteError;
use crate::fetch::FetchError;
use crate::placeholder::PlaceholderError;
use crate::toolchain::ToolchainError;

#[derive(Debug, Error)]
pub enum BuildError {
  #[error("component '{component}': {source}")]
  Placeholder {
    component: String,
    #[source]
    source: PlaceholderError,
  },

  #[error("component '{component}': {source}")]
  Toolchain {
    component: String,
    #[source]
    source: ToolchainError,
  },

  #[error("component '{component}': {source}")]
  Fetch {
    component: String,
    #[source]
    source: FetchError,
  },

  #[error("component '{component}': patch application failed: {source}")]
  PatchFailed {
    component: String,
    #[source]
    source: PatchError,
  },

  /// A recipe step exited non-zero. `step` is 1-based.
  #[error("component '{component}' step {step} failed: {command}: {source}")]
  StepFailed {
    component: String,
    step: usize,
    command: String,
    #[source]
    source: ExecuteError,
  },

  #[error("component '{component}' step {step} is invalid: {reason}")]
  InvalidStep {
    component: String,
    step: usize,
    reason: String,
  },

  #[error("component '{component}' finished but did not produce '{}'", path.display())]
  MissingOutput { component: String, path: PathBuf },

  #[error(transparent)]
  Collect(#[from] CollectError),

  #[error("failed to prepare cache directories: {0}")]
  Io(#[from] std::io::Error),
}

/// Shared inputs of every component build in a run.
#[derive(Debug, Clone, Copy)]
pub struct BuildContext<'a> {
  pub cache: &'a CacheRoot,
  /// Pipeline-wide environment, applied before component and step env.
  pub env: &'a BTreeMap<String, String>,
}

/// Outcome of building (or skipping) one component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuiltComponent {
  pub name: String,
  pub artifacts: Vec<Artifact>,
  /// True when every expected output already existed and nothing ran.
  pub cached: bool,
}
