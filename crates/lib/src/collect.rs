//! Artifact collection.
//!
//! Most components name their outputs up front. A directory output (the CNI
//! plugins) only has a known cardinality after its recipe ran, so it is
//! enumerated here and kept apart from the fixed outputs until every
//! component is done. Slots are assigned on the complete [`ArtifactSet`].

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::build::BuiltComponent;

#[derive(Debug, Error)]
pub enum CollectError {
  #[error("failed to list artifact directory '{}': {source}", path.display())]
  ReadDir {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("artifact path '{}' has no usable file name", path.display())]
  InvalidName { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "class", rename_all = "snake_case")]
pub enum ArtifactClass {
  /// A named executable installed at the root of the install tree.
  Primary,
  /// One entry of a directory output, installed under `subdir`.
  Plugin { subdir: String },
}

/// A build output binary consumed by the package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
  pub path: PathBuf,
  /// Final path segment, also the name in the flat source directory.
  pub name: String,
  pub class: ArtifactClass,
  pub component: String,
}

impl Artifact {
  pub fn new(path: PathBuf, class: ArtifactClass, component: &str) -> Result<Self, CollectError> {
    let name = path
      .file_name()
      .and_then(|n| n.to_str())
      .map(str::to_string)
      .ok_or_else(|| CollectError::InvalidName { path: path.clone() })?;
    Ok(Self {
      path,
      name,
      class,
      component: component.to_string(),
    })
  }

  pub fn is_plugin(&self) -> bool {
    matches!(self.class, ArtifactClass::Plugin { .. })
  }
}

/// Turn every non-directory entry of `dir` into an artifact, sorted by name.
pub fn collect_variable(dir: &Path, subdir: &str, component: &str) -> Result<Vec<Artifact>, CollectError> {
  let entries = fs::read_dir(dir).map_err(|source| CollectError::ReadDir {
    path: dir.to_path_buf(),
    source,
  })?;

  let mut paths = Vec::new();
  for entry in entries {
    let entry = entry.map_err(|source| CollectError::ReadDir {
      path: dir.to_path_buf(),
      source,
    })?;
    let path = entry.path();
    if !path.is_dir() {
      paths.push(path);
    }
  }
  paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

  let artifacts = paths
    .into_iter()
    .map(|path| {
      Artifact::new(
        path,
        ArtifactClass::Plugin {
          subdir: subdir.to_string(),
        },
        component,
      )
    })
    .collect::<Result<Vec<_>, _>>()?;

  debug!(dir = %dir.display(), count = artifacts.len(), component, "collected directory artifacts");
  Ok(artifacts)
}

/// Every artifact of a run, in slot order once complete.
#[derive(Debug, Default, Clone)]
pub struct ArtifactSet {
  fixed: Vec<Artifact>,
  variable: Vec<Artifact>,
}

impl ArtifactSet {
  pub fn new() -> Self {
    Self::default()
  }

  /// Add a component's artifacts. Call in component order.
  pub fn push(&mut self, built: BuiltComponent) {
    for artifact in built.artifacts {
      if artifact.is_plugin() {
        self.variable.push(artifact);
      } else {
        self.fixed.push(artifact);
      }
    }
  }

  /// Fixed artifacts in component order, then directory artifacts.
  pub fn ordered(&self) -> impl Iterator<Item = &Artifact> {
    self.fixed.iter().chain(self.variable.iter())
  }

  pub fn len(&self) -> usize {
    self.fixed.len() + self.variable.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

impl FromIterator<BuiltComponent> for ArtifactSet {
  fn from_iter<I: IntoIterator<Item = BuiltComponent>>(iter: I) -> Self {
    let mut set = ArtifactSet::new();
    for built in iter {
      set.push(built);
    }
    set
  }
}
