//! Flat source directory.
//!
//! The packaging tool looks up every `SourceN:` name in a single directory.
//! Artifacts live all over the cache, so each one is exposed there as a
//! symbolic link named after its logical name. Existing entries, including
//! dangling links, are never followed, replaced or copied over.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::manifest::SlotBinding;

#[derive(Debug, Error)]
pub enum LinkError {
  #[error("failed to create link directory '{}': {source}", path.display())]
  CreateDir {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("source '{name}' not found at '{}': {source}", path.display())]
  MissingSource {
    name: String,
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to link '{name}' into '{}': {source}", path.display())]
  Link {
    name: String,
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// One entry to expose in the flat directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkItem {
  pub name: String,
  pub source: PathBuf,
}

impl LinkItem {
  /// Link item for a manifest binding; relative sources are taken relative
  /// to `base`.
  pub fn from_binding(binding: &SlotBinding, base: &Path) -> Self {
    let source = if binding.source.is_absolute() {
      binding.source.clone()
    } else {
      base.join(&binding.source)
    };
    Self {
      name: binding.name.clone(),
      source,
    }
  }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LinkReport {
  pub created: usize,
  pub existing: usize,
}

/// Make every item reachable as `flat_dir/<name>`.
pub fn ensure_linked(flat_dir: &Path, items: &[LinkItem]) -> Result<LinkReport, LinkError> {
  fs::create_dir_all(flat_dir).map_err(|source| LinkError::CreateDir {
    path: flat_dir.to_path_buf(),
    source,
  })?;

  let mut report = LinkReport::default();
  for item in items {
    let dest = flat_dir.join(&item.name);

    // symlink_metadata does not follow links, so a dangling link counts too.
    if fs::symlink_metadata(&dest).is_ok() {
      debug!(name = %item.name, "already linked");
      report.existing += 1;
      continue;
    }

    let target = dunce::canonicalize(&item.source).map_err(|source| LinkError::MissingSource {
      name: item.name.clone(),
      path: item.source.clone(),
      source,
    })?;
    symlink(&target, &dest).map_err(|source| LinkError::Link {
      name: item.name.clone(),
      path: flat_dir.to_path_buf(),
      source,
    })?;
    debug!(name = %item.name, target = %target.display(), "linked source");
    report.created += 1;
  }
  Ok(report)
}

#[cfg(unix)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
  std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
  std::os::windows::fs::symlink_file(target, link)
}
