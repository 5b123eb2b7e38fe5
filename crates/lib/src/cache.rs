//! Cache root layout.
//!
//! Every piece of mutable state a run touches lives under one root:
//!
//! ```text
//! <root>/
//!   .lock            advisory lock held for the duration of a run
//!   bin/             primary artifacts installed by component recipes
//!   src/             working copies (by URL) and the flat link directory
//!   toolchains/      external toolchain binaries
//! ```
//!
//! The root is passed explicitly to every component, so tests can point it at
//! a temporary directory.

use std::io;
use std::path::{Component, Path, PathBuf};

use crate::consts::CACHE_ENV;
use crate::platform::paths::cache_dir;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRoot {
  root: PathBuf,
}

impl CacheRoot {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  /// Cache root from `PINFORGE_CACHE`, falling back to the user cache directory.
  pub fn from_env() -> Self {
    match std::env::var_os(CACHE_ENV) {
      Some(path) if !path.is_empty() => Self::new(path),
      _ => Self::new(cache_dir()),
    }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  pub fn src_dir(&self) -> PathBuf {
    self.root.join("src")
  }

  pub fn bin_dir(&self) -> PathBuf {
    self.root.join("bin")
  }

  pub fn toolchain_dir(&self) -> PathBuf {
    self.root.join("toolchains")
  }

  /// Deterministic working-copy location for a repository URL.
  ///
  /// The scheme is dropped and the remaining segments are nested under
  /// `src/`. Empty, `.` and `..` segments are discarded so no URL can point
  /// outside the cache.
  pub fn working_copy_path(&self, url: &str) -> PathBuf {
    let without_scheme = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    let mut path = self.src_dir();
    for part in Path::new(without_scheme).components() {
      if let Component::Normal(segment) = part {
        path.push(segment);
      }
    }
    path
  }

  pub fn ensure_dirs(&self) -> io::Result<()> {
    for dir in [self.src_dir(), self.bin_dir()] {
      std::fs::create_dir_all(&dir)?;
    }
    Ok(())
  }
}
