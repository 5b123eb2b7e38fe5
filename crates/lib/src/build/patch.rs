//! Source patches applied before a component's recipe.
//!
//! The patch repository is pinned and fetched like any other source. Its
//! patch files are applied with a single `git am`, so the series either lands
//! completely or is aborted and the working copy keeps the pinned tree.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use crate::cache::CacheRoot;
use crate::execute::{ExecuteError, Invocation, Runner};
use crate::fetch::{FetchError, fetch_pinned};
use crate::pipeline::PatchSet;

const COMMITTER_NAME: &str = "pinforge";
const COMMITTER_EMAIL: &str = "pinforge@localhost";

#[derive(Debug, Error)]
pub enum PatchError {
  #[error("failed to fetch patch repository: {0}")]
  Fetch(#[from] FetchError),

  #[error("failed to list patches in '{}': {source}", path.display())]
  List {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("no patches found in '{}'", path.display())]
  Empty { path: PathBuf },

  #[error("{0}")]
  Apply(#[source] ExecuteError),
}

/// Apply every patch of `patches` to the working copy at `work`.
///
/// Returns the number of patches applied.
pub async fn apply_patches(
  runner: &impl Runner,
  cache: &CacheRoot,
  patches: &PatchSet,
  work: &Path,
) -> Result<usize, PatchError> {
  let repo = fetch_pinned(runner, cache, &patches.source).await?;
  let series = list_patches(&repo.path.join(&patches.dir))?;

  // An interrupted run can leave a half-applied series behind.
  if work.join(".git").join("rebase-apply").exists() {
    abort(runner, work).await;
  }

  info!(count = series.len(), work = %work.display(), "applying patches");
  let am = git(work)
    .args(["am", "--quiet"])
    .args(series.iter().map(|p| p.to_string_lossy().into_owned()));

  if let Err(e) = runner.run(&am).await {
    abort(runner, work).await;
    return Err(PatchError::Apply(e));
  }
  Ok(series.len())
}

fn git(work: &Path) -> Invocation {
  Invocation::new("git")
    .args(["-c", &format!("user.name={COMMITTER_NAME}")])
    .args(["-c", &format!("user.email={COMMITTER_EMAIL}")])
    .cwd(work)
}

async fn abort(runner: &impl Runner, work: &Path) {
  if let Err(e) = runner.run(&git(work).args(["am", "--abort"])).await {
    warn!(work = %work.display(), error = %e, "git am --abort failed");
  }
}

/// Patch files of `dir`, sorted by file name.
fn list_patches(dir: &Path) -> Result<Vec<PathBuf>, PatchError> {
  let wrap = |source| PatchError::List {
    path: dir.to_path_buf(),
    source,
  };
  let mut series = Vec::new();
  for entry in fs::read_dir(dir).map_err(wrap)? {
    let path = entry.map_err(wrap)?.path();
    if path.is_file() {
      series.push(path);
    }
  }
  if series.is_empty() {
    return Err(PatchError::Empty { path: dir.to_path_buf() });
  }
  series.sort();
  Ok(series)
}
