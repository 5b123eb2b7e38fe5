//! Revision-pinned working copies.
//!
//! This module handles:
//! - Cloning repositories into the cache on first use
//! - Fetching from origin when a pin is not yet present locally
//! - Checking out the pinned revision on every call, fresh clone or not
//! - Verifying that `HEAD` really is the pinned commit afterwards
//!
//! # Cache Structure
//!
//! Working copies live at `<cache>/src/<url without scheme>/` with their
//! `.git` directories intact, which doubles as a `GOPATH`-style source tree.
//!
//! Mutations go through the `git` CLI via a [`Runner`]; the repository is only
//! read with `gix`, to resolve revisions and confirm the checkout.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cache::CacheRoot;
use crate::consts::GIT_MARKER;
use crate::execute::{ExecuteError, Invocation, Runner};
use crate::pipeline::GitSource;

/// Errors that can occur while materializing a working copy.
#[derive(Debug, Error)]
pub enum FetchError {
  #[error("failed to prepare working copy directory '{}': {source}", path.display())]
  Prepare {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to clone repository '{url}': {source}")]
  Clone {
    url: String,
    #[source]
    source: ExecuteError,
  },

  /// The pinned revision could not be checked out exactly.
  #[error("cannot check out revision '{revision}' of '{url}': {reason}")]
  RevisionCheckout {
    url: String,
    revision: String,
    reason: String,
  },
}

/// A local clone checked out at a pinned revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingCopy {
  pub path: PathBuf,
  pub url: String,
  pub revision: String,
  /// Commit id `HEAD` was verified against.
  pub commit: String,
}

/// Materialize `source` under the cache and check out its pinned revision.
///
/// An existing clone is reused. The checkout always runs, so a copy left on a
/// different commit by an earlier (possibly interrupted) run converges back to
/// the pin.
pub async fn fetch_pinned(
  runner: &impl Runner,
  cache: &CacheRoot,
  source: &GitSource,
) -> Result<WorkingCopy, FetchError> {
  let path = cache.working_copy_path(&source.url);
  let url = source.url.as_str();
  let revision = source.revision.as_str();

  if path.join(GIT_MARKER).exists() {
    debug!(url, path = %path.display(), "reusing working copy");
  } else {
    prepare_clone_dir(&path)?;
    info!(url, path = %path.display(), "cloning repository");
    let clone = Invocation::new("git")
      .args(["clone", "--quiet", url])
      .arg(path.to_string_lossy());
    runner.run(&clone).await.map_err(|source| FetchError::Clone {
      url: url.to_string(),
      source,
    })?;
  }

  if resolve_commit(&path, revision).is_err() {
    info!(url, revision, "revision not present locally, fetching");
    let fetch = Invocation::new("git").args(["fetch", "--quiet", "--tags", "origin"]).cwd(&path);
    // The pin is unknown locally, so a failed fetch means it cannot be
    // checked out at all.
    runner
      .run(&fetch)
      .await
      .map_err(|e| checkout_error(source, format!("not present locally and fetch failed: {e}")))?;
  }

  let checkout = Invocation::new("git")
    .args(["-c", "advice.detachedHead=false", "checkout", "--quiet", "--force", revision])
    .cwd(&path);
  runner.run(&checkout).await.map_err(|e| checkout_error(source, e.to_string()))?;

  let commit = verify_head(&path, revision).map_err(|reason| checkout_error(source, reason))?;
  debug!(url, revision, commit = %commit, "working copy at pinned revision");

  Ok(WorkingCopy {
    path,
    url: url.to_string(),
    revision: revision.to_string(),
    commit,
  })
}

fn checkout_error(source: &GitSource, reason: String) -> FetchError {
  FetchError::RevisionCheckout {
    url: source.url.clone(),
    revision: source.revision.clone(),
    reason,
  }
}

/// `git clone` refuses a non-empty target. A directory without `.git` can only
/// be the remains of an interrupted clone of this same URL, so it is removed.
fn prepare_clone_dir(path: &Path) -> Result<(), FetchError> {
  let wrap = |source| FetchError::Prepare {
    path: path.to_path_buf(),
    source,
  };

  if path.exists() {
    warn!(path = %path.display(), "removing incomplete working copy");
    fs::remove_dir_all(path).map_err(wrap)?;
  }
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).map_err(wrap)?;
  }
  Ok(())
}

/// Resolve `revision` to a commit id using the local object database only.
pub fn resolve_commit(path: &Path, revision: &str) -> Result<String, String> {
  let repo = gix::open(path).map_err(|e| e.to_string())?;
  let spec = format!("{revision}^{{commit}}");
  let id = repo
    .rev_parse_single(spec.as_str())
    .map_err(|e| format!("revision not found: {e}"))?;
  Ok(id.detach().to_string())
}

/// Confirm `HEAD` is exactly the commit `revision` names.
fn verify_head(path: &Path, revision: &str) -> Result<String, String> {
  let expected = resolve_commit(path, revision)?;
  let repo = gix::open(path).map_err(|e| e.to_string())?;
  let head = repo.head_id().map_err(|e| format!("cannot resolve HEAD: {e}"))?;
  let head = head.detach().to_string();

  if head != expected {
    return Err(format!("HEAD is at {head}, expected {expected}"));
  }
  Ok(head)
}
