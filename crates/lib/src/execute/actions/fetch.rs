//! HTTP downloads for release artifacts and toolchain binaries.
//!
//! Content is not checked against a digest. Downloads land in a `.part` file
//! that is renamed on completion, so an interrupted run never leaves
//! something that looks finished.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::execute::types::ExecuteError;

/// Download `url` to `dest`, creating parent directories.
///
/// The body is streamed to disk chunk by chunk; toolchain binaries run to
/// hundreds of megabytes.
pub async fn execute_fetch(url: &str, dest: &Path) -> Result<(), ExecuteError> {
  let failed = |message: String| ExecuteError::FetchFailed {
    url: url.to_string(),
    message,
  };
  info!(url = %url, dest = %dest.display(), "downloading");

  let mut response = reqwest::get(url).await.map_err(|e| failed(e.to_string()))?;
  let status = response.status();
  if !status.is_success() {
    return Err(failed(format!("HTTP {status}")));
  }

  if let Some(parent) = dest.parent() {
    fs::create_dir_all(parent).await?;
  }
  let partial = partial_path(dest);
  let mut file = fs::File::create(&partial).await?;
  let mut written = 0u64;
  while let Some(chunk) = response.chunk().await.map_err(|e| failed(e.to_string()))? {
    file.write_all(&chunk).await?;
    written += chunk.len() as u64;
  }
  file.sync_all().await?;
  drop(file);
  fs::rename(&partial, dest).await?;

  info!(path = %dest.display(), bytes = written, "download complete");
  Ok(())
}

fn partial_path(dest: &Path) -> PathBuf {
  let mut name = dest.file_name().map(OsString::from).unwrap_or_default();
  name.push(".part");
  dest.with_file_name(name)
}

/// File name for a download without an explicit destination: the last URL
/// path segment with the query dropped and unsafe characters replaced. URLs
/// without a usable segment get a name derived from their hash.
pub fn url_to_filename(url: &str) -> String {
  let segment = url.split(['?', '#']).next().unwrap_or(url);
  let segment = segment.rsplit('/').next().unwrap_or_default();
  let name: String = segment
    .chars()
    .map(|c| match c {
      'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' => c,
      _ => '_',
    })
    .collect();

  match name.as_str() {
    "" | "." | ".." => {
      let digest = hex::encode(Sha256::digest(url.as_bytes()));
      format!("download_{}", &digest[..16])
    }
    _ => name,
  }
}
