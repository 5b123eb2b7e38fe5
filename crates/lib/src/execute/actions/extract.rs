//! Release archive extraction.

use std::fs::File;
use std::path::Path;

use flate2::read::GzDecoder;
use tracing::info;

use crate::execute::types::ExecuteError;

/// Unpack a gzip-compressed tarball into `into`.
///
/// Ownership recorded in the archive is ignored; extracted files belong to the
/// invoking user.
pub async fn execute_extract(archive: &Path, into: &Path) -> Result<(), ExecuteError> {
  info!(archive = %archive.display(), into = %into.display(), "extracting archive");

  let archive = archive.to_path_buf();
  let into = into.to_path_buf();
  tokio::task::spawn_blocking(move || unpack(&archive, &into))
    .await
    .map_err(|e| ExecuteError::Io(std::io::Error::other(e)))?
}

fn unpack(archive: &Path, into: &Path) -> Result<(), ExecuteError> {
  let wrap = |source| ExecuteError::Extract {
    path: archive.to_path_buf(),
    source,
  };

  std::fs::create_dir_all(into)?;
  let file = File::open(archive).map_err(wrap)?;
  let mut tarball = tar::Archive::new(GzDecoder::new(file));
  tarball.set_preserve_ownerships(false);
  tarball.set_preserve_permissions(true);
  tarball.unpack(into).map_err(wrap)
}
