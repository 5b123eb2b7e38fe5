mod build;
mod manifest;
mod pipeline;
mod plan;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use pinforge_lib::cache::CacheRoot;
use pinforge_lib::pipeline::{Pipeline, load, silverkube};

use crate::Target;

pub use build::{BuildFlags, cmd_build};
pub use manifest::cmd_manifest;
pub use pipeline::cmd_pipeline;
pub use plan::cmd_plan;

/// Load the selected pipeline and the directory its payload paths are
/// relative to.
fn load_pipeline(path: Option<&Path>) -> Result<(Pipeline, PathBuf)> {
  match path {
    Some(path) => {
      let pipeline = load(path)?;
      let parent = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
      };
      let payload_dir = dunce::canonicalize(parent)
        .with_context(|| format!("Failed to resolve pipeline directory: {}", parent.display()))?;
      debug!(payload_dir = %payload_dir.display(), "resolved payload directory");
      Ok((pipeline, payload_dir))
    }
    None => {
      let cwd = std::env::current_dir().context("Failed to read current directory")?;
      Ok((silverkube(), cwd))
    }
  }
}

fn cache_root(target: &Target) -> CacheRoot {
  match &target.cache_dir {
    Some(dir) => CacheRoot::new(dir),
    None => CacheRoot::from_env(),
  }
}
