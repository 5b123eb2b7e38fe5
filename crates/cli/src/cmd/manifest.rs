//! Implementation of the `pinforge manifest` command.

use std::path::Path;

use anyhow::{Context, Result};

use pinforge_lib::orchestrate::render_cached;

use crate::Target;
use crate::output::print_success;

pub fn cmd_manifest(target: &Target, output: Option<&Path>) -> Result<()> {
  let (pipeline, _) = super::load_pipeline(target.pipeline.as_deref())?;
  let cache = super::cache_root(target);

  let manifest = render_cached(&pipeline, &cache).context("Failed to render manifest")?;

  match output {
    Some(path) => {
      manifest
        .write_to(path)
        .with_context(|| format!("Failed to write manifest: {}", path.display()))?;
      print_success(&format!(
        "Wrote {} ({} sources)",
        path.display(),
        manifest.bindings().len()
      ));
    }
    None => print!("{manifest}"),
  }

  Ok(())
}
