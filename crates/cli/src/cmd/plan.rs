//! Implementation of the `pinforge plan` command.
//!
//! Reports, per component, whether every expected output is already in the
//! cache. Nothing is fetched, built or locked.

use anyhow::{Context, Result};

use pinforge_lib::orchestrate::{ComponentState, plan};

use crate::Target;
use crate::output::{OutputFormat, print_cached, print_json, print_pending, print_stat};

pub fn cmd_plan(target: &Target, output: OutputFormat) -> Result<()> {
  let (pipeline, _) = super::load_pipeline(target.pipeline.as_deref())?;
  let cache = super::cache_root(target);

  let statuses = plan(&pipeline, &cache).context("Failed to plan build")?;

  if output.is_json() {
    return print_json(&statuses);
  }

  println!("Plan for {} ({})", pipeline.package.name, cache.root().display());
  for status in &statuses {
    match status.state {
      ComponentState::Cached => print_cached(&format!("{} (cached)", status.name)),
      ComponentState::Pending => print_pending(&format!("{} (to build)", status.name)),
    }
  }

  let pending = statuses.iter().filter(|s| s.state == ComponentState::Pending).count();
  println!();
  print_stat("Components", &statuses.len().to_string());
  print_stat("Cached", &(statuses.len() - pending).to_string());
  print_stat("To build", &pending.to_string());

  Ok(())
}
