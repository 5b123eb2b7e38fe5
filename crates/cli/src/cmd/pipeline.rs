use std::path::Path;

use anyhow::Result;

use crate::output::print_json;

pub fn cmd_pipeline(path: Option<&Path>) -> Result<()> {
  let (pipeline, _) = super::load_pipeline(path)?;
  print_json(&pipeline)
}
