//! Implementation of the `pinforge build` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use pinforge_lib::execute::ProcessRunner;
use pinforge_lib::orchestrate::{RunOptions, run};

use crate::Target;
use crate::output::{OutputFormat, format_duration, print_json, print_stat, print_success, truncate_digest};

pub struct BuildFlags {
  pub manifest: Option<PathBuf>,
  pub topdir: PathBuf,
  pub skip_bootstrap: bool,
  pub no_package: bool,
  pub quiet: bool,
}

pub fn cmd_build(target: &Target, flags: BuildFlags, output: OutputFormat) -> Result<()> {
  let (pipeline, payload_dir) = super::load_pipeline(target.pipeline.as_deref())?;

  let options = RunOptions {
    cache: super::cache_root(target),
    payload_dir,
    manifest_path: flags
      .manifest
      .unwrap_or_else(|| PathBuf::from(format!("{}.spec", pipeline.package.name))),
    top_dir: flags.topdir,
    skip_bootstrap: flags.skip_bootstrap,
    no_package: flags.no_package,
  };
  let runner = ProcessRunner::new(flags.quiet);

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let report = rt.block_on(run(&runner, &pipeline, &options)).context("Build failed")?;

  if output.is_json() {
    print_json(&report)?;
  } else {
    println!();
    if report.packaged {
      print_success("Package built!");
    } else {
      print_success("Sources ready!");
    }
    print_stat("Built", &report.built.to_string());
    print_stat("Cached", &report.cached.to_string());
    print_stat("Sources", &report.sources.to_string());
    print_stat(
      "Manifest",
      &format!(
        "{} ({})",
        report.manifest_path.display(),
        truncate_digest(&report.manifest_digest)
      ),
    );
    print_stat(
      "Links",
      &format!("{} created, {} existing", report.links.created, report.links.existing),
    );
    print_stat("Duration", &format_duration(report.elapsed));
  }

  Ok(())
}
