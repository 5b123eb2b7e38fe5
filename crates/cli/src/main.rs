mod cmd;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::output::{OutputFormat, print_error};

/// pinforge - build pinned upstream components into one package
#[derive(Parser)]
#[command(name = "pinforge")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable debug logging
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Output format for summaries
  #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
  format: OutputFormat,

  #[command(subcommand)]
  command: Commands,
}

/// Where the pipeline and the cache come from.
#[derive(Args, Debug, Clone)]
pub struct Target {
  /// Pipeline definition (JSON). Defaults to the built-in silverkube pipeline
  #[arg(short, long)]
  pipeline: Option<PathBuf>,

  /// Cache root. Defaults to $PINFORGE_CACHE or the user cache directory
  #[arg(long)]
  cache_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
  /// Build every component, render the manifest and package it
  Build {
    #[command(flatten)]
    target: Target,

    /// Where to write the manifest (default: <package name>.spec)
    #[arg(short, long)]
    manifest: Option<PathBuf>,

    /// Working tree for the packaging tool
    #[arg(long, default_value = "rpmbuild")]
    topdir: PathBuf,

    /// Do not install OS build prerequisites
    #[arg(long)]
    skip_bootstrap: bool,

    /// Stop after linking sources; do not run the packaging tool
    #[arg(long)]
    no_package: bool,

    /// Capture build tool output (shown with --verbose on failure)
    #[arg(short, long)]
    quiet: bool,
  },

  /// Show which components are cached and which would be built
  Plan {
    #[command(flatten)]
    target: Target,
  },

  /// Render the manifest from an already populated cache
  Manifest {
    #[command(flatten)]
    target: Target,

    /// Write to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
  },

  /// Print the effective pipeline as JSON
  Pipeline {
    /// Pipeline definition (JSON). Defaults to the built-in silverkube pipeline
    #[arg(short, long)]
    pipeline: Option<PathBuf>,
  },
}

fn main() -> ExitCode {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "info" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let result = match cli.command {
    Commands::Build {
      target,
      manifest,
      topdir,
      skip_bootstrap,
      no_package,
      quiet,
    } => cmd::cmd_build(
      &target,
      cmd::BuildFlags {
        manifest,
        topdir,
        skip_bootstrap,
        no_package,
        quiet,
      },
      cli.format,
    ),
    Commands::Plan { target } => cmd::cmd_plan(&target, cli.format),
    Commands::Manifest { target, output } => cmd::cmd_manifest(&target, output.as_deref()),
    Commands::Pipeline { pipeline } => cmd::cmd_pipeline(pipeline.as_deref()),
  };

  match result {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      print_error(&format!("{err:#}"));
      ExitCode::FAILURE
    }
  }
}
