//! Shared test helpers for CLI integration tests.

use std::path::PathBuf;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

/// Get path to a fixture file.
pub fn fixture_path(name: &str) -> PathBuf {
  PathBuf::from(env!("CARGO_MANIFEST_DIR"))
    .join("tests")
    .join("fixtures")
    .join(name)
}

/// Isolated test environment.
///
/// Each test gets its own temporary directory holding the pipeline file, its
/// payload, the cache root and the default manifest location.
pub struct TestEnv {
  pub temp: TempDir,
  pub pipeline_path: PathBuf,
}

impl TestEnv {
  /// Copy a fixture pipeline into a fresh directory next to its launcher.
  pub fn from_fixture(name: &str) -> Self {
    let temp = TempDir::new().unwrap();
    let pipeline_path = temp.path().join("pipeline.json");
    std::fs::copy(fixture_path(name), &pipeline_path).unwrap();
    std::fs::write(temp.path().join("launcher.sh"), "#!/bin/sh\nexec demo \"$@\"\n").unwrap();
    Self { temp, pipeline_path }
  }

  pub fn cache_path(&self) -> PathBuf {
    self.temp.path().join("cache")
  }

  /// Where `build` writes the manifest when `--manifest` is not given.
  pub fn default_manifest(&self) -> PathBuf {
    self.temp.path().join("demo.spec")
  }

  /// A pinforge command running inside the environment, with the cache
  /// redirected through `PINFORGE_CACHE`.
  pub fn cmd(&self) -> Command {
    let mut cmd = cargo_bin_cmd!("pinforge");
    cmd
      .current_dir(self.temp.path())
      .env("PINFORGE_CACHE", self.cache_path())
      .env_remove("RUST_LOG");
    cmd
  }

  /// `cmd()` with `<subcommand> --pipeline <file>` already applied.
  pub fn run(&self, subcommand: &str) -> Command {
    let mut cmd = self.cmd();
    cmd.arg(subcommand).arg("--pipeline").arg(&self.pipeline_path);
    cmd
  }

  /// Build without bootstrap or packaging.
  pub fn build_sources(&self) {
    self
      .run("build")
      .args(["--skip-bootstrap", "--no-package"])
      .assert()
      .success();
  }
}
