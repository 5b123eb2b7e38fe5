//! Test utilities for pinforge-lib.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use flate2::Compression;
use flate2::write::GzEncoder;

use crate::execute::{ExecuteError, Invocation, ProcessRunner, Runner};

/// One call observed by [`RecordingRunner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
  Run(Invocation),
  Download { url: String, dest: PathBuf },
}

/// Runner that records every call.
///
/// By default commands really execute (so recipes built from `/bin/sh -c`
/// have their side effects) and downloads write a small stub file.
#[derive(Debug, Default)]
pub struct RecordingRunner {
  calls: Mutex<Vec<Call>>,
  fail_matching: Option<String>,
  dry: bool,
}

impl RecordingRunner {
  pub fn new() -> Self {
    Self::default()
  }

  /// Record commands without executing them.
  pub fn dry() -> Self {
    Self {
      dry: true,
      ..Self::default()
    }
  }

  /// Fail any command whose rendered command line contains `needle`.
  pub fn failing_on(mut self, needle: &str) -> Self {
    self.fail_matching = Some(needle.to_string());
    self
  }

  pub fn calls(&self) -> Vec<Call> {
    self.calls.lock().unwrap().clone()
  }

  pub fn commands(&self) -> Vec<String> {
    self
      .calls()
      .into_iter()
      .filter_map(|call| match call {
        Call::Run(inv) => Some(inv.to_string()),
        Call::Download { .. } => None,
      })
      .collect()
  }

  pub fn is_empty(&self) -> bool {
    self.calls.lock().unwrap().is_empty()
  }
}

impl Runner for RecordingRunner {
  async fn run(&self, invocation: &Invocation) -> Result<(), ExecuteError> {
    self.calls.lock().unwrap().push(Call::Run(invocation.clone()));

    if let Some(needle) = &self.fail_matching
      && invocation.to_string().contains(needle.as_str())
    {
      return Err(ExecuteError::CmdFailed {
        command: invocation.to_string(),
        code: Some(1),
      });
    }

    if self.dry {
      return Ok(());
    }
    ProcessRunner::new(true).run(invocation).await
  }

  async fn download(&self, url: &str, dest: &Path) -> Result<(), ExecuteError> {
    self.calls.lock().unwrap().push(Call::Download {
      url: url.to_string(),
      dest: dest.to_path_buf(),
    });
    if let Some(parent) = dest.parent() {
      std::fs::create_dir_all(parent)?;
    }
    std::fs::write(dest, format!("downloaded from {url}\n"))?;
    Ok(())
  }
}

/// Write a gzip-compressed tarball holding one executable `entry`.
pub fn write_tarball(path: &Path, entry: &str, content: &[u8]) {
  let file = std::fs::File::create(path).unwrap();
  let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::fast()));
  let mut header = tar::Header::new_gnu();
  header.set_size(content.len() as u64);
  header.set_mode(0o755);
  header.set_cksum();
  builder.append_data(&mut header, entry, content).unwrap();
  builder.into_inner().unwrap().finish().unwrap();
}

/// Returns the command and args for a shell script.
#[cfg(unix)]
pub fn sh(script: &str) -> Vec<String> {
  vec!["/bin/sh".to_string(), "-c".to_string(), script.to_string()]
}

/// Run git synchronously in `dir`, panicking on failure. Test setup only.
pub fn git(dir: &Path, args: &[&str]) -> String {
  let output = std::process::Command::new("git")
    .args(["-c", "user.name=pinforge", "-c", "user.email=pinforge@example.com"])
    .args(["-c", "init.defaultBranch=main", "-c", "commit.gpgsign=false"])
    .args(args)
    .current_dir(dir)
    .output()
    .unwrap();
  assert!(
    output.status.success(),
    "git {:?} failed: {}",
    args,
    String::from_utf8_lossy(&output.stderr)
  );
  String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Create an upstream repository with one commit per entry in `files`.
///
/// Returns the commit ids in order.
pub fn upstream_repo(dir: &Path, files: &[(&str, &str)]) -> Vec<String> {
  std::fs::create_dir_all(dir).unwrap();
  git(dir, &["init", "--quiet"]);
  files
    .iter()
    .map(|(name, content)| {
      std::fs::write(dir.join(name), content).unwrap();
      git(dir, &["add", name]);
      git(dir, &["commit", "--quiet", "-m", &format!("add {name}")]);
      git(dir, &["rev-parse", "HEAD"])
    })
    .collect()
}
