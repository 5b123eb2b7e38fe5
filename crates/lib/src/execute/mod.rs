//! External invocation layer.
//!
//! Everything that leaves the process (spawning build tools, HTTP downloads)
//! goes through a [`Runner`]. Orchestration code is generic over it, which
//! keeps the sequential run loop testable with a recording fake.

pub mod actions;
pub mod types;

use std::path::Path;

pub use types::{ExecuteError, Invocation};

/// Performs blocking-from-the-caller's-view external work.
///
/// Each call completes (and its exit status is inspected) before the caller
/// continues; nothing is fire-and-forget.
#[allow(async_fn_in_trait)]
pub trait Runner {
  /// Run a program to completion. Non-zero exit is an error.
  async fn run(&self, invocation: &Invocation) -> Result<(), ExecuteError>;

  /// Download `url` to `dest`.
  async fn download(&self, url: &str, dest: &Path) -> Result<(), ExecuteError>;
}

/// Runner backed by real processes and HTTP.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner {
  /// Capture tool output instead of streaming it to the terminal.
  pub quiet: bool,
}

impl ProcessRunner {
  pub fn new(quiet: bool) -> Self {
    Self { quiet }
  }
}

impl Runner for ProcessRunner {
  async fn run(&self, invocation: &Invocation) -> Result<(), ExecuteError> {
    actions::execute_cmd(invocation, self.quiet).await
  }

  async fn download(&self, url: &str, dest: &Path) -> Result<(), ExecuteError> {
    actions::execute_fetch(url, dest).await
  }
}
