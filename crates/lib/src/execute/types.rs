//! Types shared by the external invocation layer.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while running an external program or a built-in action.
#[derive(Debug, Error)]
pub enum ExecuteError {
  /// The program could not be started at all.
  #[error("failed to spawn '{program}': {source}")]
  Spawn {
    program: String,
    #[source]
    source: std::io::Error,
  },

  /// The program ran and exited unsuccessfully.
  #[error("command {}: {command}", exit_status(*code))]
  CmdFailed { command: String, code: Option<i32> },

  /// HTTP download failed.
  #[error("fetch failed for {url}: {message}")]
  FetchFailed { url: String, message: String },

  /// Archive could not be unpacked.
  #[error("failed to extract '{}': {source}", path.display())]
  Extract {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

fn exit_status(code: Option<i32>) -> String {
  match code {
    Some(code) => format!("failed with exit code {code}"),
    None => "terminated by signal".to_string(),
  }
}

/// One external program invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
  pub program: String,
  pub args: Vec<String>,
  pub cwd: Option<PathBuf>,
  pub env: BTreeMap<String, String>,
}

impl Invocation {
  pub fn new(program: impl Into<String>) -> Self {
    Self {
      program: program.into(),
      args: Vec::new(),
      cwd: None,
      env: BTreeMap::new(),
    }
  }

  /// Build from an argv vector. Returns `None` for an empty vector.
  pub fn from_argv(argv: &[String]) -> Option<Self> {
    let (program, args) = argv.split_first()?;
    Some(Self::new(program.clone()).args(args.iter().cloned()))
  }

  pub fn arg(mut self, arg: impl Into<String>) -> Self {
    self.args.push(arg.into());
    self
  }

  pub fn args<I, S>(mut self, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.args.extend(args.into_iter().map(Into::into));
    self
  }

  pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
    self.cwd = Some(dir.into());
    self
  }

  pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.env.insert(key.into(), value.into());
    self
  }

  pub fn envs(mut self, vars: &BTreeMap<String, String>) -> Self {
    self.env.extend(vars.iter().map(|(k, v)| (k.clone(), v.clone())));
    self
  }
}

impl fmt::Display for Invocation {
  /// Renders the command line the way a user would type it.
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (key, value) in &self.env {
      write!(f, "{}={} ", key, quote(value))?;
    }
    write!(f, "{}", quote(&self.program))?;
    for arg in &self.args {
      write!(f, " {}", quote(arg))?;
    }
    Ok(())
  }
}

fn quote(s: &str) -> String {
  let plain = !s.is_empty()
    && s
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c));
  if plain {
    s.to_string()
  } else {
    format!("'{}'", s.replace('\'', r"'\''"))
  }
}
