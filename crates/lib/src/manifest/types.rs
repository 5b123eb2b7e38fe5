//! Slot and manifest types.
//!
//! A slot is the number binding one `SourceN:` declaration to the
//! `%{SOURCEN}` reference of its install line. Bindings and directives are
//! kept next to the rendered text so callers never have to parse it back.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::consts::{SLOT_BASE, SLOT_MAX};
use crate::pipeline::Mode;

/// Inclusive range of slot numbers available to sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SlotRange {
  pub base: u32,
  pub max: u32,
}

impl SlotRange {
  pub fn new(base: u32, max: u32) -> Self {
    Self { base, max }
  }

  /// Number of slots in the range, zero when `base > max`.
  pub fn capacity(&self) -> usize {
    if self.base > self.max {
      0
    } else {
      (self.max - self.base) as usize + 1
    }
  }
}

impl Default for SlotRange {
  fn default() -> Self {
    Self::new(SLOT_BASE, SLOT_MAX)
  }
}

/// One source declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotBinding {
  pub slot: u32,
  /// Logical name, the file name expected in the flat source directory.
  pub name: String,
  /// Where the file really lives. Payload sources may be relative to the
  /// pipeline directory.
  pub source: PathBuf,
}

/// One `install` line of the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallDirective {
  pub slot: u32,
  pub mode: Mode,
  /// Destination relative to the build root.
  pub destination: String,
}

impl fmt::Display for InstallDirective {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "install -p -D -m {} %{{SOURCE{}}} %{{buildroot}}/{}",
      self.mode, self.slot, self.destination
    )
  }
}

/// A rendered package manifest. Write-once: built by
/// [`render`](super::render) and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Manifest {
  pub(super) lines: Vec<String>,
  pub(super) bindings: Vec<SlotBinding>,
  pub(super) directives: Vec<InstallDirective>,
}

impl Manifest {
  pub fn lines(&self) -> &[String] {
    &self.lines
  }

  /// Source bindings in slot order, payload first.
  pub fn bindings(&self) -> &[SlotBinding] {
    &self.bindings
  }

  /// Install directives in slot order, payload first.
  pub fn directives(&self) -> &[InstallDirective] {
    &self.directives
  }

  pub fn text(&self) -> String {
    let mut text = self.lines.join("\n");
    text.push('\n');
    text
  }

  /// SHA-256 of the rendered text, hex encoded.
  pub fn digest(&self) -> String {
    hex::encode(Sha256::digest(self.text().as_bytes()))
  }

  /// Write the manifest to `path`.
  ///
  /// The text goes to a sibling temporary file first, so `path` only ever
  /// holds a complete manifest.
  pub fn write_to(&self, path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent()
      && !parent.as_os_str().is_empty()
    {
      fs::create_dir_all(parent)?;
    }
    let partial = path.with_extension("spec.partial");
    fs::write(&partial, self.text())?;
    fs::rename(&partial, path)
  }
}

impl fmt::Display for Manifest {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for line in &self.lines {
      writeln!(f, "{line}")?;
    }
    Ok(())
  }
}
