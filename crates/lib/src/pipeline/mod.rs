//! Pipeline definitions.
//!
//! A [`Pipeline`] is the explicit, ordered configuration of one package build:
//! package metadata, static payload, bootstrap packages and the components in
//! the order they are built. It is either the built-in [`silverkube`]
//! definition or a JSON file loaded with [`load`].
//!
//! # File Format
//!
//! ```json
//! {
//!   "package": { "name": "demo", "version": "0.1", "release": "1", ... },
//!   "payload": [{ "name": "demo.py", "source": "demo.py", "destination": "bin/demo" }],
//!   "components": [
//!     {
//!       "name": "runc",
//!       "source": { "url": "https://github.com/opencontainers/runc", "revision": "7507c64f..." },
//!       "steps": [
//!         { "action": "cmd", "argv": ["make"] },
//!         { "action": "install", "from": "runc", "to": "$${bin}/runc" }
//!       ],
//!       "outputs": { "kind": "fixed", "paths": ["$${bin}/runc"] }
//!     }
//!   ]
//! }
//! ```

mod silverkube;
mod types;

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

pub use silverkube::silverkube;
pub use types::*;

#[derive(Debug, Error)]
pub enum PipelineError {
  #[error("failed to read pipeline '{}': {source}", path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse pipeline '{}': {source}", path.display())]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("invalid pipeline: {0}")]
  Invalid(String),
}

/// Load and validate a pipeline from a JSON file.
pub fn load(path: &Path) -> Result<Pipeline, PipelineError> {
  let content = fs::read_to_string(path).map_err(|source| PipelineError::Read {
    path: path.to_path_buf(),
    source,
  })?;

  let pipeline: Pipeline = serde_json::from_str(&content).map_err(|source| PipelineError::Parse {
    path: path.to_path_buf(),
    source,
  })?;

  pipeline.validate()?;
  debug!(path = %path.display(), components = pipeline.components.len(), "loaded pipeline");
  Ok(pipeline)
}

impl Pipeline {
  /// Check the invariants the orchestrator relies on.
  ///
  /// - component names are unique and non-empty
  /// - every pinned source has a URL and a well-formed revision
  /// - every component declares at least one expected output
  /// - every recipe command has a program
  /// - patches only appear on components with a source
  pub fn validate(&self) -> Result<(), PipelineError> {
    let mut seen = HashSet::new();

    for component in &self.components {
      let name = component.name.as_str();
      if name.is_empty() {
        return Err(PipelineError::Invalid("component with empty name".to_string()));
      }
      if !seen.insert(name) {
        return Err(PipelineError::Invalid(format!("duplicate component '{name}'")));
      }

      if let Some(source) = &component.source {
        validate_source(name, source)?;
      }
      if let Some(patches) = &component.patches {
        if component.source.is_none() {
          return Err(PipelineError::Invalid(format!(
            "component '{name}' has patches but no source to apply them to"
          )));
        }
        validate_source(name, &patches.source)?;
      }

      match &component.outputs {
        Outputs::Fixed { paths } if paths.is_empty() => {
          return Err(PipelineError::Invalid(format!(
            "component '{name}' declares no outputs"
          )));
        }
        Outputs::Directory { sentinel, .. } if sentinel.is_empty() => {
          return Err(PipelineError::Invalid(format!(
            "component '{name}' has an empty sentinel"
          )));
        }
        _ => {}
      }

      for step in &component.steps {
        if let RecipeStep::Cmd { argv, .. } = step
          && argv.is_empty()
        {
          return Err(PipelineError::Invalid(format!(
            "component '{name}' has a command step without argv"
          )));
        }
      }
    }

    if self.slots.base > self.slots.max {
      return Err(PipelineError::Invalid(format!(
        "slot range {}..={} is empty",
        self.slots.base, self.slots.max
      )));
    }

    Ok(())
  }

  pub fn component(&self, name: &str) -> Option<&Component> {
    self.components.iter().find(|c| c.name == name)
  }
}

/// Revisions are handed to git verbatim, so anything git could read as an
/// option or a range is rejected here rather than at checkout time.
fn validate_source(component: &str, source: &GitSource) -> Result<(), PipelineError> {
  if source.url.trim().is_empty() {
    return Err(PipelineError::Invalid(format!("component '{component}' has an empty url")));
  }
  let rev = source.revision.as_str();
  let malformed = rev.is_empty()
    || rev.starts_with('-')
    || rev.contains("..")
    || rev.chars().any(|c| c.is_whitespace() || c.is_control() || "~^:?*[\\".contains(c));
  if malformed {
    return Err(PipelineError::Invalid(format!(
      "component '{component}' pins malformed revision '{rev}'"
    )));
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  fn minimal_json() -> &'static str {
    r#"{
      "package": {
        "name": "demo", "version": "0.1", "release": "1", "summary": "Demo",
        "license": "ASL", "url": "https://example.com", "description": "Demo package",
        "install_root": "usr/libexec/demo"
      },
      "components": [
        {
          "name": "a",
          "source": { "url": "https://example.com/a", "revision": "v1.0.0" },
          "steps": [{ "action": "cmd", "argv": ["make"] }],
          "outputs": { "kind": "fixed", "paths": ["$${bin}/a"] }
        }
      ]
    }"#
  }

  #[test]
  fn load_minimal_pipeline_applies_defaults() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("pipeline.json");
    fs::write(&path, minimal_json()).unwrap();

    let pipeline = load(&path).unwrap();

    assert_eq!(pipeline.components.len(), 1);
    assert_eq!(pipeline.packaging.program, "rpmbuild");
    assert_eq!(pipeline.slots, crate::manifest::SlotRange::default());
    assert_eq!(pipeline.package.mode, Mode(0o755));
    assert!(pipeline.bootstrap.is_none());
  }

  #[test]
  fn load_missing_file_is_read_error() {
    let result = load(Path::new("/nonexistent/pipeline.json"));
    assert!(matches!(result, Err(PipelineError::Read { .. })));
  }

  #[test]
  fn load_invalid_json_is_parse_error() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("pipeline.json");
    fs::write(&path, "{ not json").unwrap();
    assert!(matches!(load(&path), Err(PipelineError::Parse { .. })));
  }

  #[test]
  fn duplicate_component_names_rejected() {
    let mut pipeline = silverkube();
    let copy = pipeline.components[0].clone();
    pipeline.components.push(copy);
    let err = pipeline.validate().unwrap_err();
    assert!(err.to_string().contains("duplicate component 'rootlesskit'"));
  }

  #[test]
  fn malformed_revisions_rejected() {
    for rev in ["", "--upload-pack=x", "main..dev", "abc def", "HEAD~1"] {
      let source = GitSource::new("https://example.com/x", rev);
      assert!(validate_source("x", &source).is_err(), "revision {rev:?} should be rejected");
    }
  }

  #[test]
  fn commit_hashes_and_tags_accepted() {
    for rev in ["182be5f88e62f3568b86331356d237910909b24e", "v2.0.1", "release-1.17"] {
      assert!(validate_source("x", &GitSource::new("https://example.com/x", rev)).is_ok());
    }
  }

  #[test]
  fn empty_fixed_outputs_rejected() {
    let mut pipeline = silverkube();
    pipeline.components[0].outputs = Outputs::Fixed { paths: vec![] };
    assert!(pipeline.validate().is_err());
  }

  #[test]
  fn patches_without_source_rejected() {
    let mut pipeline = silverkube();
    let kube = pipeline.components.iter_mut().find(|c| c.name == "kubernetes").unwrap();
    kube.source = None;
    let err = pipeline.validate().unwrap_err();
    assert!(err.to_string().contains("no source"));
  }

  #[test]
  fn empty_slot_range_rejected() {
    let mut pipeline = silverkube();
    pipeline.slots = crate::manifest::SlotRange::new(500, 100);
    assert!(pipeline.validate().is_err());
  }

  #[test]
  fn builtin_pipeline_round_trips_through_json() {
    let pipeline = silverkube();
    let json = serde_json::to_string_pretty(&pipeline).unwrap();
    let back: Pipeline = serde_json::from_str(&json).unwrap();
    assert_eq!(back, pipeline);
  }

  #[test]
  fn component_lookup_by_name() {
    let pipeline = silverkube();
    assert!(pipeline.component("kubernetes").is_some());
    assert!(pipeline.component("missing").is_none());
  }
}
