//! Stable-index manifest generation.
//!
//! Every payload file and every collected artifact gets one consecutive slot
//! starting at the range base: payload first, then fixed artifacts in
//! component order, then directory artifacts. The same inputs in the same
//! order always render byte-identical text.
//!
//! Rendering is pure. Nothing touches the filesystem until the caller writes
//! the returned [`Manifest`], so an overflow leaves no partial file behind.

mod types;

use std::collections::HashSet;
use std::path::PathBuf;

use thiserror::Error;
use tracing::debug;

pub use types::*;

use crate::collect::{ArtifactClass, ArtifactSet};
use crate::pipeline::{PackageMeta, Payload};

#[derive(Debug, Error)]
pub enum ManifestError {
  #[error("{required} sources do not fit in {capacity} available slots")]
  Overflow { required: usize, capacity: usize },

  /// Two sources share a file name and would collide in the flat directory.
  #[error("duplicate source name '{0}'")]
  DuplicateSource(String),
}

/// Render the package manifest for `payload` followed by `artifacts`.
pub fn render(
  meta: &PackageMeta,
  payload: &[Payload],
  artifacts: &ArtifactSet,
  range: SlotRange,
) -> Result<Manifest, ManifestError> {
  let required = payload.len() + artifacts.len();
  let capacity = range.capacity();
  if required > capacity {
    return Err(ManifestError::Overflow { required, capacity });
  }

  let mut seen = HashSet::new();
  let mut bindings = Vec::with_capacity(required);
  let mut payload_directives = Vec::with_capacity(payload.len());
  let mut artifact_directives = Vec::with_capacity(artifacts.len());
  let mut slots = range.base..=range.max;

  for item in payload {
    let slot = next_slot(&mut slots, required, capacity)?;
    claim(&mut seen, &item.name)?;
    bindings.push(SlotBinding {
      slot,
      name: item.name.clone(),
      source: PathBuf::from(&item.source),
    });
    payload_directives.push(InstallDirective {
      slot,
      mode: item.mode,
      destination: item.destination.clone(),
    });
  }

  for artifact in artifacts.ordered() {
    let slot = next_slot(&mut slots, required, capacity)?;
    claim(&mut seen, &artifact.name)?;
    let destination = match &artifact.class {
      ArtifactClass::Primary => format!("{}/{}", meta.install_root, artifact.name),
      ArtifactClass::Plugin { subdir } => format!("{}/{}/{}", meta.install_root, subdir, artifact.name),
    };
    bindings.push(SlotBinding {
      slot,
      name: artifact.name.clone(),
      source: artifact.path.clone(),
    });
    artifact_directives.push(InstallDirective {
      slot,
      mode: meta.mode,
      destination,
    });
  }

  let lines = render_lines(meta, payload, &bindings, &payload_directives, &artifact_directives);
  debug!(sources = bindings.len(), lines = lines.len(), "rendered manifest");

  let mut directives = payload_directives;
  directives.extend(artifact_directives);
  Ok(Manifest {
    lines,
    bindings,
    directives,
  })
}

fn next_slot(
  slots: &mut std::ops::RangeInclusive<u32>,
  required: usize,
  capacity: usize,
) -> Result<u32, ManifestError> {
  slots.next().ok_or(ManifestError::Overflow { required, capacity })
}

fn claim<'a>(seen: &mut HashSet<&'a str>, name: &'a str) -> Result<(), ManifestError> {
  if seen.insert(name) {
    Ok(())
  } else {
    Err(ManifestError::DuplicateSource(name.to_string()))
  }
}

fn render_lines(
  meta: &PackageMeta,
  payload: &[Payload],
  bindings: &[SlotBinding],
  payload_directives: &[InstallDirective],
  artifact_directives: &[InstallDirective],
) -> Vec<String> {
  let mut lines = vec![
    format!("Name: {}", meta.name),
    format!("Version: {}", meta.version),
    format!("Release: {}", meta.release),
    format!("Summary: {}", meta.summary),
    String::new(),
    format!("License: {}", meta.license),
    format!("URL: {}", meta.url),
    String::new(),
  ];
  lines.extend(bindings.iter().map(|b| format!("Source{}: {}", b.slot, b.name)));

  lines.push(String::new());
  lines.push("%description".to_string());
  lines.extend(meta.description.lines().map(str::to_string));
  lines.extend(
    ["", "%prep", "", "%build", "", "%install"]
      .iter()
      .map(|s| s.to_string()),
  );
  lines.extend(payload_directives.iter().map(ToString::to_string));
  lines.push(String::new());
  lines.extend(artifact_directives.iter().map(ToString::to_string));

  lines.push(String::new());
  lines.push("%files".to_string());
  lines.extend(payload.iter().map(|p| format!("/{}", p.destination)));
  lines.push(format!("/{}", meta.install_root));

  lines.push(String::new());
  lines.push("%changelog".to_string());
  for entry in &meta.changelog {
    lines.push(format!("* {}", entry.header));
    lines.extend(entry.lines.iter().map(|l| format!("- {l}")));
  }
  lines
}
