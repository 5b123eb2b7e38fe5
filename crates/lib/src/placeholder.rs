//! Placeholder parsing and substitution for cache-relative paths.
//!
//! Pipeline definitions refer to locations that are only known once a cache
//! root has been chosen. Those references are written as placeholders and
//! resolved right before a step runs.
//!
//! # Placeholder Formats
//!
//! - `$${cache}` - the cache root
//! - `$${src}` - the shared source directory (`<cache>/src`)
//! - `$${bin}` - the primary artifact directory (`<cache>/bin`)
//! - `$${work}` - the component's working copy (or `$${src}` without one)
//! - `$${name}` - the component name
//!
//! Single `$` characters pass through unchanged, so `$HOME` in an argument
//! reaches the build tool verbatim. `$$${` produces a literal `$${`.
//!
//! # Example
//!
//! ```
//! use pinforge_lib::placeholder::{parse, Placeholder, Segment};
//!
//! let segments = parse("$${bin}/runc").unwrap();
//! assert_eq!(segments, vec![
//!     Segment::Placeholder(Placeholder::Bin),
//!     Segment::Literal("/runc".to_string()),
//! ]);
//! ```

use std::path::PathBuf;

use thiserror::Error;

use crate::cache::CacheRoot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
  Cache,
  Src,
  Bin,
  Work,
  Name,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
  Literal(String),
  Placeholder(Placeholder),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaceholderError {
  #[error("unclosed placeholder at position {0}")]
  Unclosed(usize),

  #[error("unknown placeholder: {0}")]
  Unknown(String),

  #[error("placeholder '{0}' is not available here")]
  Unresolved(String),
}

/// Supplies values for placeholders.
pub trait Resolver {
  fn resolve(&self, placeholder: Placeholder) -> Result<&str, PlaceholderError>;
}

/// Parse a string into literal and placeholder segments.
pub fn parse(input: &str) -> Result<Vec<Segment>, PlaceholderError> {
  let mut segments = Vec::new();
  let mut literal = String::new();
  let mut rest = input;
  let mut offset = 0;

  while let Some(idx) = rest.find("$${") {
    // `$$${` escapes to a literal `$${`
    if idx > 0 && rest.as_bytes()[idx - 1] == b'$' {
      literal.push_str(&rest[..idx - 1]);
      literal.push_str("$${");
      offset += idx + 3;
      rest = &rest[idx + 3..];
      continue;
    }

    literal.push_str(&rest[..idx]);
    let body = &rest[idx + 3..];
    let close = body.find('}').ok_or(PlaceholderError::Unclosed(offset + idx))?;

    if !literal.is_empty() {
      segments.push(Segment::Literal(std::mem::take(&mut literal)));
    }
    segments.push(Segment::Placeholder(parse_name(&body[..close])?));

    let consumed = idx + 3 + close + 1;
    offset += consumed;
    rest = &rest[consumed..];
  }

  literal.push_str(rest);
  if !literal.is_empty() {
    segments.push(Segment::Literal(literal));
  }

  Ok(segments)
}

fn parse_name(name: &str) -> Result<Placeholder, PlaceholderError> {
  match name {
    "cache" => Ok(Placeholder::Cache),
    "src" => Ok(Placeholder::Src),
    "bin" => Ok(Placeholder::Bin),
    "work" => Ok(Placeholder::Work),
    "name" => Ok(Placeholder::Name),
    other => Err(PlaceholderError::Unknown(other.to_string())),
  }
}

/// Parse and substitute in one step.
pub fn substitute(input: &str, resolver: &impl Resolver) -> Result<String, PlaceholderError> {
  let mut result = String::with_capacity(input.len());
  for segment in parse(input)? {
    match segment {
      Segment::Literal(s) => result.push_str(&s),
      Segment::Placeholder(p) => result.push_str(resolver.resolve(p)?),
    }
  }
  Ok(result)
}

/// Substitute and interpret the result as a filesystem path.
pub fn substitute_path(input: &str, resolver: &impl Resolver) -> Result<PathBuf, PlaceholderError> {
  substitute(input, resolver).map(PathBuf::from)
}

/// Placeholder values for one component.
#[derive(Debug, Clone)]
pub struct Vars {
  cache: String,
  src: String,
  bin: String,
  work: Option<String>,
  name: Option<String>,
}

impl Vars {
  pub fn new(cache: &CacheRoot) -> Self {
    Self {
      cache: cache.root().to_string_lossy().into_owned(),
      src: cache.src_dir().to_string_lossy().into_owned(),
      bin: cache.bin_dir().to_string_lossy().into_owned(),
      work: None,
      name: None,
    }
  }

  pub fn with_name(mut self, name: &str) -> Self {
    self.name = Some(name.to_string());
    self
  }

  pub fn with_work(mut self, work: &std::path::Path) -> Self {
    self.work = Some(work.to_string_lossy().into_owned());
    self
  }

  pub fn src(&self) -> &str {
    &self.src
  }
}

impl Resolver for Vars {
  fn resolve(&self, placeholder: Placeholder) -> Result<&str, PlaceholderError> {
    match placeholder {
      Placeholder::Cache => Ok(&self.cache),
      Placeholder::Src => Ok(&self.src),
      Placeholder::Bin => Ok(&self.bin),
      Placeholder::Work => Ok(self.work.as_deref().unwrap_or(&self.src)),
      Placeholder::Name => self
        .name
        .as_deref()
        .ok_or_else(|| PlaceholderError::Unresolved("name".to_string())),
    }
  }
}
