use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::consts::EXECUTABLE_MODE;
use crate::execute::Invocation;
use crate::manifest::SlotRange;

/// The complete, ordered description of one package build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Pipeline {
  pub package: PackageMeta,

  /// Static files shipped alongside the artifacts (e.g. a launcher script).
  #[serde(default)]
  pub payload: Vec<Payload>,

  /// System packages installed once before any component builds.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub bootstrap: Option<Bootstrap>,

  /// Environment applied to every recipe step.
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub env: BTreeMap<String, String>,

  /// Components in build order.
  pub components: Vec<Component>,

  #[serde(default)]
  pub packaging: PackagingTool,

  #[serde(default)]
  pub slots: SlotRange,
}

/// Header metadata and fixed sections of the rendered manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageMeta {
  pub name: String,
  pub version: String,
  pub release: String,
  pub summary: String,
  pub license: String,
  pub url: String,
  pub description: String,
  /// Subtree that receives every artifact, relative to the build root.
  pub install_root: String,
  #[serde(default)]
  pub mode: Mode,
  #[serde(default)]
  pub changelog: Vec<ChangelogEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangelogEntry {
  /// `<date> <author>` line, without the leading `*`.
  pub header: String,
  pub lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Payload {
  /// Logical name, also the source declaration in the manifest.
  pub name: String,
  /// Location of the file, relative to the pipeline directory.
  pub source: String,
  /// Install destination relative to the build root.
  pub destination: String,
  #[serde(default)]
  pub mode: Mode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Bootstrap {
  #[serde(default = "default_bootstrap_command")]
  pub command: Vec<String>,
  pub packages: Vec<String>,
}

fn default_bootstrap_command() -> Vec<String> {
  ["dnf", "install", "-y"].iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackagingTool {
  pub program: String,
  #[serde(default)]
  pub args: Vec<String>,
}

impl Default for PackagingTool {
  fn default() -> Self {
    Self {
      program: "rpmbuild".to_string(),
      args: vec!["-ba".to_string()],
    }
  }
}

/// One upstream dependency built from pinned source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Component {
  pub name: String,

  /// Pinned repository. Release-download components have none.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub source: Option<GitSource>,

  /// External binaries that must exist before the recipe runs.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub toolchains: Vec<Toolchain>,

  /// Patches applied to the working copy before the recipe runs.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub patches: Option<PatchSet>,

  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub env: BTreeMap<String, String>,

  pub steps: Vec<RecipeStep>,

  pub outputs: Outputs,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GitSource {
  pub url: String,
  /// Commit hash or release tag.
  pub revision: String,
}

impl GitSource {
  pub fn new(url: &str, revision: &str) -> Self {
    Self {
      url: url.to_string(),
      revision: revision.to_string(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Toolchain {
  pub name: String,
  /// Where the binary must exist.
  pub path: String,
  /// Where to download it from when missing.
  pub url: String,
  #[serde(default)]
  pub mode: Mode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatchSet {
  pub source: GitSource,
  /// Directory inside the patch repository holding the patch files.
  pub dir: String,
}

/// What a component leaves behind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outputs {
  /// Named primary executables.
  Fixed { paths: Vec<String> },

  /// A directory of plugin executables whose contents are only known after
  /// the build. `sentinel` is the entry whose presence means "built".
  Directory {
    dir: String,
    sentinel: String,
    install_subdir: String,
  },
}

/// One entry of a component's build recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RecipeStep {
  Cmd {
    argv: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    env: BTreeMap<String, String>,
    /// Defaults to the working copy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cwd: Option<String>,
  },
  Download {
    url: String,
    /// Defaults to `$${src}/<file name of url>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    dest: Option<String>,
  },
  Extract {
    archive: String,
    into: String,
  },
  Install {
    from: String,
    to: String,
    #[serde(default)]
    mode: Mode,
  },
}

impl RecipeStep {
  pub fn cmd<I, S>(argv: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    RecipeStep::Cmd {
      argv: argv.into_iter().map(Into::into).collect(),
      env: BTreeMap::new(),
      cwd: None,
    }
  }

  pub fn install(from: &str, to: &str) -> Self {
    RecipeStep::Install {
      from: from.to_string(),
      to: to.to_string(),
      mode: Mode::default(),
    }
  }
}

impl fmt::Display for RecipeStep {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RecipeStep::Cmd { argv, env, .. } => match Invocation::from_argv(argv) {
        Some(inv) => write!(f, "{}", inv.envs(env)),
        None => write!(f, "<empty command>"),
      },
      RecipeStep::Download { url, .. } => write!(f, "download {url}"),
      RecipeStep::Extract { archive, into } => write!(f, "extract {archive} into {into}"),
      RecipeStep::Install { from, to, mode } => write!(f, "install -m {mode} {from} {to}"),
    }
  }
}

/// Unix permission bits, written as an octal string (`"0755"`) in JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mode(pub u32);

impl Default for Mode {
  fn default() -> Self {
    Mode(EXECUTABLE_MODE)
  }
}

impl fmt::Display for Mode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "0{:o}", self.0)
  }
}

impl Serialize for Mode {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&self.to_string())
  }
}

impl<'de> Deserialize<'de> for Mode {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let raw = String::deserialize(deserializer)?;
    u32::from_str_radix(&raw, 8)
      .ok()
      .filter(|bits| *bits <= 0o7777)
      .map(Mode)
      .ok_or_else(|| serde::de::Error::custom(format!("invalid octal mode '{raw}'")))
  }
}
