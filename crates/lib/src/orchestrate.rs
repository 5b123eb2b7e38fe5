//! End-to-end runs.
//!
//! A run is strictly sequential: lock the cache, bootstrap, build each
//! component in pipeline order, render the manifest from the complete
//! artifact set, link sources into the flat directory, then package. The
//! first error aborts the run; whatever was already built stays in the cache
//! and is skipped next time.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::info;

use crate::bootstrap::bootstrap;
use crate::build::{
  BuildContext, BuiltComponent, artifacts, build_component, component_vars, expected_paths, is_built,
};
use crate::cache::CacheRoot;
use crate::cache_lock::CacheLock;
use crate::collect::ArtifactSet;
use crate::error::Error;
use crate::execute::Runner;
use crate::link::{LinkItem, LinkReport, ensure_linked};
use crate::manifest::{Manifest, render};
use crate::package::package;
use crate::pipeline::Pipeline;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentState {
  /// Every expected output exists; a build would skip it.
  Cached,
  Pending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentStatus {
  pub name: String,
  pub state: ComponentState,
  pub outputs: Vec<PathBuf>,
}

/// What a build would do, without doing anything.
pub fn plan(pipeline: &Pipeline, cache: &CacheRoot) -> Result<Vec<ComponentStatus>, Error> {
  let mut statuses = Vec::with_capacity(pipeline.components.len());
  for component in &pipeline.components {
    let vars = component_vars(cache, component);
    let outputs = expected_paths(component, &vars)?;
    let state = if outputs.iter().all(|p| p.exists()) {
      ComponentState::Cached
    } else {
      ComponentState::Pending
    };
    statuses.push(ComponentStatus {
      name: component.name.clone(),
      state,
      outputs,
    });
  }
  Ok(statuses)
}

/// Build every component in order.
pub async fn build_all(
  runner: &impl Runner,
  pipeline: &Pipeline,
  cache: &CacheRoot,
) -> Result<Vec<BuiltComponent>, Error> {
  let ctx = BuildContext {
    cache,
    env: &pipeline.env,
  };
  let mut built = Vec::with_capacity(pipeline.components.len());
  for component in &pipeline.components {
    built.push(build_component(runner, ctx, component).await?);
  }
  Ok(built)
}

/// Render the manifest from outputs already in the cache.
pub fn render_cached(pipeline: &Pipeline, cache: &CacheRoot) -> Result<Manifest, Error> {
  let mut set = ArtifactSet::new();
  for component in &pipeline.components {
    if !is_built(cache, component)? {
      return Err(Error::NotBuilt(component.name.clone()));
    }
    let vars = component_vars(cache, component);
    set.push(BuiltComponent {
      name: component.name.clone(),
      artifacts: artifacts(component, &vars)?,
      cached: true,
    });
  }
  Ok(render(&pipeline.package, &pipeline.payload, &set, pipeline.slots)?)
}

#[derive(Debug, Clone)]
pub struct RunOptions {
  pub cache: CacheRoot,
  /// Directory payload sources are relative to.
  pub payload_dir: PathBuf,
  pub manifest_path: PathBuf,
  /// Working tree of the packaging tool.
  pub top_dir: PathBuf,
  pub skip_bootstrap: bool,
  pub no_package: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
  pub built: usize,
  pub cached: usize,
  pub sources: usize,
  pub manifest_path: PathBuf,
  pub manifest_digest: String,
  pub links: LinkReport,
  pub packaged: bool,
  pub elapsed: Duration,
}

/// Run the whole pipeline.
pub async fn run(runner: &impl Runner, pipeline: &Pipeline, options: &RunOptions) -> Result<RunReport, Error> {
  let started = Instant::now();
  let cache = &options.cache;

  let _lock = CacheLock::acquire(cache, "pinforge build")?;
  cache.ensure_dirs().map_err(|source| Error::Cache {
    path: cache.root().to_path_buf(),
    source,
  })?;

  match &pipeline.bootstrap {
    Some(prerequisites) if !options.skip_bootstrap => bootstrap(runner, prerequisites).await?,
    _ => info!("skipping bootstrap"),
  }

  let built = build_all(runner, pipeline, cache).await?;
  let cached = built.iter().filter(|b| b.cached).count();
  let fresh = built.len() - cached;
  let artifacts: ArtifactSet = built.into_iter().collect();

  let manifest = render(&pipeline.package, &pipeline.payload, &artifacts, pipeline.slots)?;
  manifest
    .write_to(&options.manifest_path)
    .map_err(|source| Error::WriteManifest {
      path: options.manifest_path.clone(),
      source,
    })?;
  info!(
    path = %options.manifest_path.display(),
    sources = manifest.bindings().len(),
    "wrote manifest"
  );

  let items: Vec<LinkItem> = manifest
    .bindings()
    .iter()
    .map(|b| LinkItem::from_binding(b, &options.payload_dir))
    .collect();
  let links = ensure_linked(&cache.src_dir(), &items)?;
  info!(created = links.created, existing = links.existing, "linked sources");

  if !options.no_package {
    package(
      runner,
      &pipeline.packaging,
      &options.manifest_path,
      &cache.src_dir(),
      &options.top_dir,
    )
    .await?;
  }

  Ok(RunReport {
    built: fresh,
    cached,
    sources: manifest.bindings().len(),
    manifest_path: options.manifest_path.clone(),
    manifest_digest: manifest.digest(),
    links,
    packaged: !options.no_package,
    elapsed: started.elapsed(),
  })
}

#[cfg(test)]
#[cfg(unix)]
mod tests {
  use std::collections::BTreeMap;

  use super::*;
  use crate::build::BuildError;
  use crate::manifest::{ManifestError, SlotRange};
  use crate::pipeline::{Bootstrap, Component, Mode, Outputs, PackageMeta, PackagingTool, Payload, RecipeStep};
  use crate::util::testutil::{RecordingRunner, sh};
  use tempfile::TempDir;

  struct Fixture {
    _temp: TempDir,
    options: RunOptions,
  }

  fn fixture() -> Fixture {
    let temp = TempDir::new().unwrap();
    let payload_dir = temp.path().join("project");
    std::fs::create_dir_all(&payload_dir).unwrap();
    std::fs::write(payload_dir.join("launcher.py"), "#!/usr/bin/python3\n").unwrap();
    let options = RunOptions {
      cache: CacheRoot::new(temp.path().join("cache")),
      payload_dir: payload_dir.clone(),
      manifest_path: payload_dir.join("x.spec"),
      top_dir: payload_dir.join("rpmbuild"),
      skip_bootstrap: false,
      no_package: false,
    };
    Fixture { _temp: temp, options }
  }

  fn writes_bin(name: &str) -> Component {
    Component {
      name: name.to_string(),
      source: None,
      toolchains: Vec::new(),
      patches: None,
      env: BTreeMap::new(),
      steps: vec![RecipeStep::cmd(sh(&format!("echo {name} > $PINFORGE_BIN/{name}")))],
      outputs: Outputs::Fixed {
        paths: vec![format!("$${{bin}}/{name}")],
      },
    }
  }

  fn pipeline(components: Vec<Component>) -> Pipeline {
    Pipeline {
      package: PackageMeta {
        name: "x".to_string(),
        version: "0.1".to_string(),
        release: "1".to_string(),
        summary: "Example".to_string(),
        license: "ASL".to_string(),
        url: "https://example.com/x".to_string(),
        description: "Example package".to_string(),
        install_root: "usr/libexec/x".to_string(),
        mode: Mode::default(),
        changelog: Vec::new(),
      },
      payload: vec![Payload {
        name: "launcher".to_string(),
        source: "launcher.py".to_string(),
        destination: "bin/x".to_string(),
        mode: Mode::default(),
      }],
      bootstrap: Some(Bootstrap {
        command: vec!["true".to_string(), "install".to_string()],
        packages: vec!["make".to_string(), "git".to_string()],
      }),
      env: [("PINFORGE_BIN".to_string(), "$${bin}".to_string())].into(),
      components,
      packaging: PackagingTool {
        program: "true".to_string(),
        args: vec!["-ba".to_string()],
      },
      slots: SlotRange::default(),
    }
  }

  #[tokio::test]
  async fn full_run_writes_manifest_links_and_packages() {
    let f = fixture();
    let pipeline = pipeline(vec![writes_bin("a"), writes_bin("b")]);
    let runner = RecordingRunner::new();

    let report = run(&runner, &pipeline, &f.options).await.unwrap();

    assert_eq!((report.built, report.cached, report.sources), (2, 0, 3));
    assert!(report.packaged);
    let text = std::fs::read_to_string(&f.options.manifest_path).unwrap();
    assert!(text.contains("Source100: launcher\nSource101: a\nSource102: b\n"));
    assert!(text.contains("install -p -D -m 0755 %{SOURCE102} %{buildroot}/usr/libexec/x/b\n"));

    let src = f.options.cache.src_dir();
    for name in ["launcher", "a", "b"] {
      assert!(std::fs::symlink_metadata(src.join(name)).unwrap().file_type().is_symlink());
    }
    assert_eq!(std::fs::read_to_string(src.join("a")).unwrap(), "a\n");

    let commands = runner.commands();
    assert_eq!(commands.first().map(String::as_str), Some("true install git make"));
    assert!(commands.last().unwrap().starts_with("true --define '_sourcedir "));
  }

  #[tokio::test]
  async fn second_run_builds_nothing_and_reproduces_manifest() {
    let f = fixture();
    let pipeline = pipeline(vec![writes_bin("a"), writes_bin("b")]);
    let options = RunOptions {
      skip_bootstrap: true,
      no_package: true,
      ..f.options.clone()
    };
    let first = run(&RecordingRunner::new(), &pipeline, &options).await.unwrap();
    let text = std::fs::read_to_string(&options.manifest_path).unwrap();

    let runner = RecordingRunner::new();
    let second = run(&runner, &pipeline, &options).await.unwrap();

    assert!(runner.is_empty());
    assert_eq!((second.built, second.cached), (0, 2));
    assert_eq!(second.manifest_digest, first.manifest_digest);
    assert_eq!(std::fs::read_to_string(&options.manifest_path).unwrap(), text);
    assert_eq!(second.links, LinkReport { created: 0, existing: 3 });
  }

  #[tokio::test]
  async fn overflow_aborts_before_any_write() {
    let f = fixture();
    let mut pipeline = pipeline(vec![writes_bin("a"), writes_bin("b")]);
    pipeline.slots = SlotRange::new(100, 101);
    let runner = RecordingRunner::new();

    let err = run(&runner, &pipeline, &f.options).await.unwrap_err();

    assert!(matches!(
      err,
      Error::Manifest(ManifestError::Overflow {
        required: 3,
        capacity: 2
      })
    ));
    assert!(!f.options.manifest_path.exists());
    assert!(!f.options.cache.src_dir().join("launcher").exists());
    assert!(runner.commands().iter().all(|c| !c.contains("--define")));
  }

  #[tokio::test]
  async fn failing_component_stops_the_run() {
    let f = fixture();
    let mut broken = writes_bin("broken");
    broken.steps = vec![RecipeStep::cmd(sh("exit 1"))];
    let pipeline = pipeline(vec![writes_bin("a"), broken, writes_bin("c")]);
    let options = RunOptions {
      skip_bootstrap: true,
      ..f.options.clone()
    };

    let err = run(&RecordingRunner::new(), &pipeline, &options).await.unwrap_err();

    assert!(matches!(err, Error::Build(BuildError::StepFailed { ref component, .. }) if component == "broken"));
    assert!(options.cache.bin_dir().join("a").exists());
    assert!(!options.cache.bin_dir().join("c").exists());
    assert!(!options.manifest_path.exists());
  }

  #[tokio::test]
  async fn skip_bootstrap_runs_no_package_manager() {
    let f = fixture();
    let pipeline = pipeline(vec![writes_bin("a")]);
    let options = RunOptions {
      skip_bootstrap: true,
      no_package: true,
      ..f.options.clone()
    };
    let runner = RecordingRunner::new();

    run(&runner, &pipeline, &options).await.unwrap();

    assert!(runner.commands().iter().all(|c| !c.starts_with("true install")));
  }

  #[test]
  fn plan_has_no_side_effects() {
    let f = fixture();
    let pipeline = pipeline(vec![writes_bin("a"), writes_bin("b")]);

    let statuses = plan(&pipeline, &f.options.cache).unwrap();

    assert!(statuses.iter().all(|s| s.state == ComponentState::Pending));
    assert_eq!(statuses[0].outputs, vec![f.options.cache.bin_dir().join("a")]);
    assert!(!f.options.cache.root().exists());
  }

  #[tokio::test]
  async fn plan_reports_cached_after_build() {
    let f = fixture();
    let pipeline = pipeline(vec![writes_bin("a")]);
    build_all(&RecordingRunner::new(), &pipeline, &f.options.cache).await.unwrap();

    let statuses = plan(&pipeline, &f.options.cache).unwrap();

    assert_eq!(statuses[0].state, ComponentState::Cached);
  }

  #[test]
  fn render_cached_requires_every_component() {
    let f = fixture();
    let pipeline = pipeline(vec![writes_bin("a")]);

    let err = render_cached(&pipeline, &f.options.cache).unwrap_err();

    assert!(matches!(err, Error::NotBuilt(ref name) if name == "a"));
  }

  #[tokio::test]
  async fn render_cached_matches_run_output() {
    let f = fixture();
    let pipeline = pipeline(vec![writes_bin("a"), writes_bin("b")]);
    let options = RunOptions {
      skip_bootstrap: true,
      no_package: true,
      ..f.options.clone()
    };
    let report = run(&RecordingRunner::new(), &pipeline, &options).await.unwrap();

    let manifest = render_cached(&pipeline, &options.cache).unwrap();

    assert_eq!(manifest.digest(), report.manifest_digest);
  }
}
