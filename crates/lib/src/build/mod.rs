//! Idempotent component builds.
//!
//! A component is built at most once per cache lifetime. Before anything
//! runs, its expected outputs are resolved; when all of them exist the whole
//! build (toolchains, fetch, patches, recipe) is skipped. There is no
//! completion marker: the outputs themselves are the record, and a recipe
//! that fails part way leaves them missing so the next run starts over.
//!
//! # Order of work for a pending component
//!
//! 1. Ensure every declared toolchain binary exists
//! 2. Fetch the pinned working copy (if the component has a source)
//! 3. Apply the component's patch set
//! 4. Run each recipe step in the working copy
//! 5. Check every expected output exists and collect artifacts

pub mod patch;
mod types;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

pub use types::*;

use crate::cache::CacheRoot;
use crate::collect::{Artifact, ArtifactClass, collect_variable};
use crate::execute::actions::{execute_extract, execute_install, url_to_filename};
use crate::execute::{ExecuteError, Invocation, Runner};
use crate::fetch::fetch_pinned;
use crate::pipeline::{Component, Outputs, RecipeStep};
use crate::placeholder::{PlaceholderError, Vars, substitute, substitute_path};
use crate::toolchain::{ensure_toolchain, search_path};

/// Placeholder values for `component`. `$${work}` is the location the
/// working copy will have, whether or not it has been cloned yet.
pub fn component_vars(cache: &CacheRoot, component: &Component) -> Vars {
  let vars = Vars::new(cache).with_name(&component.name);
  match &component.source {
    Some(source) => vars.with_work(&cache.working_copy_path(&source.url)),
    None => vars,
  }
}

/// Paths whose existence means `component` is built.
pub fn expected_paths(component: &Component, vars: &Vars) -> Result<Vec<PathBuf>, BuildError> {
  let placeholder = |source| BuildError::Placeholder {
    component: component.name.clone(),
    source,
  };
  match &component.outputs {
    Outputs::Fixed { paths } => paths
      .iter()
      .map(|p| substitute_path(p, vars).map_err(placeholder))
      .collect(),
    Outputs::Directory { dir, sentinel, .. } => {
      Ok(vec![substitute_path(dir, vars).map_err(placeholder)?.join(sentinel)])
    }
  }
}

/// True when every expected output of `component` already exists.
pub fn is_built(cache: &CacheRoot, component: &Component) -> Result<bool, BuildError> {
  let vars = component_vars(cache, component);
  Ok(expected_paths(component, &vars)?.iter().all(|p| p.exists()))
}

/// Build `component` unless its outputs already exist.
pub async fn build_component(
  runner: &impl Runner,
  ctx: BuildContext<'_>,
  component: &Component,
) -> Result<BuiltComponent, BuildError> {
  let name = component.name.as_str();
  let vars = component_vars(ctx.cache, component);
  let expected = expected_paths(component, &vars)?;

  if expected.iter().all(|p| p.exists()) {
    info!(component = %name, "already built, skipping");
    return Ok(BuiltComponent {
      name: name.to_string(),
      artifacts: artifacts(component, &vars)?,
      cached: true,
    });
  }

  info!(component = %name, steps = component.steps.len(), "building component");
  ctx.cache.ensure_dirs()?;

  let mut toolchains = Vec::with_capacity(component.toolchains.len());
  for toolchain in &component.toolchains {
    let path = ensure_toolchain(runner, toolchain, &vars)
      .await
      .map_err(|source| BuildError::Toolchain {
        component: name.to_string(),
        source,
      })?;
    toolchains.push(path);
  }

  let work = match &component.source {
    Some(source) => {
      let copy = fetch_pinned(runner, ctx.cache, source)
        .await
        .map_err(|source| BuildError::Fetch {
          component: name.to_string(),
          source,
        })?;

      if let Some(patches) = &component.patches {
        let applied = patch::apply_patches(runner, ctx.cache, patches, &copy.path)
          .await
          .map_err(|source| BuildError::PatchFailed {
            component: name.to_string(),
            source,
          })?;
        debug!(component = %name, applied, "patches applied");
      }
      copy.path
    }
    None => ctx.cache.src_dir(),
  };

  let mut env = resolve_env(ctx.env.iter().chain(component.env.iter()), &vars).map_err(|source| {
    BuildError::Placeholder {
      component: name.to_string(),
      source,
    }
  })?;
  if let Some(path) = search_path(&toolchains, env.get("PATH").map(String::as_str)) {
    env.insert("PATH".to_string(), path);
  }

  for (idx, step) in component.steps.iter().enumerate() {
    run_step(runner, component, idx + 1, step, &vars, &env, &work).await?;
  }

  for path in &expected {
    if !path.exists() {
      return Err(BuildError::MissingOutput {
        component: name.to_string(),
        path: path.clone(),
      });
    }
  }

  let artifacts = artifacts(component, &vars)?;
  info!(component = %name, artifacts = artifacts.len(), "component built");
  Ok(BuiltComponent {
    name: name.to_string(),
    artifacts,
    cached: false,
  })
}

/// Artifacts of an already-built component.
pub fn artifacts(component: &Component, vars: &Vars) -> Result<Vec<Artifact>, BuildError> {
  let placeholder = |source| BuildError::Placeholder {
    component: component.name.clone(),
    source,
  };
  match &component.outputs {
    Outputs::Fixed { paths } => paths
      .iter()
      .map(|p| {
        let path = substitute_path(p, vars).map_err(placeholder)?;
        Ok(Artifact::new(path, ArtifactClass::Primary, &component.name)?)
      })
      .collect(),
    Outputs::Directory {
      dir, install_subdir, ..
    } => {
      let dir = substitute_path(dir, vars).map_err(placeholder)?;
      Ok(collect_variable(&dir, install_subdir, &component.name)?)
    }
  }
}

fn resolve_env<'a>(
  pairs: impl Iterator<Item = (&'a String, &'a String)>,
  vars: &Vars,
) -> Result<BTreeMap<String, String>, PlaceholderError> {
  pairs
    .map(|(k, v)| Ok((k.clone(), substitute(v, vars)?)))
    .collect()
}

/// Relative paths in steps are relative to the step's working directory.
fn anchored(path: PathBuf, cwd: &Path) -> PathBuf {
  if path.is_absolute() { path } else { cwd.join(path) }
}

async fn run_step(
  runner: &impl Runner,
  component: &Component,
  step_no: usize,
  step: &RecipeStep,
  vars: &Vars,
  env: &BTreeMap<String, String>,
  work: &Path,
) -> Result<(), BuildError> {
  let placeholder = |source| BuildError::Placeholder {
    component: component.name.clone(),
    source,
  };
  let failed = |command: String, source: ExecuteError| BuildError::StepFailed {
    component: component.name.clone(),
    step: step_no,
    command,
    source,
  };

  match step {
    RecipeStep::Cmd { argv, env: step_env, cwd } => {
      let argv = argv
        .iter()
        .map(|a| substitute(a, vars))
        .collect::<Result<Vec<_>, _>>()
        .map_err(placeholder)?;
      let step_env = resolve_env(step_env.iter(), vars).map_err(placeholder)?;
      let cwd = match cwd {
        Some(dir) => anchored(substitute_path(dir, vars).map_err(placeholder)?, work),
        None => work.to_path_buf(),
      };
      let Some(invocation) = Invocation::from_argv(&argv) else {
        return Err(BuildError::InvalidStep {
          component: component.name.clone(),
          step: step_no,
          reason: "command has no program".to_string(),
        });
      };
      let invocation = invocation.envs(env).envs(&step_env).cwd(cwd);

      debug!(component = %component.name, step = step_no, command = %invocation, "running step");
      runner
        .run(&invocation)
        .await
        .map_err(|source| failed(invocation.to_string(), source))
    }

    RecipeStep::Download { url, dest } => {
      let url = substitute(url, vars).map_err(placeholder)?;
      let dest = match dest {
        Some(dest) => anchored(substitute_path(dest, vars).map_err(placeholder)?, work),
        None => PathBuf::from(vars.src()).join(url_to_filename(&url)),
      };
      if dest.exists() {
        debug!(component = %component.name, dest = %dest.display(), "download present, skipping");
        return Ok(());
      }
      runner
        .download(&url, &dest)
        .await
        .map_err(|source| failed(format!("download {url}"), source))
    }

    RecipeStep::Extract { archive, into } => {
      let archive = anchored(substitute_path(archive, vars).map_err(placeholder)?, work);
      let into = anchored(substitute_path(into, vars).map_err(placeholder)?, work);
      execute_extract(&archive, &into)
        .await
        .map_err(|source| failed(format!("extract {} into {}", archive.display(), into.display()), source))
    }

    RecipeStep::Install { from, to, mode } => {
      let from = anchored(substitute_path(from, vars).map_err(placeholder)?, work);
      let to = anchored(substitute_path(to, vars).map_err(placeholder)?, work);
      execute_install(&from, &to, mode.0).await.map_err(|source| {
        failed(
          format!("install -m {mode} {} {}", from.display(), to.display()),
          source,
        )
      })
    }
  }
}
