//! Deployment orchestration.
//!
//! One run walks these phases in order, stopping at the first failure:
//!
//! 1. Resolve the environment supplied by the job runner
//! 2. Pick the change basis (full tree or diff) and fetch the change set
//! 3. Reset the deploy stage and write `destructiveChanges.xml` + `package.xml`
//! 4. Copy the accepted files into the stage
//! 5. Optionally build a rollback archive from the inverse change set
//! 6. Optionally update and commit the repository's `package.xml`
//! 7. Publish the stage path (and rollback archive) for downstream steps
//!
//! A failed run may leave a stage directory behind; the next run's reset step
//! clears it. There is no retry at this layer.

mod types;

use std::path::{Component, Path, PathBuf};

use tracing::{error, info, warn};

pub use types::*;

use crate::consts::{DEPLOY_OUTPUT, PACKAGE_MANIFEST, ROLLBACK_OUTPUT};
use crate::manifest::generate_manifests;
use crate::package_xml::update_registry_file;
use crate::registry::TypeRegistry;
use crate::stage;
use crate::util::fs::write_atomic;
use crate::vcs::{ChangeBasis, ChangeSet, ChangeSource, GitRepository, Identity};

/// Environment after validation, with defaults applied.
#[derive(Debug, Clone)]
struct ResolvedEnv {
  commit: String,
  previous_commit: Option<String>,
  workspace: PathBuf,
  repo_root: PathBuf,
  deploy_dir: PathBuf,
  rollback_dir: PathBuf,
  archive_path: PathBuf,
  committer: Option<Identity>,
}

fn non_empty(value: &Option<String>) -> Option<String> {
  value.as_deref().map(str::trim).filter(|v| !v.is_empty()).map(String::from)
}

fn resolve_env(env: &DeployEnv, options: &DeployOptions) -> Result<ResolvedEnv, EnvironmentError> {
  let commit = env.commit.trim().to_string();
  if commit.is_empty() {
    return Err(EnvironmentError::MissingCommit);
  }

  if !env.workspace.is_dir() {
    return Err(EnvironmentError::WorkspaceNotFound {
      path: env.workspace.clone(),
    });
  }
  let workspace = dunce::canonicalize(&env.workspace).unwrap_or_else(|_| env.workspace.clone());

  let committer = env
    .committer
    .clone()
    .filter(|id| !id.name.trim().is_empty() && !id.email.trim().is_empty());
  if options.update_package && committer.is_none() {
    return Err(EnvironmentError::MissingIdentity);
  }

  let repo_root = match &options.repo_root {
    Some(root) if root.is_absolute() => root.clone(),
    Some(root) => workspace.join(root),
    None => workspace.clone(),
  };

  validate_stage_name(&options.stage_name)?;
  let deploy_dir = workspace.join(&options.stage_name);

  let rollback_dir = match &options.rollback_dir {
    Some(dir) if dir.is_absolute() => dir.clone(),
    Some(dir) => workspace.join(dir),
    None => default_rollback_dir(env, &workspace, &options.stage_name),
  };
  let rollback_dir = normalize(&rollback_dir);
  if workspace.starts_with(&rollback_dir) || deploy_dir.starts_with(&rollback_dir) {
    return Err(EnvironmentError::RollbackDirOverlapsWorkspace {
      path: rollback_dir,
      workspace,
    });
  }

  let archive_name = format!("{}.zip", non_empty(&env.build_tag).unwrap_or_else(|| "rollback".to_string()));
  let archive_path = rollback_dir
    .parent()
    .map(|p| p.join(&archive_name))
    .unwrap_or_else(|| PathBuf::from(&archive_name));

  Ok(ResolvedEnv {
    commit,
    previous_commit: non_empty(&env.previous_commit),
    deploy_dir,
    repo_root,
    workspace,
    rollback_dir,
    archive_path,
    committer,
  })
}

/// Accept only a single plain directory name, so the stage always lives directly
/// inside the workspace.
fn validate_stage_name(name: &str) -> Result<(), EnvironmentError> {
  let mut components = Path::new(name).components();
  match (components.next(), components.next()) {
    (Some(Component::Normal(_)), None) => Ok(()),
    _ => Err(EnvironmentError::InvalidStageName { name: name.to_string() }),
  }
}

/// Resolve `.` and `..` so paths can be compared by prefix. Existing paths are
/// canonicalized; the rest are folded lexically.
fn normalize(path: &Path) -> PathBuf {
  if let Ok(canonical) = dunce::canonicalize(path) {
    return canonical;
  }
  let mut normalized = PathBuf::new();
  for component in path.components() {
    match component {
      Component::CurDir => {}
      Component::ParentDir => {
        normalized.pop();
      }
      other => normalized.push(other),
    }
  }
  normalized
}

/// `<home>/jobs/<job>/builds/<number>/rollback` when the job runner supplied all
/// three values, otherwise `<workspace>/<stage>-rollback`.
fn default_rollback_dir(env: &DeployEnv, workspace: &Path, stage_name: &str) -> PathBuf {
  match (&env.jenkins_home, non_empty(&env.job_name), non_empty(&env.build_number)) {
    (Some(home), Some(job), Some(number)) => home.join("jobs").join(job).join("builds").join(number).join("rollback"),
    _ => workspace.join(format!("{}-rollback", stage_name)),
  }
}

fn summarize(set: &ChangeSet, basis: &ChangeBasis) -> ChangeSummary {
  ChangeSummary {
    full_tree: basis.previous().is_none(),
    additions: set.additions.len(),
    deletions: set.deletions.len(),
    modifications: set.modified_new.len(),
  }
}

/// Build, package and archive the rollback for `set`, returning the archive path.
fn build_rollback<S: ChangeSource + ?Sized>(
  source: &S,
  registry: &TypeRegistry,
  set: &ChangeSet,
  previous: &str,
  resolved: &ResolvedEnv,
) -> Result<PathBuf, RollbackError> {
  let dir = &resolved.rollback_dir;
  stage::reset(dir)?;

  let generated = generate_manifests(registry, &set.additions, &set.rollback_updates(), dir)?;
  stage::materialize(source, previous, generated.members(), dir)?;
  let archive = stage::archive_dir(dir, &resolved.archive_path)?;
  stage::remove_dir(dir)?;

  info!(path = %archive.display(), "created rollback package");
  Ok(archive)
}

fn publish(outputs: &[(String, String)], path: &Path) -> Result<(), PublishError> {
  let mut content = String::new();
  for (key, value) in outputs {
    content.push_str(key);
    content.push('=');
    content.push_str(value);
    content.push('\n');
  }
  write_atomic(path, content.as_bytes()).map_err(|source| PublishError {
    path: path.to_path_buf(),
    source,
  })
}

fn run_phases<S: ChangeSource + ?Sized>(
  source: &S,
  registry: &TypeRegistry,
  resolved: &ResolvedEnv,
  options: &DeployOptions,
) -> Result<DeployOutcome, DeployError> {
  let basis = ChangeBasis::new(
    &resolved.commit,
    resolved.previous_commit.as_deref(),
    options.force_initial_build,
  );
  match basis.previous() {
    Some(previous) => info!(previous, current = basis.current(), "found previous successful commit"),
    None => info!(current = basis.current(), "no previous commit, deploying full tree"),
  }

  let set = source.change_set(&basis).map_err(DeployError::ChangeSet)?;

  stage::reset(&resolved.deploy_dir).map_err(DeployError::PrepareStage)?;

  let generated =
    generate_manifests(registry, &set.deletions, &set.updates(), &resolved.deploy_dir).map_err(DeployError::ForwardManifest)?;
  info!(dir = %resolved.deploy_dir.display(), "created deployment package");

  let replicated =
    stage::replicate(generated.members(), &resolved.repo_root, &resolved.deploy_dir).map_err(DeployError::Replicate)?;

  let rollback_archive = match (options.rollback, basis.previous()) {
    (true, Some(previous)) => Some(build_rollback(source, registry, &set, previous, resolved).map_err(DeployError::Rollback)?),
    (true, None) => {
      warn!("rollback requested but there is no previous commit, skipping");
      None
    }
    (false, _) => None,
  };

  let package_updated = match (&resolved.committer, options.update_package) {
    (Some(identity), true) => {
      let path = resolved.repo_root.join(PACKAGE_MANIFEST);
      let changed = update_registry_file(source, registry, &path, identity).map_err(DeployError::RegistryUpdate)?;
      if changed {
        info!(path = %path.display(), "updated repository package.xml");
      }
      Some(changed)
    }
    _ => None,
  };

  let mut published = vec![(DEPLOY_OUTPUT.to_string(), resolved.deploy_dir.display().to_string())];
  if let Some(archive) = &rollback_archive {
    published.push((ROLLBACK_OUTPUT.to_string(), archive.display().to_string()));
  }
  if let Some(path) = &options.outputs_file {
    let path = if path.is_absolute() { path.clone() } else { resolved.workspace.join(path) };
    publish(&published, &path).map_err(DeployError::Publish)?;
  }

  Ok(DeployOutcome {
    deploy_dir: resolved.deploy_dir.clone(),
    manifest_path: generated.package_path.clone(),
    destructive_manifest_path: generated.destructive_path.clone(),
    changes: summarize(&set, &basis),
    replicated,
    rollback_archive,
    package_updated,
    published,
  })
}

/// Run every phase against `source`.
///
/// All failures are logged with their phase and returned as a single [`DeployError`].
pub fn run_deploy<S: ChangeSource + ?Sized>(
  source: &S,
  registry: &TypeRegistry,
  env: &DeployEnv,
  options: &DeployOptions,
) -> Result<DeployOutcome, DeployError> {
  resolve_env(env, options)
    .map_err(DeployError::Environment)
    .and_then(|resolved| run_phases(source, registry, &resolved, options))
    .map_err(log_failure)
}

/// Load the registry, open the git repository and run every phase.
pub fn deploy(registry_path: Option<&Path>, env: &DeployEnv, options: &DeployOptions) -> Result<DeployOutcome, DeployError> {
  let prepare = || -> Result<_, DeployError> {
    let registry = TypeRegistry::load_or_embedded(registry_path).map_err(DeployError::Registry)?;
    let resolved = resolve_env(env, options).map_err(DeployError::Environment)?;
    let repo = GitRepository::open(&resolved.repo_root).map_err(DeployError::ChangeSet)?;
    Ok((registry, resolved, repo))
  };

  prepare()
    .and_then(|(registry, resolved, repo)| run_phases(&repo, &registry, &resolved, options))
    .map_err(log_failure)
}

fn log_failure(e: DeployError) -> DeployError {
  error!(phase = %e.phase(), error = %e, "deployment failed");
  e
}
