use std::fmt;
use std::io;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::manifest::ManifestError;
use crate::package_xml::PackageXmlError;
use crate::registry::RegistryError;
use crate::stage::StageError;
use crate::vcs::{Identity, VcsError};

/// Values supplied by the job runner for one run.
#[derive(Debug, Clone, Default)]
pub struct DeployEnv {
  /// Commit being deployed.
  pub commit: String,
  /// Last successfully deployed commit, if any.
  pub previous_commit: Option<String>,
  /// Job workspace root.
  pub workspace: PathBuf,
  pub job_name: Option<String>,
  pub build_number: Option<String>,
  /// Unique tag for this build, used to name the rollback archive.
  pub build_tag: Option<String>,
  /// Job runner home, used to place the rollback directory beside the build's records.
  pub jenkins_home: Option<PathBuf>,
  /// Identity used for commits made during the run.
  pub committer: Option<Identity>,
}

/// Switches and paths controlling a run.
#[derive(Debug, Clone)]
pub struct DeployOptions {
  /// Treat the run as a first build: deploy the whole tree.
  pub force_initial_build: bool,
  /// Produce a rollback archive (requires a previous commit).
  pub rollback: bool,
  /// Update and commit the repository's `package.xml`.
  pub update_package: bool,
  /// Repository working tree; defaults to the workspace.
  pub repo_root: Option<PathBuf>,
  /// Name of the stage directory inside the workspace.
  pub stage_name: String,
  /// Rollback staging directory override.
  pub rollback_dir: Option<PathBuf>,
  /// File to receive the published outputs as `KEY=VALUE` lines.
  pub outputs_file: Option<PathBuf>,
}

impl Default for DeployOptions {
  fn default() -> Self {
    Self {
      force_initial_build: false,
      rollback: false,
      update_package: false,
      repo_root: None,
      stage_name: crate::consts::APP_NAME.to_string(),
      rollback_dir: None,
      outputs_file: None,
    }
  }
}

/// Orchestration phases, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
  Environment,
  Registry,
  ChangeSet,
  PrepareStage,
  ForwardManifest,
  Replicate,
  Rollback,
  RegistryUpdate,
  Publish,
}

impl Phase {
  pub fn as_str(&self) -> &'static str {
    match self {
      Phase::Environment => "environment",
      Phase::Registry => "registry",
      Phase::ChangeSet => "change set",
      Phase::PrepareStage => "prepare stage",
      Phase::ForwardManifest => "forward manifest",
      Phase::Replicate => "replicate",
      Phase::Rollback => "rollback",
      Phase::RegistryUpdate => "registry update",
      Phase::Publish => "publish",
    }
  }
}

impl fmt::Display for Phase {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Change counts reported with the outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSummary {
  /// True when the whole tree was deployed rather than a diff.
  pub full_tree: bool,
  pub additions: usize,
  pub deletions: usize,
  pub modifications: usize,
}

/// Result of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct DeployOutcome {
  pub deploy_dir: PathBuf,
  pub manifest_path: PathBuf,
  pub destructive_manifest_path: PathBuf,
  pub changes: ChangeSummary,
  /// Files copied into the deploy stage.
  pub replicated: usize,
  pub rollback_archive: Option<PathBuf>,
  /// `None` when the update was not requested.
  pub package_updated: Option<bool>,
  /// Named outputs for downstream steps, in publication order.
  pub published: Vec<(String, String)>,
}

/// Problems with the values supplied by the job runner.
#[derive(Debug, Error)]
pub enum EnvironmentError {
  #[error("no current commit supplied")]
  MissingCommit,

  #[error("workspace '{path}' is not a directory")]
  WorkspaceNotFound { path: PathBuf },

  #[error("committer name and email are required to update package.xml")]
  MissingIdentity,

  /// The stage name must be a single plain directory name.
  #[error("invalid stage name '{name}': expected a single directory name")]
  InvalidStageName { name: String },

  /// Resetting this rollback directory would remove the workspace or the deploy stage.
  #[error("rollback directory '{path}' overlaps the workspace '{workspace}'")]
  RollbackDirOverlapsWorkspace { path: PathBuf, workspace: PathBuf },
}

/// Failures while producing the rollback archive.
#[derive(Debug, Error)]
pub enum RollbackError {
  #[error(transparent)]
  Manifest(#[from] ManifestError),

  #[error(transparent)]
  Stage(#[from] StageError),
}

/// Failure writing the published outputs.
#[derive(Debug, Error)]
#[error("failed to write outputs to '{path}': {source}")]
pub struct PublishError {
  pub path: PathBuf,
  #[source]
  pub source: io::Error,
}

/// A failed run. Each variant corresponds to the [`Phase`] that failed.
#[derive(Debug, Error)]
pub enum DeployError {
  #[error("environment: {0}")]
  Environment(#[source] EnvironmentError),

  #[error("registry: {0}")]
  Registry(#[source] RegistryError),

  #[error("change set: {0}")]
  ChangeSet(#[source] VcsError),

  #[error("prepare stage: {0}")]
  PrepareStage(#[source] StageError),

  #[error("forward manifest: {0}")]
  ForwardManifest(#[source] ManifestError),

  #[error("replicate: {0}")]
  Replicate(#[source] StageError),

  #[error("rollback: {0}")]
  Rollback(#[source] RollbackError),

  #[error("registry update: {0}")]
  RegistryUpdate(#[source] PackageXmlError),

  #[error("publish: {0}")]
  Publish(#[source] PublishError),
}

impl DeployError {
  /// The phase at which the run stopped.
  pub fn phase(&self) -> Phase {
    match self {
      DeployError::Environment(_) => Phase::Environment,
      DeployError::Registry(_) => Phase::Registry,
      DeployError::ChangeSet(_) => Phase::ChangeSet,
      DeployError::PrepareStage(_) => Phase::PrepareStage,
      DeployError::ForwardManifest(_) => Phase::ForwardManifest,
      DeployError::Replicate(_) => Phase::Replicate,
      DeployError::Rollback(_) => Phase::Rollback,
      DeployError::RegistryUpdate(_) => Phase::RegistryUpdate,
      DeployError::Publish(_) => Phase::Publish,
    }
  }
}
