//! Implementation of the `metapack deploy` command.
//!
//! Collects the job runner's environment, runs the deployment and prints the
//! published outputs on stdout.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde_json::json;
use tracing::debug;

use metapack_lib::consts::APP_NAME;
use metapack_lib::deploy::{DeployEnv, DeployOptions, deploy};
use metapack_lib::vcs::Identity;

use crate::output::{OutputFormat, print_json};

#[derive(Debug, Args)]
pub struct DeployArgs {
  /// Commit being deployed
  #[arg(long, env = "GIT_COMMIT")]
  commit: Option<String>,

  /// Last successfully deployed commit
  #[arg(long, env = "GIT_PREVIOUS_SUCCESSFUL_COMMIT")]
  previous_commit: Option<String>,

  /// Job workspace (defaults to the current directory)
  #[arg(long, env = "WORKSPACE")]
  workspace: Option<PathBuf>,

  #[arg(long, env = "JOB_NAME")]
  job_name: Option<String>,

  #[arg(long, env = "BUILD_NUMBER")]
  build_number: Option<String>,

  /// Unique build tag, used to name the rollback archive
  #[arg(long, env = "BUILD_TAG")]
  build_tag: Option<String>,

  #[arg(long, env = "JENKINS_HOME")]
  jenkins_home: Option<PathBuf>,

  #[arg(long, env = "GIT_COMMITTER_NAME")]
  committer_name: Option<String>,

  #[arg(long, env = "GIT_COMMITTER_EMAIL")]
  committer_email: Option<String>,

  /// Deploy the whole tree even when a previous commit is known
  #[arg(long)]
  force_initial_build: bool,

  /// Build a rollback archive from the previous commit
  #[arg(long)]
  rollback: bool,

  /// Add missing types to the repository's package.xml and commit it
  #[arg(long)]
  update_package: bool,

  /// Git repository root (defaults to the workspace)
  #[arg(long)]
  repo: Option<PathBuf>,

  /// Stage directory name inside the workspace
  #[arg(long, default_value = APP_NAME)]
  stage_name: String,

  /// Rollback staging directory (relative paths are inside the workspace)
  #[arg(long)]
  rollback_dir: Option<PathBuf>,

  /// Write published outputs to this file as KEY=VALUE lines
  #[arg(long)]
  outputs_file: Option<PathBuf>,
}

impl DeployArgs {
  fn into_config(self) -> Result<(DeployEnv, DeployOptions)> {
    let workspace = match self.workspace {
      Some(path) => path,
      None => std::env::current_dir().context("Failed to determine current directory")?,
    };

    let committer = match (self.committer_name, self.committer_email) {
      (Some(name), Some(email)) => Some(Identity { name, email }),
      _ => None,
    };

    let env = DeployEnv {
      commit: self.commit.unwrap_or_default(),
      previous_commit: self.previous_commit,
      workspace,
      job_name: self.job_name,
      build_number: self.build_number,
      build_tag: self.build_tag,
      jenkins_home: self.jenkins_home,
      committer,
    };

    let options = DeployOptions {
      force_initial_build: self.force_initial_build,
      rollback: self.rollback,
      update_package: self.update_package,
      repo_root: self.repo,
      stage_name: self.stage_name,
      rollback_dir: self.rollback_dir,
      outputs_file: self.outputs_file,
    };

    Ok((env, options))
  }
}

/// Execute the deploy command.
pub fn cmd_deploy(args: DeployArgs, registry: Option<&Path>, format: OutputFormat) -> Result<()> {
  let (env, options) = args.into_config()?;
  debug!(workspace = %env.workspace.display(), commit = %env.commit, "starting deployment");

  let outcome = deploy(registry, &env, &options).context("Deployment failed")?;

  if format.is_json() {
    let outputs: serde_json::Map<String, serde_json::Value> = outcome
      .published
      .iter()
      .map(|(key, value)| (key.clone(), json!(value)))
      .collect();
    let outcome = serde_json::to_value(&outcome).context("Failed to serialize deploy outcome")?;
    print_json(&json!({ "outputs": outputs, "outcome": outcome }))?;
  } else {
    for (key, value) in &outcome.published {
      println!("{}={}", key, value);
    }
  }

  Ok(())
}
