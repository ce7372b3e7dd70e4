//! Version-control collaborator.
//!
//! The deployment flow only needs four things from version control: the change set
//! between two commits (or the whole tree), a file's content at a commit, and a way
//! to commit a single updated file. [`ChangeSource`] captures exactly that;
//! [`GitRepository`] is the git-backed implementation.

mod git;

use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub use git::GitRepository;

/// What to compute a change set against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeBasis {
  /// Every file at `current` counts as an addition.
  FullTree { current: String },
  /// Changes from `previous` to `current`.
  Diff { previous: String, current: String },
}

impl ChangeBasis {
  /// Pick the basis for a run.
  ///
  /// Without a previous commit, or when a full build is forced, the whole tree is used.
  pub fn new(current: &str, previous: Option<&str>, force_full: bool) -> Self {
    match previous {
      Some(previous) if !force_full => Self::Diff {
        previous: previous.to_string(),
        current: current.to_string(),
      },
      _ => Self::FullTree {
        current: current.to_string(),
      },
    }
  }

  pub fn current(&self) -> &str {
    match self {
      Self::FullTree { current } | Self::Diff { current, .. } => current,
    }
  }

  pub fn previous(&self) -> Option<&str> {
    match self {
      Self::FullTree { .. } => None,
      Self::Diff { previous, .. } => Some(previous),
    }
  }
}

/// Repository-relative paths changed between two commits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
  pub additions: Vec<String>,
  pub deletions: Vec<String>,
  /// Modified paths as they are after the change.
  pub modified_new: Vec<String>,
  /// Modified paths as they were before the change.
  pub modified_old: Vec<String>,
}

impl ChangeSet {
  /// Compare two path -> content-id listings.
  pub fn between<T: PartialEq>(old: &BTreeMap<String, T>, new: &BTreeMap<String, T>) -> Self {
    let mut set = Self::default();

    for (path, id) in new {
      match old.get(path) {
        None => set.additions.push(path.clone()),
        Some(old_id) if old_id != id => {
          set.modified_new.push(path.clone());
          set.modified_old.push(path.clone());
        }
        Some(_) => {}
      }
    }
    for path in old.keys() {
      if !new.contains_key(path) {
        set.deletions.push(path.clone());
      }
    }

    set
  }

  /// Paths to deploy: additions followed by the new side of modifications.
  pub fn updates(&self) -> Vec<String> {
    merge_unique(&self.additions, &self.modified_new)
  }

  /// Paths to restore on rollback: the old side of modifications followed by deletions.
  pub fn rollback_updates(&self) -> Vec<String> {
    merge_unique(&self.modified_old, &self.deletions)
  }

  pub fn is_empty(&self) -> bool {
    self.additions.is_empty() && self.deletions.is_empty() && self.modified_new.is_empty() && self.modified_old.is_empty()
  }
}

fn merge_unique(first: &[String], second: &[String]) -> Vec<String> {
  let mut seen = HashSet::new();
  first
    .iter()
    .chain(second)
    .filter(|p| seen.insert(p.as_str()))
    .cloned()
    .collect()
}

/// Name and email used to attribute commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
  pub name: String,
  pub email: String,
}

/// Errors that can occur while talking to version control.
#[derive(Debug, Error)]
pub enum VcsError {
  /// Failed to open the repository.
  #[error("failed to open repository at '{path}': {source}")]
  Open {
    path: PathBuf,
    #[source]
    source: Box<gix::open::Error>,
  },

  /// The revision could not be resolved.
  #[error("revision '{rev}' not found in repository")]
  RevisionNotFound { rev: String },

  /// Failed to read an object reachable from a revision.
  #[error("failed to read objects for '{rev}': {source}")]
  Object {
    rev: String,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },

  /// The path does not exist at the revision.
  #[error("'{path}' does not exist at revision '{rev}'")]
  PathNotFound { rev: String, path: String },

  /// Failed to start the git binary.
  #[error("failed to run git: {0}")]
  Spawn(#[source] io::Error),

  /// A git command exited unsuccessfully.
  #[error("git {command} failed (exit code {code:?}): {stderr}")]
  CommandFailed {
    command: String,
    code: Option<i32>,
    stderr: String,
  },
}

/// Source of change sets and historical file content.
pub trait ChangeSource {
  /// Compute the change set for `basis`.
  fn change_set(&self, basis: &ChangeBasis) -> Result<ChangeSet, VcsError>;

  /// Content of `path` at `rev`.
  fn content_at(&self, rev: &str, path: &str) -> Result<Vec<u8>, VcsError>;

  /// Commit the file at `path` with `message`, attributed to `identity`.
  fn commit_file(&self, path: &Path, message: &str, identity: &Identity) -> Result<(), VcsError>;
}
