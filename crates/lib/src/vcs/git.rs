//! Git-backed [`ChangeSource`].
//!
//! Reads (revision lookup, tree listings, blob content) go through `gix`. Commits
//! are made with the `git` binary so hooks and the repository's own configuration
//! apply as they would for a developer.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use gix::ObjectId;
use tracing::{debug, info};

use super::{ChangeBasis, ChangeSet, ChangeSource, Identity, VcsError};

type Listing = BTreeMap<String, ObjectId>;

/// A git repository on disk.
pub struct GitRepository {
  root: PathBuf,
  repo: gix::Repository,
  /// Most recently listed tree, reused by consecutive `content_at` calls.
  last_listing: RefCell<Option<(String, Listing)>>,
}

impl std::fmt::Debug for GitRepository {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("GitRepository").field("root", &self.root).finish()
  }
}

impl GitRepository {
  /// Open the repository whose working tree is at `root`.
  pub fn open(root: &Path) -> Result<Self, VcsError> {
    let repo = gix::open(root).map_err(|e| VcsError::Open {
      path: root.to_path_buf(),
      source: Box::new(e),
    })?;
    debug!(path = %root.display(), "opened repository");

    Ok(Self {
      root: root.to_path_buf(),
      repo,
      last_listing: RefCell::new(None),
    })
  }

  /// Working tree root.
  pub fn root(&self) -> &Path {
    &self.root
  }

  /// Resolve a revision spec to a full commit hash.
  pub fn resolve(&self, rev: &str) -> Result<String, VcsError> {
    Ok(self.resolve_id(rev)?.to_string())
  }

  fn resolve_id(&self, rev: &str) -> Result<ObjectId, VcsError> {
    let spec = self
      .repo
      .rev_parse(rev)
      .map_err(|_| VcsError::RevisionNotFound { rev: rev.to_string() })?;

    let id = spec.single().ok_or_else(|| VcsError::RevisionNotFound {
      rev: format!("{} (ambiguous)", rev),
    })?;

    Ok(id.detach())
  }

  /// Every file at `rev`, keyed by path, with its blob id.
  fn list_files(&self, rev: &str) -> Result<Listing, VcsError> {
    let object_error = |e: Box<dyn std::error::Error + Send + Sync>| VcsError::Object {
      rev: rev.to_string(),
      source: e,
    };

    let id = self.resolve_id(rev)?;
    let tree = self
      .repo
      .find_object(id)
      .map_err(|e| object_error(Box::new(e)))?
      .peel_to_tree()
      .map_err(|e| object_error(Box::new(e)))?;

    let mut recorder = gix::traverse::tree::Recorder::default();
    tree
      .traverse()
      .breadthfirst(&mut recorder)
      .map_err(|e| object_error(Box::new(e)))?;

    let files: Listing = recorder
      .records
      .into_iter()
      .filter(|entry| !entry.mode.is_tree() && !entry.mode.is_commit())
      .map(|entry| (entry.filepath.to_string(), entry.oid))
      .collect();

    debug!(rev, files = files.len(), "listed tree");
    Ok(files)
  }

  /// Look up a path at `rev`, reusing the previous listing when `rev` repeats.
  fn blob_id(&self, rev: &str, path: &str) -> Result<ObjectId, VcsError> {
    let mut cache = self.last_listing.borrow_mut();
    let cached = matches!(cache.as_ref(), Some((cached_rev, _)) if cached_rev == rev);
    if !cached {
      *cache = Some((rev.to_string(), self.list_files(rev)?));
    }

    cache
      .as_ref()
      .and_then(|(_, listing)| listing.get(path).copied())
      .ok_or_else(|| VcsError::PathNotFound {
        rev: rev.to_string(),
        path: path.to_string(),
      })
  }

  /// Run git in the working tree, optionally attributing commits to `identity`.
  fn git(&self, args: &[&str], identity: Option<&Identity>) -> Result<String, VcsError> {
    let mut command = Command::new("git");
    command.arg("-C").arg(&self.root).args(args);
    if let Some(identity) = identity {
      command
        .env("GIT_AUTHOR_NAME", &identity.name)
        .env("GIT_AUTHOR_EMAIL", &identity.email)
        .env("GIT_COMMITTER_NAME", &identity.name)
        .env("GIT_COMMITTER_EMAIL", &identity.email);
    }

    debug!(args = ?args, "running git");
    let output = command.output().map_err(VcsError::Spawn)?;

    if !output.status.success() {
      return Err(VcsError::CommandFailed {
        command: args.first().copied().unwrap_or_default().to_string(),
        code: output.status.code(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
      });
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }
}

impl ChangeSource for GitRepository {
  fn change_set(&self, basis: &ChangeBasis) -> Result<ChangeSet, VcsError> {
    let current = self.list_files(basis.current())?;

    let set = match basis.previous() {
      Some(previous) => {
        let previous = self.list_files(previous)?;
        ChangeSet::between(&previous, &current)
      }
      None => ChangeSet {
        additions: current.into_keys().collect(),
        ..ChangeSet::default()
      },
    };

    info!(
      additions = set.additions.len(),
      deletions = set.deletions.len(),
      modified = set.modified_new.len(),
      "computed change set"
    );
    Ok(set)
  }

  fn content_at(&self, rev: &str, path: &str) -> Result<Vec<u8>, VcsError> {
    let id = self.blob_id(rev, path)?;
    let object = self.repo.find_object(id).map_err(|e| VcsError::Object {
      rev: rev.to_string(),
      source: Box::new(e),
    })?;
    Ok(object.detach().data)
  }

  fn commit_file(&self, path: &Path, message: &str, identity: &Identity) -> Result<(), VcsError> {
    let relative = path.strip_prefix(&self.root).unwrap_or(path);
    let relative = relative.to_string_lossy();

    self.git(&["add", "--", &relative], None)?;
    self.git(&["commit", "-m", message, "--", &relative], Some(identity))?;

    info!(path = %relative, author = %identity.name, "committed file");
    Ok(())
  }
}
