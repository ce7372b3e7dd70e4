//! Test utilities for metapack-lib.
//!
//! Provides a small fixture registry and an in-memory change source so tests can
//! exercise classification and orchestration without a real repository.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;

use crate::registry::TypeRegistry;
use crate::vcs::{ChangeBasis, ChangeSet, ChangeSource, Identity, VcsError};

/// Registry document used across unit tests.
pub const FIXTURE_REGISTRY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<salesforceMetadata>
    <version API="58.0"/>
    <extension name="cls">
        <container>Classes</container>
        <metadata>ApexClass</metadata>
        <destructible>true</destructible>
    </extension>
    <extension name="object">
        <container>Objects</container>
        <metadata>CustomObject</metadata>
        <destructible>true</destructible>
    </extension>
    <extension name="profile">
        <container>Profiles</container>
        <metadata>Profile</metadata>
        <destructible>false</destructible>
    </extension>
    <extension name="trigger">
        <container>Triggers</container>
        <metadata>ApexTrigger</metadata>
        <destructible>true</destructible>
    </extension>
    <extension name="xml">
        <container>empty</container>
        <metadata>XML</metadata>
        <destructible>false</destructible>
    </extension>
</salesforceMetadata>
"#;

pub fn fixture_registry() -> TypeRegistry {
  TypeRegistry::from_xml_str(FIXTURE_REGISTRY).unwrap()
}

pub fn paths(items: &[&str]) -> Vec<String> {
  items.iter().map(|s| s.to_string()).collect()
}

/// Write a file relative to `root`, creating parent directories.
pub fn write_file(root: &Path, relative: &str, content: &str) {
  let path = root.join(relative);
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent).unwrap();
  }
  std::fs::write(path, content).unwrap();
}

/// In-memory change source.
///
/// `diff` is returned for a two-commit basis and `tree` for a full-tree basis.
/// Every call to `change_set` and `commit_file` is recorded for assertions.
#[derive(Debug, Default)]
pub struct FakeSource {
  pub diff: ChangeSet,
  pub tree: Vec<String>,
  /// Content keyed by `(rev, path)`.
  pub contents: HashMap<(String, String), Vec<u8>>,
  pub fail_change_set: bool,
  pub bases: RefCell<Vec<ChangeBasis>>,
  pub commits: RefCell<Vec<(String, String, Identity)>>,
}

impl FakeSource {
  pub fn with_content(mut self, rev: &str, path: &str, content: &str) -> Self {
    self
      .contents
      .insert((rev.to_string(), path.to_string()), content.as_bytes().to_vec());
    self
  }
}

impl ChangeSource for FakeSource {
  fn change_set(&self, basis: &ChangeBasis) -> Result<ChangeSet, VcsError> {
    self.bases.borrow_mut().push(basis.clone());
    if self.fail_change_set {
      return Err(VcsError::RevisionNotFound {
        rev: basis.current().to_string(),
      });
    }
    match basis {
      ChangeBasis::FullTree { .. } => Ok(ChangeSet {
        additions: self.tree.clone(),
        ..ChangeSet::default()
      }),
      ChangeBasis::Diff { .. } => Ok(self.diff.clone()),
    }
  }

  fn content_at(&self, rev: &str, path: &str) -> Result<Vec<u8>, VcsError> {
    self
      .contents
      .get(&(rev.to_string(), path.to_string()))
      .cloned()
      .ok_or_else(|| VcsError::PathNotFound {
        rev: rev.to_string(),
        path: path.to_string(),
      })
  }

  fn commit_file(&self, path: &Path, message: &str, identity: &Identity) -> Result<(), VcsError> {
    self
      .commits
      .borrow_mut()
      .push((path.display().to_string(), message.to_string(), identity.clone()));
    Ok(())
  }
}
