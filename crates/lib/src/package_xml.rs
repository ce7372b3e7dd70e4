//! Repository `package.xml` maintenance.
//!
//! Keeps the repository's own manifest listing every declared type the registry
//! knows about. Missing types are appended with the `*` wildcard member; types
//! already present are left exactly as they are.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::consts::WILDCARD_MEMBER;
use crate::manifest::{ManifestError, PackageManifest, TypeGroup, write_manifest};
use crate::registry::TypeRegistry;
use crate::vcs::{ChangeSource, Identity, VcsError};

/// Commit message used when the repository manifest changes.
pub const UPDATE_MESSAGE: &str = "Update package.xml with all declared metadata types";

/// Errors that can occur while updating the repository manifest.
#[derive(Debug, Error)]
pub enum PackageXmlError {
  /// Failed to read the existing manifest.
  #[error("failed to read '{path}': {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  /// Failed to parse or write the manifest.
  #[error("{path}: {source}")]
  Manifest {
    path: PathBuf,
    #[source]
    source: ManifestError,
  },

  /// Failed to commit the change.
  #[error("failed to commit '{path}': {source}")]
  Commit {
    path: PathBuf,
    #[source]
    source: VcsError,
  },
}

/// Append a wildcard group for every registry type missing from `manifest`.
///
/// Returns the names of the types that were added.
pub fn add_missing_types(manifest: &mut PackageManifest, registry: &TypeRegistry) -> Vec<String> {
  let mut added = Vec::new();
  for declared_type in registry.declared_types() {
    if manifest.group(declared_type).is_none() {
      manifest.types.push(TypeGroup {
        name: declared_type.to_string(),
        members: vec![WILDCARD_MEMBER.to_string()],
      });
      added.push(declared_type.to_string());
    }
  }
  if manifest.version.trim().is_empty() {
    manifest.version = registry.api_version().to_string();
  }
  added
}

/// Bring the manifest at `path` up to date with `registry`.
///
/// A missing file starts out as an empty manifest. The file is only rewritten
/// when at least one type was added. Returns whether it was rewritten.
pub fn update_package_xml(registry: &TypeRegistry, path: &Path) -> Result<bool, PackageXmlError> {
  let mut manifest = match fs::read_to_string(path) {
    Ok(content) => PackageManifest::from_xml(&content).map_err(|source| PackageXmlError::Manifest {
      path: path.to_path_buf(),
      source,
    })?,
    Err(e) if e.kind() == io::ErrorKind::NotFound => {
      debug!(path = %path.display(), "no repository manifest, starting empty");
      PackageManifest::new(registry.api_version())
    }
    Err(source) => {
      return Err(PackageXmlError::Read {
        path: path.to_path_buf(),
        source,
      });
    }
  };

  let added = add_missing_types(&mut manifest, registry);
  if added.is_empty() {
    debug!(path = %path.display(), "repository manifest already lists every type");
    return Ok(false);
  }

  write_manifest(&manifest, path).map_err(|source| PackageXmlError::Manifest {
    path: path.to_path_buf(),
    source,
  })?;
  info!(path = %path.display(), added = added.len(), "updated repository manifest");
  Ok(true)
}

/// Update the manifest at `path` and commit it as `identity` when it changed.
pub fn update_registry_file<S: ChangeSource + ?Sized>(
  source: &S,
  registry: &TypeRegistry,
  path: &Path,
  identity: &Identity,
) -> Result<bool, PackageXmlError> {
  let changed = update_package_xml(registry, path)?;
  if changed {
    source
      .commit_file(path, UPDATE_MESSAGE, identity)
      .map_err(|source| PackageXmlError::Commit {
        path: path.to_path_buf(),
        source,
      })?;
  }
  Ok(changed)
}
