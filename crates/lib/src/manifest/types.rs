use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::classify::MetadataDescriptor;
use crate::consts::PACKAGE_NAMESPACE;

/// A deployment manifest: declared types with their members, plus the API version.
///
/// Groups keep first-occurrence order, as do members within a group. This is the
/// exact shape written to `package.xml` / `destructiveChanges.xml`:
///
/// ```xml
/// <Package xmlns="http://soap.sforce.com/2006/04/metadata">
///     <types>
///         <name>ApexClass</name>
///         <members>Foo</members>
///     </types>
///     <version>58.0</version>
/// </Package>
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename = "Package")]
pub struct PackageManifest {
  #[serde(rename = "@xmlns", default = "default_namespace")]
  pub xmlns: String,
  #[serde(rename = "types", default)]
  pub types: Vec<TypeGroup>,
  #[serde(default)]
  pub version: String,
}

/// One `types` element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeGroup {
  pub name: String,
  #[serde(rename = "members", default)]
  pub members: Vec<String>,
}

fn default_namespace() -> String {
  PACKAGE_NAMESPACE.to_string()
}

/// Why a path was left out of a manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
  /// Unknown extension or plain XML file without the `-meta` marker.
  NotDeployable,
  /// Deletion requested for a type the deployment API cannot delete.
  NotDestructible,
}

/// A path excluded from both the manifest and the accepted list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedMember {
  pub path: String,
  pub declared_type: String,
  pub reason: SkipReason,
}

/// Result of folding a list of paths into a manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutput {
  pub manifest: PackageManifest,
  /// Descriptors whose files belong in the staging directory, in input order.
  pub accepted: Vec<MetadataDescriptor>,
  pub skipped: Vec<SkippedMember>,
}

/// Paths and results of a destructive + standard manifest pair.
#[derive(Debug, Clone)]
pub struct GeneratedManifests {
  pub package_path: PathBuf,
  pub destructive_path: PathBuf,
  pub standard: BuildOutput,
  pub destructive: BuildOutput,
}

impl GeneratedManifests {
  /// Files to copy into the stage: the accepted members of the standard manifest.
  pub fn members(&self) -> &[MetadataDescriptor] {
    &self.standard.accepted
  }
}

/// Errors that can occur while producing or reading manifests.
#[derive(Debug, Error)]
pub enum ManifestError {
  /// Failed to serialize the manifest to XML.
  #[error("failed to serialize manifest: {0}")]
  Serialize(#[source] quick_xml::SeError),

  /// Failed to parse a manifest document.
  #[error("failed to parse manifest: {0}")]
  Parse(#[source] quick_xml::DeError),

  /// Failed to write the manifest file.
  #[error("failed to write manifest '{path}': {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}
