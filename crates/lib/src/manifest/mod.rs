//! Deployment manifest generation.
//!
//! A manifest is built by folding classified paths, one at a time, into a map of
//! declared type to members. The map is serialized once at the end; nothing is
//! searched or rearranged after insertion.
//!
//! # Fold rules
//!
//! For each path, in input order:
//! 1. `XML`/`Invalid` types never reach the manifest. Companion `-meta` files are
//!    still accepted (they are copied alongside their component); anything else is
//!    skipped as not deployable.
//! 2. In a destructive manifest, types that cannot be deleted are skipped with a warning.
//! 3. Everything else is accepted and its member added under its declared type.
//!
//! The type check always runs before the destructibility check.

mod types;

use std::collections::{HashMap, HashSet};
use std::path::Path;

use tracing::{debug, info, warn};

pub use types::*;

use crate::classify::{MetadataDescriptor, classify};
use crate::consts::{DESTRUCTIVE_MANIFEST, PACKAGE_MANIFEST, PACKAGE_NAMESPACE};
use crate::registry::TypeRegistry;
use crate::util::fs::write_atomic;

const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

impl PackageManifest {
  /// An empty manifest for the given API version.
  pub fn new(version: impl Into<String>) -> Self {
    Self {
      xmlns: PACKAGE_NAMESPACE.to_string(),
      types: Vec::new(),
      version: version.into(),
    }
  }

  /// Parse a manifest document.
  pub fn from_xml(content: &str) -> Result<Self, ManifestError> {
    quick_xml::de::from_str(content).map_err(ManifestError::Parse)
  }

  /// Serialize to an indented UTF-8 XML document.
  pub fn to_xml(&self) -> Result<String, ManifestError> {
    use serde::Serialize;

    let mut body = String::new();
    let mut serializer =
      quick_xml::se::Serializer::with_root(&mut body, Some("Package")).map_err(ManifestError::Serialize)?;
    serializer.indent(' ', 4);
    self.serialize(serializer).map_err(ManifestError::Serialize)?;

    let mut xml = String::with_capacity(XML_DECLARATION.len() + body.len() + 1);
    xml.push_str(XML_DECLARATION);
    xml.push_str(&body);
    xml.push('\n');
    Ok(xml)
  }

  /// Look up the group for a declared type.
  pub fn group(&self, declared_type: &str) -> Option<&TypeGroup> {
    self.types.iter().find(|g| g.name == declared_type)
  }

  /// Total member count across all groups.
  pub fn member_count(&self) -> usize {
    self.types.iter().map(|g| g.members.len()).sum()
  }

  pub fn is_empty(&self) -> bool {
    self.types.is_empty()
  }
}

/// Incremental type -> members grouping preserving first-occurrence order.
#[derive(Debug, Default)]
struct Grouping {
  groups: Vec<TypeGroup>,
  index: HashMap<String, usize>,
  seen: HashSet<(usize, String)>,
}

impl Grouping {
  fn insert(&mut self, declared_type: &str, member: &str) {
    let idx = match self.index.get(declared_type) {
      Some(&idx) => idx,
      None => {
        debug!(declared_type, "adding type group");
        self.groups.push(TypeGroup {
          name: declared_type.to_string(),
          members: Vec::new(),
        });
        self.index.insert(declared_type.to_string(), self.groups.len() - 1);
        self.groups.len() - 1
      }
    };

    if self.seen.insert((idx, member.to_string())) {
      self.groups[idx].members.push(member.to_string());
    }
  }

  fn finish(self, version: &str) -> PackageManifest {
    PackageManifest {
      xmlns: PACKAGE_NAMESPACE.to_string(),
      types: self.groups,
      version: version.to_string(),
    }
  }
}

/// Fold `paths` into a manifest.
///
/// `destructive` marks a deletion manifest, where members of non-destructible
/// types are dropped. Returns the manifest together with the accepted descriptors
/// (files to stage) and the skipped paths.
pub fn build_manifest<S: AsRef<str>>(registry: &TypeRegistry, paths: &[S], destructive: bool) -> BuildOutput {
  let mut grouping = Grouping::default();
  let mut accepted: Vec<MetadataDescriptor> = Vec::new();
  let mut skipped = Vec::new();

  for path in paths {
    let path = path.as_ref();
    let descriptor = classify(registry, path);

    if descriptor.is_sentinel() {
      if descriptor.is_companion() {
        debug!(path, "companion file accepted, not needed in manifest");
        accepted.push(descriptor);
      } else {
        warn!(path, "not a deployable member");
        skipped.push(SkippedMember {
          path: path.to_string(),
          declared_type: descriptor.declared_type,
          reason: SkipReason::NotDeployable,
        });
      }
      continue;
    }

    if destructive && !descriptor.destructible {
      warn!(path, declared_type = %descriptor.declared_type, "cannot be deleted via the API");
      skipped.push(SkippedMember {
        path: path.to_string(),
        declared_type: descriptor.declared_type,
        reason: SkipReason::NotDestructible,
      });
      continue;
    }

    grouping.insert(&descriptor.declared_type, &descriptor.member);
    accepted.push(descriptor);
  }

  BuildOutput {
    manifest: grouping.finish(registry.api_version()),
    accepted,
    skipped,
  }
}

/// Serialize `manifest` and write it atomically to `path`.
///
/// A failed write never leaves a partial file at `path`.
pub fn write_manifest(manifest: &PackageManifest, path: &Path) -> Result<(), ManifestError> {
  let xml = manifest.to_xml()?;
  write_atomic(path, xml.as_bytes()).map_err(|source| ManifestError::Write {
    path: path.to_path_buf(),
    source,
  })?;
  info!(path = %path.display(), types = manifest.types.len(), members = manifest.member_count(), "saved manifest");
  Ok(())
}

/// Build a manifest from `paths` and write it to `path`.
pub fn generate<S: AsRef<str>>(
  registry: &TypeRegistry,
  paths: &[S],
  path: &Path,
  destructive: bool,
) -> Result<BuildOutput, ManifestError> {
  let output = build_manifest(registry, paths, destructive);
  write_manifest(&output.manifest, path)?;
  Ok(output)
}

/// Write the destructive and standard manifests for a change into `dir`.
///
/// `destructions` become `destructiveChanges.xml`, `updates` become `package.xml`.
pub fn generate_manifests<S: AsRef<str>>(
  registry: &TypeRegistry,
  destructions: &[S],
  updates: &[S],
  dir: &Path,
) -> Result<GeneratedManifests, ManifestError> {
  let destructive_path = dir.join(DESTRUCTIVE_MANIFEST);
  let package_path = dir.join(PACKAGE_MANIFEST);

  let destructive = generate(registry, destructions, &destructive_path, true)?;
  let standard = generate(registry, updates, &package_path, false)?;

  Ok(GeneratedManifests {
    package_path,
    destructive_path,
    standard,
    destructive,
  })
}
