//! Path classification.
//!
//! Turns a repository-relative path into a [`MetadataDescriptor`] by looking its
//! extension up in the [`TypeRegistry`]. Unknown extensions are a normal outcome
//! and produce an `Invalid` descriptor rather than an error.

use serde::Serialize;
use tracing::trace;

use crate::consts::{EMPTY_CONTAINER, INVALID_TYPE, META_MARKER, XML_TYPE};
use crate::registry::TypeRegistry;

/// A classified repository file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataDescriptor {
  /// Extension after the last dot of the file name, empty if none.
  pub extension: String,
  pub container: String,
  /// File name without its extension.
  pub member: String,
  pub declared_type: String,
  /// Directory portion of the path including the trailing separator, empty for top-level files.
  pub relative_path: String,
  pub destructible: bool,
  /// Whether the extension was found in the registry.
  pub valid: bool,
}

impl MetadataDescriptor {
  /// The file name (`member` plus extension).
  pub fn file_name(&self) -> String {
    if self.extension.is_empty() {
      self.member.clone()
    } else {
      format!("{}.{}", self.member, self.extension)
    }
  }

  /// The full repository-relative path this descriptor was built from.
  pub fn path(&self) -> String {
    format!("{}{}", self.relative_path, self.file_name())
  }

  /// Companion descriptor files such as `Foo.cls-meta.xml`.
  pub fn is_companion(&self) -> bool {
    self.file_name().contains(META_MARKER)
  }

  /// True for the `XML` and `Invalid` sentinel types, which never get a manifest entry.
  pub fn is_sentinel(&self) -> bool {
    self.declared_type == XML_TYPE || self.declared_type == INVALID_TYPE
  }
}

/// Split a path into `(directory, file name)`. Accepts `/` and `\` separators.
fn split_path(path: &str) -> (&str, &str) {
  match path.rfind(['/', '\\']) {
    Some(idx) => (&path[..=idx], &path[idx + 1..]),
    None => ("", path),
  }
}

/// Split a file name into `(stem, extension)` at its last dot.
fn split_extension(file_name: &str) -> (&str, &str) {
  match file_name.rfind('.') {
    Some(idx) => (&file_name[..idx], &file_name[idx + 1..]),
    None => (file_name, ""),
  }
}

/// Classify a single repository path.
pub fn classify(registry: &TypeRegistry, path: &str) -> MetadataDescriptor {
  let (relative_path, file_name) = split_path(path);
  let (member, extension) = split_extension(file_name);

  trace!(path, member, extension, "classifying");

  match registry.lookup(extension) {
    Some(rule) => MetadataDescriptor {
      extension: extension.to_string(),
      container: rule.container.clone(),
      member: member.to_string(),
      declared_type: rule.declared_type.clone(),
      relative_path: relative_path.to_string(),
      destructible: rule.destructible,
      valid: true,
    },
    None => MetadataDescriptor {
      extension: extension.to_string(),
      container: EMPTY_CONTAINER.to_string(),
      member: member.to_string(),
      declared_type: INVALID_TYPE.to_string(),
      relative_path: relative_path.to_string(),
      destructible: false,
      valid: false,
    },
  }
}
