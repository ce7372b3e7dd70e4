use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A registry entry mapping a file extension to its deployable type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeRule {
  /// File extension without the leading dot (case-sensitive key).
  pub extension: String,
  /// Coarse grouping label, informational only.
  pub container: String,
  /// The deployable type name written into manifests.
  pub declared_type: String,
  /// Whether components of this type may be targeted by a deletion.
  pub destructible: bool,
}

/// Errors that can occur while loading the type registry.
#[derive(Debug, Error)]
pub enum RegistryError {
  /// Failed to read the registry document from disk.
  #[error("failed to read type registry '{path}': {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  /// The registry document is not well-formed or has the wrong shape.
  #[error("failed to parse type registry: {0}")]
  Parse(#[source] quick_xml::DeError),

  /// No `version` element carrying an `API` attribute.
  #[error("type registry does not declare an API version")]
  MissingVersion,

  /// An `extension` element with an empty `name` attribute.
  #[error("type registry entry for '{declared_type}' has an empty extension name")]
  EmptyExtension { declared_type: String },
}

/// Raw shape of the registry XML document.
#[derive(Debug, Deserialize)]
pub(super) struct RegistryDocument {
  pub version: Option<VersionElement>,
  #[serde(rename = "extension", default)]
  pub extensions: Vec<ExtensionElement>,
}

#[derive(Debug, Deserialize)]
pub(super) struct VersionElement {
  #[serde(rename = "@API")]
  pub api: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ExtensionElement {
  #[serde(rename = "@name")]
  pub name: String,
  #[serde(default)]
  pub container: String,
  #[serde(default)]
  pub metadata: String,
  #[serde(default)]
  pub destructible: String,
}
