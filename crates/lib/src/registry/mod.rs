//! Metadata type registry.
//!
//! The registry maps a file extension to the deployable type it represents. It is
//! loaded once from an XML document and is read-only afterwards, so a single
//! instance can be shared by reference across every classification.
//!
//! # Document Format
//!
//! ```xml
//! <salesforceMetadata>
//!     <version API="58.0"/>
//!     <extension name="cls">
//!         <container>classes</container>
//!         <metadata>ApexClass</metadata>
//!         <destructible>true</destructible>
//!     </extension>
//! </salesforceMetadata>
//! ```

mod types;

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tracing::{debug, warn};

pub use types::*;

use crate::consts::XML_TYPE;

/// Registry document compiled into the library.
const EMBEDDED_REGISTRY: &str = include_str!("default.xml");

/// Read-only lookup from file extension to [`TypeRule`].
#[derive(Debug, Clone)]
pub struct TypeRegistry {
  api_version: String,
  rules: Vec<TypeRule>,
  by_extension: HashMap<String, usize>,
}

impl TypeRegistry {
  /// Parse a registry from its XML text.
  ///
  /// Extensions are unique keys; when a document repeats one, the first entry wins
  /// and the rest are ignored with a warning.
  pub fn from_xml_str(content: &str) -> Result<Self, RegistryError> {
    let document: RegistryDocument = quick_xml::de::from_str(content).map_err(RegistryError::Parse)?;

    let api_version = document
      .version
      .and_then(|v| v.api)
      .map(|v| v.trim().to_string())
      .filter(|v| !v.is_empty())
      .ok_or(RegistryError::MissingVersion)?;

    let mut rules = Vec::with_capacity(document.extensions.len());
    let mut by_extension = HashMap::with_capacity(document.extensions.len());

    for element in document.extensions {
      let extension = element.name.trim().to_string();
      let declared_type = element.metadata.trim().to_string();
      if extension.is_empty() {
        return Err(RegistryError::EmptyExtension { declared_type });
      }
      if by_extension.contains_key(&extension) {
        warn!(extension = %extension, "duplicate extension in type registry, keeping first entry");
        continue;
      }

      by_extension.insert(extension.clone(), rules.len());
      rules.push(TypeRule {
        extension,
        container: element.container.trim().to_string(),
        declared_type,
        destructible: element.destructible.trim().eq_ignore_ascii_case("true"),
      });
    }

    debug!(rules = rules.len(), api = %api_version, "loaded type registry");

    Ok(Self {
      api_version,
      rules,
      by_extension,
    })
  }

  /// Load a registry document from disk.
  pub fn load(path: &Path) -> Result<Self, RegistryError> {
    let content = fs::read_to_string(path).map_err(|source| RegistryError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    Self::from_xml_str(&content)
  }

  /// The registry shipped with the library.
  pub fn embedded() -> Result<Self, RegistryError> {
    Self::from_xml_str(EMBEDDED_REGISTRY)
  }

  /// Load from `path` when given, otherwise fall back to the embedded registry.
  pub fn load_or_embedded(path: Option<&Path>) -> Result<Self, RegistryError> {
    match path {
      Some(path) => Self::load(path),
      None => Self::embedded(),
    }
  }

  /// Find the rule for an extension. Matching is case-sensitive.
  pub fn lookup(&self, extension: &str) -> Option<&TypeRule> {
    self.by_extension.get(extension).map(|&idx| &self.rules[idx])
  }

  /// The deployment API version declared by the document.
  pub fn api_version(&self) -> &str {
    &self.api_version
  }

  /// All rules in document order.
  pub fn rules(&self) -> &[TypeRule] {
    &self.rules
  }

  /// Distinct deployable types in document order, without the `XML` companion type.
  pub fn declared_types(&self) -> Vec<&str> {
    let mut types: Vec<&str> = Vec::new();
    for rule in &self.rules {
      let name = rule.declared_type.as_str();
      if name != XML_TYPE && !name.is_empty() && !types.contains(&name) {
        types.push(name);
      }
    }
    types
  }

  pub fn len(&self) -> usize {
    self.rules.len()
  }

  pub fn is_empty(&self) -> bool {
    self.rules.is_empty()
  }
}
