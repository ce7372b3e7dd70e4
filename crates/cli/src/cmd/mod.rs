mod classify;
mod deploy;
mod manifest;
mod types;

use std::path::Path;

use anyhow::{Context, Result};
use metapack_lib::registry::TypeRegistry;

pub use classify::cmd_classify;
pub use deploy::{DeployArgs, cmd_deploy};
pub use manifest::cmd_manifest;
pub use types::cmd_types;

/// Load the registry at `path`, or the built-in one.
fn load_registry(path: Option<&Path>) -> Result<TypeRegistry> {
  match path {
    Some(p) => TypeRegistry::load(p).with_context(|| format!("Failed to load registry: {}", p.display())),
    None => TypeRegistry::embedded().context("Failed to load built-in registry"),
  }
}
