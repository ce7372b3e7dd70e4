use std::path::Path;

use anyhow::Result;
use serde_json::json;

use super::load_registry;
use crate::output::{OutputFormat, print_info, print_json, print_stat};

pub fn cmd_types(registry: Option<&Path>, format: OutputFormat) -> Result<()> {
  let registry = load_registry(registry)?;

  if format.is_json() {
    return print_json(&json!({
      "api_version": registry.api_version(),
      "types": registry.declared_types(),
      "rules": registry.rules(),
    }));
  }

  print_info(&format!("API version {}", registry.api_version()));
  print_stat("Extensions", &registry.len().to_string());
  println!();
  for declared_type in registry.declared_types() {
    println!("  {}", declared_type);
  }

  Ok(())
}
