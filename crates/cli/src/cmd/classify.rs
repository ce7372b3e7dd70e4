use std::path::Path;

use anyhow::Result;

use metapack_lib::classify::{MetadataDescriptor, classify};

use super::load_registry;
use crate::output::{OutputFormat, print_json, print_stat, symbols};

pub fn cmd_classify(paths: &[String], registry: Option<&Path>, format: OutputFormat) -> Result<()> {
  let registry = load_registry(registry)?;
  let descriptors: Vec<MetadataDescriptor> = paths.iter().map(|p| classify(&registry, p)).collect();

  if format.is_json() {
    return print_json(&descriptors);
  }

  for (path, descriptor) in paths.iter().zip(&descriptors) {
    let symbol = if descriptor.valid { symbols::SUCCESS } else { symbols::ERROR };
    println!("{} {}", symbol, path);
    print_stat("Type", &descriptor.declared_type);
    print_stat("Member", &descriptor.member);
    print_stat("Container", &descriptor.container);
    print_stat("Destructible", if descriptor.destructible { "yes" } else { "no" });
  }

  Ok(())
}
