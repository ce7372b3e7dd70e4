//! Implementation of the `metapack manifest` command.

use std::path::Path;

use anyhow::{Context, Result};

use metapack_lib::manifest::{SkipReason, build_manifest, write_manifest};

use super::load_registry;
use crate::output::{print_success, print_warning};

pub fn cmd_manifest(paths: &[String], destructive: bool, out: Option<&Path>, registry: Option<&Path>) -> Result<()> {
  let registry = load_registry(registry)?;
  let output = build_manifest(&registry, paths, destructive);

  for skipped in &output.skipped {
    let reason = match skipped.reason {
      SkipReason::NotDeployable => "not a deployable member",
      SkipReason::NotDestructible => "cannot be deleted",
    };
    print_warning(&format!("Skipped {} ({})", skipped.path, reason));
  }

  match out {
    Some(path) => {
      write_manifest(&output.manifest, path).with_context(|| format!("Failed to write manifest: {}", path.display()))?;
      print_success(&format!(
        "Wrote {} member(s) in {} type(s) to {}",
        output.manifest.member_count(),
        output.manifest.types.len(),
        path.display()
      ));
    }
    None => {
      let xml = output.manifest.to_xml().context("Failed to serialize manifest")?;
      print!("{}", xml);
    }
  }

  Ok(())
}
