//! Implementation of the `bundlekit inspect` command.

use std::path::Path;

use anyhow::{Context, Result};

use bundlekit_lib::BundleManifest;

use crate::output::{print_info, print_stat};

/// Print a summary of an existing manifest file.
pub fn cmd_inspect(path: &Path) -> Result<()> {
  let manifest = BundleManifest::load(path).context("Failed to load manifest")?;

  print_info(&format!("Manifest {}", path.display()));
  print_stat("Bundles", &manifest.contents.len().to_string());
  print_stat(
    "With dependencies",
    &manifest.dependencies.len().to_string(),
  );
  print_stat("Variants", &manifest.variant_ids().join(", "));

  println!();
  for (bundle, members) in &manifest.contents {
    let deps = manifest
      .dependencies
      .get(bundle)
      .map(|d| format!(" -> {}", d.join(", ")))
      .unwrap_or_default();
    println!("  {} ({} members){}", bundle, members.len(), deps);
  }

  for (variant, renames) in &manifest.variants {
    println!();
    println!("  [{}] {} artifacts", variant, renames.len());
    for (raw, mangled) in renames {
      println!("    {} => {}", raw, mangled);
    }
  }

  Ok(())
}
