//! Implementation of the `bundlekit build` command.
//!
//! Loads the content index, runs the build pipeline for every requested
//! variant, and prints a summary with every non-fatal warning. Any fatal
//! condition surfaces as an error with its itemized report and a non-zero
//! exit.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::info;

use bundlekit_lib::{BuildRequest, CommandCompiler, DeployPolicy, JsonIndex, run_build};
use bundlekit_platform::{BuildLayout, PlatformTarget, SkuId, Variant};

use crate::output::{format_duration, print_info, print_stat, print_success, print_warning};

/// Arguments for the build command.
pub struct BuildArgs {
  pub sku: String,
  pub platform: String,
  pub variants: Vec<String>,
  pub scope: String,
  pub index: PathBuf,
  pub compiler: PathBuf,
  pub root: PathBuf,
  pub app_resources: Option<PathBuf>,
  pub embed: Vec<String>,
  pub manifest_name: Option<String>,
  pub dry_run: bool,
}

/// Execute the build command.
pub fn cmd_build(args: BuildArgs) -> Result<()> {
  let started = Instant::now();

  let platform: PlatformTarget = args.platform.parse().context("Invalid --platform")?;

  let mut variants = Vec::new();
  for name in &args.variants {
    let variant: Variant = name.parse().context("Invalid --variants")?;
    if !variants.contains(&variant) {
      variants.push(variant);
    }
  }

  let root = dunce::canonicalize(&args.root).unwrap_or_else(|_| args.root.clone());
  let app_resources = args.app_resources.clone().unwrap_or_else(|| root.join("resources"));

  let index = JsonIndex::from_file(&args.index).context("Failed to load content index")?;

  let compiler = Arc::new(CommandCompiler::new(&args.compiler));
  let layout = BuildLayout::new(root, app_resources);

  let mut policy = DeployPolicy::default();
  for bundle in &args.embed {
    if !policy.embedded_bundles.contains(bundle) {
      policy.embedded_bundles.push(bundle.clone());
    }
  }

  let request = BuildRequest {
    sku: SkuId::new(args.sku.as_str()),
    platform,
    variants,
    scope: args.scope.clone(),
    dry_run: args.dry_run,
    manifest_override: args.manifest_name.clone(),
  };

  print_info(&format!(
    "Building sku '{}' for {} ({})",
    args.sku,
    platform,
    request
      .variants
      .iter()
      .map(|v| v.to_string())
      .collect::<Vec<_>>()
      .join(", ")
  ));

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let outcome = rt
    .block_on(run_build(&request, &index, compiler, &layout, &policy))
    .context("Build failed")?;

  for warning in &outcome.warnings {
    print_warning(warning);
  }

  println!();
  if args.dry_run {
    print_success(&format!("Dry run complete in {}", format_duration(started.elapsed())));
  } else {
    print_success(&format!("Build complete in {}", format_duration(started.elapsed())));
  }
  print_stat("Bundles selected", &outcome.selection.len().to_string());
  print_stat("Variants", &outcome.merged.variant_ids().join(", "));

  if let Some(deployed) = &outcome.deployed {
    info!(path = %deployed.manifest_path.display(), "merged manifest saved");
    print_stat("Artifacts deployed", &deployed.deployed_files.to_string());
    print_stat("Artifacts embedded", &deployed.embedded_files.to_string());
    print_stat("Manifest", &deployed.manifest_path.display().to_string());
    if !deployed.stale_removed.is_empty() {
      print_stat("Stale manifests removed", &deployed.stale_removed.join(", "));
    }
  }

  Ok(())
}
