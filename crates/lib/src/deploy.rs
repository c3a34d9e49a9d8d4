//! Artifact naming and deployment.
//!
//! After the merge, every compiled artifact is copied from its variant build
//! folder into the platform output folder under its mangled name, a
//! configured subset of bundles is additionally embedded into the
//! application's resource tree, and the merged manifest is persisted to both
//! locations. Diagnostics (dependency dump, size report) are written
//! best-effort and never fail the build.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use bundlekit_platform::{
  BuildLayout, DEFAULT_MANIFEST_BASE, PlatformTarget, Variant, merged_manifest_name,
};
use walkdir::WalkDir;

use crate::compile::CompiledBundle;
use crate::manifest::{BundleManifest, ManifestError};
use crate::select::INIT_BUNDLE;
use crate::util::format_bytes;
use crate::verify::normalize_bundle_name;

/// Marker extension appended to embedded copies so the host runtime treats
/// them as opaque binary data instead of a native asset type.
pub const EMBED_MARKER_EXT: &str = "bytes";

/// Which variant of an embedded bundle a platform ships with.
///
/// Native targets embed the highest fidelity; the web target ships the
/// smallest payload it can.
pub fn embed_variant(platform: PlatformTarget) -> Variant {
  match platform {
    PlatformTarget::Windows
    | PlatformTarget::MacOs
    | PlatformTarget::Linux
    | PlatformTarget::Ios
    | PlatformTarget::Android => Variant::Hd,
    PlatformTarget::Web => Variant::Sd,
  }
}

/// Deployment configuration.
#[derive(Debug, Clone)]
pub struct DeployPolicy {
  /// Bundles to embed into the application resources, matched exactly
  /// against the un-mangled bundle name.
  pub embedded_bundles: Vec<String>,
}

impl Default for DeployPolicy {
  fn default() -> Self {
    Self {
      embedded_bundles: vec![INIT_BUNDLE.to_string()],
    }
  }
}

/// How the embedded manifest is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployMode {
  /// Write the merged manifest as-is; previous entries are discarded.
  Replace,
  /// Overlay the merged manifest onto the previously embedded one, so keys
  /// untouched by this (partial) build survive.
  MergeWithEmbedded,
}

/// Compiled artifacts of one variant, ready to deploy.
#[derive(Debug)]
pub struct VariantArtifacts {
  pub variant: Variant,
  pub bundles: Vec<CompiledBundle>,
}

/// What deployment did, for the final summary.
#[derive(Debug)]
pub struct DeploySummary {
  pub deployed_files: usize,
  pub embedded_files: usize,
  pub manifest_path: PathBuf,
  pub embedded_manifest_path: PathBuf,
  pub stale_removed: Vec<String>,
  pub warnings: Vec<String>,
}

/// Errors during deployment.
#[derive(Debug, Error)]
pub enum DeployError {
  #[error("io error at {path}: {source}")]
  Io {
    path: String,
    #[source]
    source: std::io::Error,
  },

  #[error(transparent)]
  Manifest(#[from] ManifestError),
}

fn io_err(path: &Path, source: std::io::Error) -> DeployError {
  DeployError::Io {
    path: path.display().to_string(),
    source,
  }
}

/// Deploy a merged build: copy artifacts, embed, persist manifests, clean
/// stale ones, write diagnostics.
pub fn deploy(
  merged: &BundleManifest,
  artifacts: &[VariantArtifacts],
  platform: PlatformTarget,
  layout: &BuildLayout,
  policy: &DeployPolicy,
  mode: DeployMode,
  manifest_override: Option<&str>,
) -> Result<DeploySummary, DeployError> {
  let output_dir = layout.output_dir(platform);
  let embedded_dir = layout.app_resources().to_path_buf();
  fs::create_dir_all(&output_dir).map_err(|e| io_err(&output_dir, e))?;
  fs::create_dir_all(&embedded_dir).map_err(|e| io_err(&embedded_dir, e))?;

  let mut warnings = Vec::new();

  // 1. Copy every artifact under its mangled (flattened) name.
  let mut deployed_files = 0;
  for build in artifacts {
    for bundle in &build.bundles {
      if bundle.file.as_os_str().is_empty() {
        continue;
      }
      match mangled_for(merged, build.variant, bundle) {
        Some(mangled) => {
          let dest = output_dir.join(flatten(&mangled));
          fs::copy(&bundle.file, &dest).map_err(|e| io_err(&dest, e))?;
          deployed_files += 1;
        }
        None => {
          warn!(bundle = %bundle.name, variant = %build.variant, "no rename entry, skipping copy");
          warnings.push(format!(
            "no rename entry for '{}' in variant '{}', artifact not deployed",
            bundle.name, build.variant
          ));
        }
      }
    }
  }

  // 2. Embed the policy-selected variant of the configured bundles.
  let mut embedded_files = 0;
  let chosen = embed_variant(platform);
  if let Some(build) = artifacts.iter().find(|a| a.variant == chosen) {
    for name in &policy.embedded_bundles {
      let found = build
        .bundles
        .iter()
        .find(|b| normalize_bundle_name(&b.name) == *name && !b.file.as_os_str().is_empty());
      match found.and_then(|b| mangled_for(merged, chosen, b).map(|m| (b, m))) {
        Some((bundle, mangled)) => {
          let dest = embedded_dir.join(format!("{}.{}", flatten(&mangled), EMBED_MARKER_EXT));
          fs::copy(&bundle.file, &dest).map_err(|e| io_err(&dest, e))?;
          embedded_files += 1;
          debug!(bundle = %name, variant = %chosen, "embedded");
        }
        None => {
          warnings.push(format!(
            "bundle '{}' configured for embedding was not built in variant '{}'",
            name, chosen
          ));
        }
      }
    }
  } else if !policy.embedded_bundles.is_empty() {
    warnings.push(format!(
      "embed variant '{}' was not part of this build, nothing embedded",
      chosen
    ));
  }

  // 3. Persist the manifest to the output folder and the embedded tree.
  let manifest_name = merged_manifest_name(DEFAULT_MANIFEST_BASE, manifest_override, platform);
  let embedded_manifest_path = embedded_dir.join(&manifest_name);

  let final_manifest = match mode {
    DeployMode::Replace => merged.clone(),
    DeployMode::MergeWithEmbedded => {
      if embedded_manifest_path.exists() {
        BundleManifest::load(&embedded_manifest_path)?.overlay(merged.clone())
      } else {
        merged.clone()
      }
    }
  };

  let manifest_path = output_dir.join(&manifest_name);
  final_manifest.save(&manifest_path)?;
  final_manifest.save(&embedded_manifest_path)?;

  // 4. Remove manifests for platforms this build does not cover.
  let stale_removed = remove_stale_manifests(
    &embedded_dir,
    manifest_override.unwrap_or(DEFAULT_MANIFEST_BASE),
    &manifest_name,
    &mut warnings,
  );

  // 5. Diagnostics, best-effort.
  write_diagnostics(&final_manifest, &output_dir, &layout.logs_dir(), &mut warnings);

  info!(
    deployed = deployed_files,
    embedded = embedded_files,
    stale = stale_removed.len(),
    "deployment complete"
  );

  Ok(DeploySummary {
    deployed_files,
    embedded_files,
    manifest_path,
    embedded_manifest_path,
    stale_removed,
    warnings,
  })
}

/// Look up a bundle's mangled name in the merged rename map.
fn mangled_for(merged: &BundleManifest, variant: Variant, bundle: &CompiledBundle) -> Option<String> {
  let raw = bundle.file.file_name()?.to_string_lossy().into_owned();
  merged
    .variants
    .get(variant.as_str())
    .and_then(|renames| renames.get(&raw))
    .cloned()
}

/// Mangled names must stay flat file names.
fn flatten(name: &str) -> String {
  name.replace(['/', '\\'], "_")
}

fn remove_stale_manifests(
  embedded_dir: &Path,
  base: &str,
  current: &str,
  warnings: &mut Vec<String>,
) -> Vec<String> {
  let mut removed = Vec::new();

  let entries = match fs::read_dir(embedded_dir) {
    Ok(entries) => entries,
    Err(e) => {
      warnings.push(format!("could not scan embedded resources for stale manifests: {}", e));
      return removed;
    }
  };

  for entry in entries.filter_map(|e| e.ok()) {
    let name = entry.file_name().to_string_lossy().into_owned();
    if name.starts_with(base) && name.ends_with(".txt") && name != current {
      match fs::remove_file(entry.path()) {
        Ok(()) => {
          info!(file = %name, "removed stale manifest");
          removed.push(name);
        }
        Err(e) => warnings.push(format!("could not remove stale manifest '{}': {}", name, e)),
      }
    }
  }

  removed
}

/// Write the dependency dump and size report. Purely informational; any
/// failure downgrades to a warning.
fn write_diagnostics(
  manifest: &BundleManifest,
  output_dir: &Path,
  logs_dir: &Path,
  warnings: &mut Vec<String>,
) {
  if let Err(e) = fs::create_dir_all(logs_dir) {
    warnings.push(format!("could not create logs folder: {}", e));
    return;
  }

  let mut deps_dump = String::new();
  for (bundle, deps) in &manifest.dependencies {
    deps_dump.push_str(&format!("{} -> {}\n", bundle, deps.join(", ")));
  }
  if let Err(e) = fs::write(logs_dir.join("bundle_deps.txt"), deps_dump) {
    warnings.push(format!("could not write dependency dump: {}", e));
  }

  let mut sizes: Vec<(u64, String)> = WalkDir::new(output_dir)
    .into_iter()
    .filter_map(|e| e.ok())
    .filter(|e| e.file_type().is_file())
    .filter_map(|e| {
      let size = e.metadata().ok()?.len();
      Some((size, e.file_name().to_string_lossy().into_owned()))
    })
    .collect();
  sizes.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));

  let mut size_report = String::new();
  for (size, name) in &sizes {
    size_report.push_str(&format!("{:>10}  {}\n", format_bytes(*size), name));
  }
  if let Err(e) = fs::write(logs_dir.join("bundle_sizes.txt"), size_report) {
    warnings.push(format!("could not write size report: {}", e));
  }
}
