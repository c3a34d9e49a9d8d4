//! Build orchestration.
//!
//! This module provides the high-level `run_build` function that drives the
//! full pipeline for one (sku, platform) invocation:
//!
//! 1. Resolve the scope descriptor into a bundle selection (once per SKU)
//! 2. Spawn one task per variant: compile, verify, cycle-check, build the
//!    per-variant manifest and rename map
//! 3. Join all variant tasks; the first fatal error aborts the rest
//! 4. Merge the per-variant manifests into one
//! 5. Deploy artifacts and persist the merged manifest
//!
//! Variant builds are independent (each writes to its own temp folder) and
//! run concurrently. Merge and deployment run only after every variant has
//! succeeded; nothing is deployed from a partially failed build.

use std::sync::Arc;

use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{error, info};

use bundlekit_platform::{BuildLayout, DEFAULT_MANIFEST_BASE, PlatformTarget, SkuId, Variant, variant_manifest_name};

use crate::compile::{BundleCompiler, BundleSpec, CompileError};
use crate::deploy::{DeployError, DeployMode, DeployPolicy, DeploySummary, VariantArtifacts, deploy};
use crate::graph::{DependencyGraph, GraphError};
use crate::index::ContentIndex;
use crate::manifest::{BundleManifest, ManifestError};
use crate::merge::{MergeError, merge_variants};
use crate::select::{SelectError, Selection, select_bundles};
use crate::verify::{VerifyError, verify_build};

/// One build invocation.
#[derive(Debug, Clone)]
pub struct BuildRequest {
  pub sku: SkuId,
  pub platform: PlatformTarget,
  pub variants: Vec<Variant>,
  /// Comma-separated scope descriptor, e.g. `all` or `games,lobby`.
  pub scope: String,
  /// Pass the compiler's dry-run mode through and skip all deployment I/O.
  pub dry_run: bool,
  /// Optional manifest name override; the platform is appended to it.
  pub manifest_override: Option<String>,
}

impl BuildRequest {
  pub fn new(sku: SkuId, platform: PlatformTarget, variants: Vec<Variant>) -> Self {
    Self {
      sku,
      platform,
      variants,
      scope: "all".to_string(),
      dry_run: false,
      manifest_override: None,
    }
  }
}

/// Result of one variant's build.
#[derive(Debug)]
pub struct VariantBuild {
  pub variant: Variant,
  pub manifest: BundleManifest,
  pub bundles: Vec<crate::compile::CompiledBundle>,
  pub warnings: Vec<String>,
}

/// Result of a whole invocation.
#[derive(Debug)]
pub struct BuildOutcome {
  pub selection: Selection,
  pub merged: BundleManifest,
  /// Non-fatal warnings from every variant, each prefixed with its variant.
  pub warnings: Vec<String>,
  /// Deployment summary; `None` under dry run.
  pub deployed: Option<DeploySummary>,
}

/// Errors that abort a build invocation.
#[derive(Debug, Error)]
pub enum PipelineError {
  #[error("no variants requested")]
  NoVariants,

  #[error(transparent)]
  Select(#[from] SelectError),

  #[error("compiler failed for variant {variant}: {source}")]
  Compile {
    variant: Variant,
    #[source]
    source: CompileError,
  },

  #[error("verification failed for variant {variant}: {source}")]
  Verify {
    variant: Variant,
    #[source]
    source: VerifyError,
  },

  #[error("manifest construction failed for variant {variant}: {source}")]
  Manifest {
    variant: Variant,
    #[source]
    source: ManifestError,
  },

  #[error("dependency analysis failed for variant {variant}: {source}")]
  Graph {
    variant: Variant,
    #[source]
    source: GraphError,
  },

  #[error(transparent)]
  Merge(#[from] MergeError),

  #[error(transparent)]
  Deploy(#[from] DeployError),

  #[error("variant build task failed: {0}")]
  Join(String),
}

/// Run the full pipeline for one build request.
pub async fn run_build<C>(
  request: &BuildRequest,
  index: &dyn ContentIndex,
  compiler: Arc<C>,
  layout: &BuildLayout,
  policy: &DeployPolicy,
) -> Result<BuildOutcome, PipelineError>
where
  C: BundleCompiler + ?Sized + 'static,
{
  if request.variants.is_empty() {
    return Err(PipelineError::NoVariants);
  }

  info!(
    sku = %request.sku,
    platform = %request.platform,
    variants = request.variants.len(),
    scope = %request.scope,
    dry_run = request.dry_run,
    "starting build"
  );

  // 1. Selection is per-SKU and shared by every variant.
  let selection = select_bundles(index, &request.sku, &request.scope)?;
  info!(bundles = selection.len(), "selection resolved");

  let specs: Vec<BundleSpec> = selection
    .iter()
    .map(|name| BundleSpec::new(name, index.members_of(name)))
    .collect();

  // 2. One task per variant, all building concurrently.
  let mut join_set: JoinSet<Result<VariantBuild, PipelineError>> = JoinSet::new();

  for &variant in &request.variants {
    let compiler = compiler.clone();
    let specs = specs.clone();
    let selection = selection.clone();
    let out_dir = layout.temp_dir(&request.sku, request.platform, variant);
    let dry_run = request.dry_run;

    join_set.spawn(async move {
      build_variant(compiler.as_ref(), &specs, &selection, variant, &out_dir, dry_run).await
    });
  }

  // 3. Join barrier; the first fatal error aborts the remaining variants.
  let mut builds: Vec<VariantBuild> = Vec::with_capacity(request.variants.len());
  while let Some(joined) = join_set.join_next().await {
    match joined {
      Ok(Ok(build)) => {
        info!(variant = %build.variant, bundles = build.bundles.len(), "variant build complete");
        builds.push(build);
      }
      Ok(Err(e)) => {
        error!(error = %e, "variant build failed, aborting");
        join_set.abort_all();
        return Err(e);
      }
      Err(e) => {
        error!(error = %e, "variant build task panicked");
        join_set.abort_all();
        return Err(PipelineError::Join(e.to_string()));
      }
    }
  }

  // Join order is arrival order; restore the requested variant order.
  builds.sort_by_key(|b| request.variants.iter().position(|&v| v == b.variant));

  let mut warnings = Vec::new();
  for build in &builds {
    warnings.extend(build.warnings.iter().map(|w| format!("[{}] {}", build.variant, w)));
  }

  // 4. Merge the per-variant manifests.
  let merged = merge_variants(builds.iter().map(|b| b.manifest.clone()).collect())?;

  // 5. Deploy, unless this is a dry run.
  let deployed = if request.dry_run {
    info!("dry run, skipping deployment");
    None
  } else {
    let mode = if is_full_scope(&request.scope) {
      DeployMode::Replace
    } else {
      DeployMode::MergeWithEmbedded
    };

    let artifacts: Vec<VariantArtifacts> = builds
      .into_iter()
      .map(|b| VariantArtifacts {
        variant: b.variant,
        bundles: b.bundles,
      })
      .collect();

    let summary = deploy(
      &merged,
      &artifacts,
      request.platform,
      layout,
      policy,
      mode,
      request.manifest_override.as_deref(),
    )?;
    warnings.extend(summary.warnings.iter().cloned());
    Some(summary)
  };

  info!(warnings = warnings.len(), "build complete");

  Ok(BuildOutcome {
    selection,
    merged,
    warnings,
    deployed,
  })
}

/// A scope that names `all` rebuilds every bundle, so the embedded manifest
/// can be replaced outright; any narrower scope must merge with it.
fn is_full_scope(scope: &str) -> bool {
  scope.split(',').any(|token| token.trim() == "all")
}

/// Build one variant: compile, verify, cycle-check, construct the manifest.
async fn build_variant<C>(
  compiler: &C,
  specs: &[BundleSpec],
  selection: &Selection,
  variant: Variant,
  out_dir: &std::path::Path,
  dry_run: bool,
) -> Result<VariantBuild, PipelineError>
where
  C: BundleCompiler + ?Sized,
{
  info!(variant = %variant, bundles = specs.len(), "building variant");

  let compiled = compiler
    .compile(specs, out_dir, dry_run)
    .await
    .map_err(|source| PipelineError::Compile { variant, source })?;

  let verified =
    verify_build(selection, compiled).map_err(|source| PipelineError::Verify { variant, source })?;
  let mut warnings = verified.warnings;

  let mut manifest = BundleManifest::from_compiled(&verified.bundles)
    .map_err(|source| PipelineError::Manifest { variant, source })?;

  DependencyGraph::from_dependencies(&manifest.dependencies)
    .check_acyclic()
    .map_err(|source| PipelineError::Graph { variant, source })?;

  if dry_run {
    // Keep the variant key so the merge still sees one per manifest.
    manifest.variants.entry(variant.to_string()).or_default();
  } else {
    warnings.extend(manifest.attach_rename_map(variant, &verified.bundles));

    let manifest_path = out_dir.join(variant_manifest_name(DEFAULT_MANIFEST_BASE, variant));
    manifest
      .save(&manifest_path)
      .map_err(|source| PipelineError::Manifest { variant, source })?;
  }

  Ok(VariantBuild {
    variant,
    manifest,
    bundles: verified.bundles,
    warnings,
  })
}
