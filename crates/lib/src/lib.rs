//! Bundle build and reconciliation pipeline.
//!
//! bundlekit builds deployable content bundles for a multi-SKU,
//! multi-platform, multi-variant application. One invocation:
//!
//! 1. Resolves the bundle names to build from a scope descriptor
//! 2. Invokes the external bundle compiler once per variant
//! 3. Verifies the compiler produced exactly what was requested
//! 4. Rejects circular references between bundles
//! 5. Builds a per-variant manifest (contents, dependencies, rename map)
//! 6. Merges the variants into one canonical manifest
//! 7. Deploys artifacts under content-hashed names and embeds a subset
//!    into the application's resource tree
//!
//! Variant builds run concurrently; merge and deployment run only after
//! every variant has succeeded. Any fatal condition aborts the whole
//! invocation before deployment with an itemized report.

pub mod compile;
pub mod deploy;
pub mod graph;
pub mod index;
pub mod manifest;
pub mod merge;
pub mod pipeline;
pub mod select;
pub mod util;
pub mod verify;

pub use compile::{BundleCompiler, BundleSpec, CommandCompiler, CompileError, CompiledBundle};
pub use deploy::{
  DeployError, DeployMode, DeployPolicy, DeploySummary, VariantArtifacts, embed_variant,
};
pub use graph::{CycleReport, DependencyGraph, GraphError};
pub use index::{ContentIndex, IndexError, JsonIndex};
pub use manifest::{BundleManifest, ManifestError};
pub use merge::{MergeError, merge_variants};
pub use pipeline::{BuildOutcome, BuildRequest, PipelineError, VariantBuild, run_build};
pub use select::{INIT_BUNDLE, SelectError, Selection, select_bundles};
pub use verify::{MismatchReport, VerifyError, normalize_bundle_name, verify_build};
