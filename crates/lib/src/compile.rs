//! Bundle compiler boundary.
//!
//! The engine's bundle compiler is an external program. The pipeline hands
//! it a list of (bundle name, member paths) pairs and an output folder and
//! gets back one compiled artifact per requested bundle, each carrying the
//! member paths actually packed and the raw names of the bundles it depends
//! on. The packing algorithm itself is entirely the compiler's business.
//!
//! A compiler failure is always fatal; there is no retry.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

/// One bundle requested from the compiler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleSpec {
  pub name: String,
  pub members: Vec<String>,
}

impl BundleSpec {
  pub fn new(name: impl Into<String>, members: Vec<String>) -> Self {
    Self {
      name: name.into(),
      members,
    }
  }
}

/// One bundle actually produced by the compiler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledBundle {
  /// Bundle name as reported by the compiler; may carry a trailing content
  /// hash and/or a bundle extension on top of the requested name.
  pub name: String,

  /// Member paths packed into the bundle.
  #[serde(default)]
  pub members: Vec<String>,

  /// Raw names of bundles this one references, as reported by the
  /// compiler's dependency manifest.
  #[serde(rename = "dependencies", default)]
  pub raw_dependencies: Vec<String>,

  /// The compiled artifact file. Relative paths are resolved against the
  /// output folder; empty under dry run.
  #[serde(default)]
  pub file: PathBuf,
}

/// Errors from the compiler boundary.
#[derive(Debug, Error)]
pub enum CompileError {
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("failed to encode compile request: {0}")]
  Request(#[source] serde_json::Error),

  #[error("bundle compiler {program} failed with exit code {code:?}")]
  CompilerFailed { program: String, code: Option<i32> },

  #[error("failed to read compiler response {path}: {message}")]
  Response { path: String, message: String },
}

/// Interface to the external bundle compiler.
#[async_trait]
pub trait BundleCompiler: Send + Sync {
  /// Compile the requested bundles into `out_dir`.
  ///
  /// The compiler must report every requested bundle in its response, with
  /// zero members where a bundle name matched no content. Under `dry_run`
  /// it reports what it would build without writing artifact files.
  async fn compile(
    &self,
    requests: &[BundleSpec],
    out_dir: &Path,
    dry_run: bool,
  ) -> Result<Vec<CompiledBundle>, CompileError>;
}

/// Production adapter that shells out to the configured compiler program.
///
/// The request is written to `compile-request.json` in the output folder and
/// the program is invoked as:
///
/// ```text
/// <program> [<extra args>...] <request file> <output folder> [--dry-run]
/// ```
///
/// The program writes its dependency manifest to `compile-response.json` in
/// the output folder: a JSON list of compiled bundles.
#[derive(Debug, Clone)]
pub struct CommandCompiler {
  program: PathBuf,
  extra_args: Vec<String>,
}

const REQUEST_FILE: &str = "compile-request.json";
const RESPONSE_FILE: &str = "compile-response.json";

impl CommandCompiler {
  pub fn new(program: impl Into<PathBuf>) -> Self {
    Self {
      program: program.into(),
      extra_args: Vec::new(),
    }
  }

  pub fn with_args(mut self, args: Vec<String>) -> Self {
    self.extra_args = args;
    self
  }
}

#[async_trait]
impl BundleCompiler for CommandCompiler {
  async fn compile(
    &self,
    requests: &[BundleSpec],
    out_dir: &Path,
    dry_run: bool,
  ) -> Result<Vec<CompiledBundle>, CompileError> {
    tokio::fs::create_dir_all(out_dir).await?;

    let request_path = out_dir.join(REQUEST_FILE);
    let encoded = serde_json::to_string_pretty(requests).map_err(CompileError::Request)?;
    tokio::fs::write(&request_path, encoded).await?;

    info!(
      program = %self.program.display(),
      bundles = requests.len(),
      dry_run,
      "invoking bundle compiler"
    );

    let mut command = Command::new(&self.program);
    command.args(&self.extra_args).arg(&request_path).arg(out_dir);
    if dry_run {
      command.arg("--dry-run");
    }

    let output = command.output().await?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      if !stderr.is_empty() {
        debug!(stderr = %stderr, "compiler stderr");
      }
      return Err(CompileError::CompilerFailed {
        program: self.program.display().to_string(),
        code: output.status.code(),
      });
    }

    let response_path = out_dir.join(RESPONSE_FILE);
    let text = tokio::fs::read_to_string(&response_path)
      .await
      .map_err(|e| CompileError::Response {
        path: response_path.display().to_string(),
        message: e.to_string(),
      })?;

    let mut built: Vec<CompiledBundle> =
      serde_json::from_str(&text).map_err(|e| CompileError::Response {
        path: response_path.display().to_string(),
        message: e.to_string(),
      })?;

    // Artifact paths in the response are relative to the output folder.
    for bundle in &mut built {
      if bundle.file.as_os_str().is_empty() || bundle.file.is_absolute() {
        continue;
      }
      bundle.file = out_dir.join(&bundle.file);
    }

    debug!(built = built.len(), "compiler response parsed");

    Ok(built)
  }
}
