//! bundlekit - content bundle build and deployment tool.

mod cmd;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Build, verify and deploy content bundles per SKU, platform and variant.
#[derive(Parser)]
#[command(name = "bundlekit")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Build bundles for one SKU and platform and deploy the result
  Build {
    /// SKU to build content for
    #[arg(long)]
    sku: String,

    /// Platform target (windows, macos, linux, ios, android, web)
    #[arg(long)]
    platform: String,

    /// Variants to build, comma separated
    #[arg(long, value_delimiter = ',', default_value = "hd,sd")]
    variants: Vec<String>,

    /// Scope descriptor: all, none, games, features, or bundle names
    #[arg(long, default_value = "all")]
    scope: String,

    /// Content index file exported by the tagging editor
    #[arg(long, default_value = "content-index.json")]
    index: PathBuf,

    /// External bundle compiler program
    #[arg(long)]
    compiler: PathBuf,

    /// Build root directory
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Application embedded-resources directory (default: <root>/resources)
    #[arg(long)]
    app_resources: Option<PathBuf>,

    /// Additional bundle to embed into the application resources
    #[arg(long = "embed")]
    embed: Vec<String>,

    /// Manifest name override; the platform is appended to it
    #[arg(long)]
    manifest_name: Option<String>,

    /// Pass dry-run to the compiler and skip all deployment
    #[arg(long)]
    dry_run: bool,
  },

  /// Print a summary of an existing manifest file
  Inspect {
    /// Path to a manifest file
    manifest: PathBuf,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let default_filter = if cli.verbose { "debug" } else { "warn" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
    .without_time()
    .init();

  match cli.command {
    Commands::Build {
      sku,
      platform,
      variants,
      scope,
      index,
      compiler,
      root,
      app_resources,
      embed,
      manifest_name,
      dry_run,
    } => cmd::cmd_build(cmd::BuildArgs {
      sku,
      platform,
      variants,
      scope,
      index,
      compiler,
      root,
      app_resources,
      embed,
      manifest_name,
      dry_run,
    }),
    Commands::Inspect { manifest } => cmd::cmd_inspect(&manifest),
  }
}
