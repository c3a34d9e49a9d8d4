//! Bundle selection from a scope descriptor.
//!
//! A scope descriptor is a comma-separated list of tokens resolved against
//! the universe of bundles carrying the requested SKU's label:
//!
//! - `all` — every SKU bundle
//! - `none` — only the initialization bundle
//! - `games` — SKU bundles with content under the `games/` namespace
//! - `features` — SKU bundles with no content under that namespace
//! - anything else — taken verbatim as a bundle name
//!
//! Token resolutions are unioned, deduplicated and sorted so the compiler
//! and verifier see a deterministic ordering. An empty selection is fatal
//! unless the scope was `none` — a SKU that selects nothing would ship no
//! content at all.

use std::collections::BTreeSet;

use thiserror::Error;
use tracing::debug;

use bundlekit_platform::SkuId;

use crate::index::ContentIndex;
use crate::manifest::ASSET_ROOT;

/// The bundle every non-empty selection includes. It carries the boot
/// content the application loads before any other bundle is available.
pub const INIT_BUNDLE: &str = "initialization";

/// Namespace prefix (after the asset root) that marks game content.
pub const GAMES_NAMESPACE: &str = "games/";

/// Errors during bundle selection.
#[derive(Debug, Error)]
pub enum SelectError {
  /// The scope resolved to zero bundles for this SKU.
  #[error("scope '{scope}' selects no bundles for sku '{sku}'")]
  EmptySelection { sku: String, scope: String },
}

/// An ordered, deduplicated list of bundle names to build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
  /// Bundle names, sorted.
  pub names: Vec<String>,
}

impl Selection {
  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &str> {
    self.names.iter().map(String::as_str)
  }
}

/// Resolve a scope descriptor into the concrete bundles to build.
///
/// The universe is pre-filtered to bundles carrying the SKU's label, where a
/// label on a path covers every member path nested under it.
pub fn select_bundles(
  index: &dyn ContentIndex,
  sku: &SkuId,
  scope: &str,
) -> Result<Selection, SelectError> {
  let labeled = index.labeled_paths(sku.as_str());
  let universe: Vec<String> = index
    .bundle_names()
    .into_iter()
    .filter(|name| carries_label(index, name, &labeled))
    .collect();

  debug!(sku = %sku, universe = universe.len(), scope = %scope, "resolving scope");

  let tokens: Vec<&str> = scope.split(',').map(str::trim).filter(|t| !t.is_empty()).collect();

  let mut resolved: BTreeSet<String> = BTreeSet::new();

  if tokens.iter().any(|t| *t == "all") {
    resolved.extend(universe.iter().cloned());
  } else if tokens.iter().any(|t| *t == "none") {
    return Ok(Selection {
      names: vec![INIT_BUNDLE.to_string()],
    });
  } else {
    for token in &tokens {
      match *token {
        "games" => {
          resolved.extend(universe.iter().filter(|n| is_games_bundle(index, n)).cloned());
        }
        "features" => {
          resolved.extend(universe.iter().filter(|n| !is_games_bundle(index, n)).cloned());
        }
        // A literal bundle name, included without an existence check; a
        // nonexistent name compiles to zero members and is dropped later
        // with a warning.
        name => {
          resolved.insert(name.to_string());
        }
      }
    }
  }

  if resolved.is_empty() {
    return Err(SelectError::EmptySelection {
      sku: sku.to_string(),
      scope: scope.to_string(),
    });
  }

  resolved.insert(INIT_BUNDLE.to_string());

  Ok(Selection {
    names: resolved.into_iter().collect(),
  })
}

/// True if any of the bundle's member paths is covered by a labeled path.
fn carries_label(index: &dyn ContentIndex, name: &str, labeled: &[String]) -> bool {
  index
    .members_of(name)
    .iter()
    .any(|member| labeled.iter().any(|root| path_is_under(member, root)))
}

/// True if the bundle has any content under the games namespace.
fn is_games_bundle(index: &dyn ContentIndex, name: &str) -> bool {
  index.members_of(name).iter().any(|member| {
    let path = member.replace('\\', "/");
    path
      .strip_prefix(ASSET_ROOT)
      .unwrap_or(&path)
      .starts_with(GAMES_NAMESPACE)
  })
}

/// True if `path` equals `root` or is nested under it.
fn path_is_under(path: &str, root: &str) -> bool {
  let path = path.replace('\\', "/");
  let root = root.trim_end_matches('/');
  path == root || path.starts_with(&format!("{}/", root))
}
