//! Manifest data model.
//!
//! The manifest is the durable record of a build: which bundles exist, what
//! content each carries, which bundles reference which, and how each
//! variant's artifact files were renamed for deployment. One manifest exists
//! per (sku, platform, variant) during a build, and one merged manifest per
//! (sku, platform) afterwards.
//!
//! # Serialization
//!
//! The textual form is JSON under stable external key names, with `BTreeMap`
//! throughout so output is deterministic and human-diffable:
//!
//! ```json
//! {
//!   "bundleContents":     { "<bundle>": ["<shortPath>", ...], ... },
//!   "bundleDependencies": { "<bundle>": ["<bundle>", ...], ... },
//!   "bundleVariants":     { "<variant>": { "<rawFile>": "<mangledFile>" }, ... }
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The canonical bundle manifest.
///
/// `dependencies` is sparse: only bundles with at least one dependency
/// appear. `variants` maps a variant id to that variant's raw-to-mangled
/// file-name map.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleManifest {
  #[serde(rename = "bundleContents", default)]
  pub contents: BTreeMap<String, Vec<String>>,

  #[serde(rename = "bundleDependencies", default)]
  pub dependencies: BTreeMap<String, Vec<String>>,

  #[serde(rename = "bundleVariants", default)]
  pub variants: BTreeMap<String, BTreeMap<String, String>>,
}

impl BundleManifest {
  /// Variant ids this manifest carries rename maps for.
  pub fn variant_ids(&self) -> Vec<&str> {
    self.variants.keys().map(String::as_str).collect()
  }

  pub fn is_empty(&self) -> bool {
    self.contents.is_empty() && self.dependencies.is_empty() && self.variants.is_empty()
  }

  /// Overlay a newer manifest onto this one, key-wise.
  ///
  /// Every entry present in `newer` overwrites the entry under the same key
  /// here; keys present only in `self` survive untouched. Deliberately not
  /// commutative: this is the merge-with-previously-embedded step that lets
  /// a partial rebuild land without destroying unrelated bundles.
  pub fn overlay(mut self, newer: BundleManifest) -> BundleManifest {
    self.contents.extend(newer.contents);
    self.dependencies.extend(newer.dependencies);
    for (variant, renames) in newer.variants {
      self.variants.entry(variant).or_default().extend(renames);
    }
    self
  }
}
