//! Cross-variant manifest merging.
//!
//! Variants re-encode the same content at different fidelity; they must
//! never silently add, remove or reorder it. The merge therefore validates
//! that every per-variant manifest agrees on contents and dependencies
//! before combining the rename maps, and itemizes every divergence rather
//! than stopping at the first.

use thiserror::Error;
use tracing::debug;

use crate::manifest::BundleManifest;

/// One disagreement between two variants' manifests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Divergence {
  pub bundle: String,
  pub detail: String,
}

/// Every divergence found during a merge.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DivergenceReport {
  pub items: Vec<Divergence>,
}

impl std::fmt::Display for DivergenceReport {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    for item in &self.items {
      writeln!(f, "  {}: {}", item.bundle, item.detail)?;
    }
    Ok(())
  }
}

/// Errors from merging per-variant manifests.
#[derive(Debug, Error)]
pub enum MergeError {
  #[error("no manifests to merge")]
  NoInputs,

  #[error("manifest must carry exactly one variant, found [{found}]")]
  WrongVariantCount { found: String },

  #[error("two manifests carry the same variant '{variant}'")]
  DuplicateVariant { variant: String },

  #[error("variants diverge:\n{0}")]
  Divergence(DivergenceReport),
}

/// Merge per-variant manifests into one canonical manifest.
///
/// A single input is returned unchanged. For more, every manifest must carry
/// exactly one distinct variant key, and all must agree on `contents` and
/// `dependencies` (identical key sets, identical ordered lists per key). The
/// result carries the shared maps plus the disjoint union of the variants'
/// rename maps.
pub fn merge_variants(manifests: Vec<BundleManifest>) -> Result<BundleManifest, MergeError> {
  let mut manifests = manifests;
  let first = match manifests.len() {
    0 => return Err(MergeError::NoInputs),
    1 => return Ok(manifests.remove(0)),
    _ => manifests.remove(0),
  };

  let first_variant = sole_variant(&first)?;
  let mut seen_variants = vec![first_variant.clone()];
  let mut report = DivergenceReport::default();

  for other in &manifests {
    let variant = sole_variant(other)?;
    if seen_variants.contains(&variant) {
      return Err(MergeError::DuplicateVariant { variant });
    }
    seen_variants.push(variant.clone());

    compare_maps(
      &first.contents,
      &other.contents,
      "contents",
      &first_variant,
      &variant,
      &mut report,
    );
    compare_maps(
      &first.dependencies,
      &other.dependencies,
      "dependencies",
      &first_variant,
      &variant,
      &mut report,
    );
  }

  if !report.items.is_empty() {
    return Err(MergeError::Divergence(report));
  }

  let mut merged = first;
  for other in manifests {
    merged.variants.extend(other.variants);
  }

  debug!(variants = merged.variants.len(), "variants merged");

  Ok(merged)
}

fn sole_variant(manifest: &BundleManifest) -> Result<String, MergeError> {
  let ids = manifest.variant_ids();
  if ids.len() != 1 {
    return Err(MergeError::WrongVariantCount { found: ids.join(", ") });
  }
  Ok(ids[0].to_string())
}

/// Compare two `bundle -> ordered list` maps and itemize every difference.
fn compare_maps(
  first: &std::collections::BTreeMap<String, Vec<String>>,
  other: &std::collections::BTreeMap<String, Vec<String>>,
  field: &str,
  first_variant: &str,
  other_variant: &str,
  report: &mut DivergenceReport,
) {
  for (bundle, list) in first {
    match other.get(bundle) {
      None => report.items.push(Divergence {
        bundle: bundle.clone(),
        detail: format!("{} present in '{}' but missing in '{}'", field, first_variant, other_variant),
      }),
      Some(other_list) if other_list != list => report.items.push(Divergence {
        bundle: bundle.clone(),
        detail: format!("{} differ between '{}' and '{}'", field, first_variant, other_variant),
      }),
      Some(_) => {}
    }
  }
  for bundle in other.keys() {
    if !first.contains_key(bundle) {
      report.items.push(Divergence {
        bundle: bundle.clone(),
        detail: format!("{} present in '{}' but missing in '{}'", field, other_variant, first_variant),
      });
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::BTreeMap;

  fn variant_manifest(variant: &str, deps_of_g1: &[&str]) -> BundleManifest {
    let mut manifest = BundleManifest::default();
    manifest
      .contents
      .insert("g1".to_string(), vec!["games/g1/board".to_string()]);
    manifest
      .contents
      .insert("initialization".to_string(), vec!["boot/logo".to_string()]);
    if !deps_of_g1.is_empty() {
      manifest
        .dependencies
        .insert("g1".to_string(), deps_of_g1.iter().map(|s| s.to_string()).collect());
    }
    manifest.variants.insert(
      variant.to_string(),
      BTreeMap::from([(
        "g1.bundlev2".to_string(),
        format!("g1-{}-deadbeef-sz9.bundlev2", variant),
      )]),
    );
    manifest
  }

  #[test]
  fn single_manifest_is_identity() {
    let manifest = variant_manifest("hd", &["initialization"]);
    let merged = merge_variants(vec![manifest.clone()]).unwrap();
    assert_eq!(merged, manifest);
  }

  #[test]
  fn no_inputs_is_an_error() {
    assert!(matches!(merge_variants(vec![]), Err(MergeError::NoInputs)));
  }

  #[test]
  fn merge_unions_rename_maps() {
    let hd = variant_manifest("hd", &["initialization"]);
    let sd = variant_manifest("sd", &["initialization"]);

    let merged = merge_variants(vec![hd.clone(), sd]).unwrap();

    assert_eq!(merged.contents, hd.contents);
    assert_eq!(merged.dependencies, hd.dependencies);
    assert_eq!(merged.variant_ids(), vec!["hd", "sd"]);
    assert!(merged.variants["sd"]["g1.bundlev2"].contains("-sd-"));
  }

  #[test]
  fn dependency_divergence_names_the_bundle() {
    let hd = variant_manifest("hd", &["initialization"]);
    let sd = variant_manifest("sd", &["initialization", "g2"]);

    match merge_variants(vec![hd, sd]) {
      Err(MergeError::Divergence(report)) => {
        assert_eq!(report.items.len(), 1);
        assert_eq!(report.items[0].bundle, "g1");
        assert!(report.items[0].detail.contains("dependencies"));
        assert!(report.items[0].detail.contains("hd"));
        assert!(report.items[0].detail.contains("sd"));
      }
      other => panic!("expected divergence, got {:?}", other),
    }
  }

  #[test]
  fn content_reordering_is_a_divergence() {
    let mut hd = variant_manifest("hd", &[]);
    hd.contents
      .insert("g1".to_string(), vec!["games/g1/a".to_string(), "games/g1/b".to_string()]);
    let mut sd = variant_manifest("sd", &[]);
    sd.contents
      .insert("g1".to_string(), vec!["games/g1/b".to_string(), "games/g1/a".to_string()]);

    assert!(matches!(merge_variants(vec![hd, sd]), Err(MergeError::Divergence(_))));
  }

  #[test]
  fn missing_bundle_is_itemized_from_both_sides() {
    let mut hd = variant_manifest("hd", &[]);
    hd.contents.insert("hd_only".to_string(), vec!["x/a".to_string()]);
    let mut sd = variant_manifest("sd", &[]);
    sd.contents.insert("sd_only".to_string(), vec!["y/b".to_string()]);

    match merge_variants(vec![hd, sd]) {
      Err(MergeError::Divergence(report)) => {
        let bundles: Vec<&str> = report.items.iter().map(|i| i.bundle.as_str()).collect();
        assert!(bundles.contains(&"hd_only"));
        assert!(bundles.contains(&"sd_only"));
      }
      other => panic!("expected divergence, got {:?}", other),
    }
  }

  #[test]
  fn every_divergence_is_itemized() {
    let mut hd = variant_manifest("hd", &["initialization"]);
    hd.contents.insert("hd_only".to_string(), vec!["x/a".to_string()]);
    let sd = variant_manifest("sd", &["g2"]);

    match merge_variants(vec![hd, sd]) {
      Err(MergeError::Divergence(report)) => {
        assert_eq!(report.items.len(), 2);
      }
      other => panic!("expected divergence, got {:?}", other),
    }
  }

  #[test]
  fn duplicate_variant_is_an_error() {
    let a = variant_manifest("hd", &[]);
    let b = variant_manifest("hd", &[]);
    assert!(matches!(
      merge_variants(vec![a, b]),
      Err(MergeError::DuplicateVariant { .. })
    ));
  }

  #[test]
  fn multi_variant_input_is_an_error() {
    let mut bad = variant_manifest("hd", &[]);
    bad.variants.insert("sd".to_string(), BTreeMap::new());
    let other = variant_manifest("sd", &[]);

    assert!(matches!(
      merge_variants(vec![bad, other]),
      Err(MergeError::WrongVariantCount { .. })
    ));
  }
}
