//! Verification of compiler output against the request.
//!
//! The compiler is free to append a content hash and a bundle extension to
//! the file names it reports, and its output ordering carries no guarantee,
//! so comparing requested names against built names naively is a trap (and
//! was a real bug once: two differently-sorted lists walked in lockstep).
//! Both sides are therefore normalized and sorted before a synchronized
//! two-pointer comparison.
//!
//! Any mismatch is fatal for the variant build, but the report enumerates
//! every discrepancy so an unattended CI run can be fixed in one pass.

use std::sync::OnceLock;

use regex_lite::Regex;
use thiserror::Error;
use tracing::warn;

use crate::compile::CompiledBundle;
use crate::select::Selection;

/// File extensions the compiler may append to bundle names.
pub const KNOWN_BUNDLE_EXTS: [&str; 2] = ["bundlev2", "bundle"];

fn hash_suffix() -> &'static Regex {
  static HASH_SUFFIX: OnceLock<Regex> = OnceLock::new();
  HASH_SUFFIX.get_or_init(|| Regex::new(r"_[0-9a-f]{32}$").expect("valid hash-suffix pattern"))
}

/// Itemized difference between requested and built bundle sets.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MismatchReport {
  /// Requested names with no corresponding built bundle.
  pub skipped: Vec<String>,
  /// Built names with no corresponding requested bundle.
  pub unexpected: Vec<String>,
}

impl MismatchReport {
  pub fn is_empty(&self) -> bool {
    self.skipped.is_empty() && self.unexpected.is_empty()
  }
}

impl std::fmt::Display for MismatchReport {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    for name in &self.skipped {
      writeln!(f, "  requested but not built: {}", name)?;
    }
    for name in &self.unexpected {
      writeln!(f, "  built but not requested: {}", name)?;
    }
    Ok(())
  }
}

/// Errors from build verification.
#[derive(Debug, Error)]
pub enum VerifyError {
  /// The compiler did not produce exactly the requested bundles.
  #[error("compiled output does not match the request:\n{0}")]
  Mismatch(MismatchReport),
}

/// Verified compiler output for one variant.
#[derive(Debug)]
pub struct VerifiedBuild {
  /// Bundles that survive verification, in compiler order.
  pub bundles: Vec<CompiledBundle>,
  /// Non-fatal findings (zero-member bundles that were dropped).
  pub warnings: Vec<String>,
}

/// Normalize a bundle name for comparison.
///
/// Strips any folder components, a known bundle extension, and a trailing
/// `_<32 hex chars>` content-hash segment:
/// `foo_0123456789abcdef0123456789abcdef.bundlev2` and `foo` both normalize
/// to `foo`.
pub fn normalize_bundle_name(name: &str) -> String {
  let name = name.replace('\\', "/");
  let base = name.rsplit('/').next().unwrap_or(&name);

  let mut base = base;
  for ext in KNOWN_BUNDLE_EXTS {
    if let Some(stripped) = base.strip_suffix(&format!(".{}", ext)) {
      base = stripped;
      break;
    }
  }

  hash_suffix().replace(base, "").into_owned()
}

/// Confirm the compiler produced exactly the requested bundles.
///
/// Both lists are sorted by normalized name and walked in lockstep; every
/// requested-but-missing and built-but-unrequested name lands in the report.
/// Bundles that compiled with zero members are legitimate to skip (a tag
/// applied but never populated) and are dropped with a warning.
pub fn verify_build(
  requested: &Selection,
  built: Vec<CompiledBundle>,
) -> Result<VerifiedBuild, VerifyError> {
  let mut req: Vec<&str> = requested.iter().collect();
  req.sort_by_key(|name| normalize_bundle_name(name));

  let mut blt: Vec<(String, &CompiledBundle)> = built
    .iter()
    .map(|b| (normalize_bundle_name(&b.name), b))
    .collect();
  blt.sort_by(|a, b| a.0.cmp(&b.0));

  let mut report = MismatchReport::default();
  let mut i = 0;
  let mut j = 0;

  while i < req.len() && j < blt.len() {
    let req_norm = normalize_bundle_name(req[i]);
    match req_norm.cmp(&blt[j].0) {
      std::cmp::Ordering::Equal => {
        i += 1;
        j += 1;
      }
      std::cmp::Ordering::Less => {
        report.skipped.push(req[i].to_string());
        i += 1;
      }
      std::cmp::Ordering::Greater => {
        report.unexpected.push(blt[j].1.name.clone());
        j += 1;
      }
    }
  }
  report.skipped.extend(req[i..].iter().map(|s| s.to_string()));
  report.unexpected.extend(blt[j..].iter().map(|(_, b)| b.name.clone()));

  if !report.is_empty() {
    return Err(VerifyError::Mismatch(report));
  }

  let mut warnings = Vec::new();
  let bundles = built
    .into_iter()
    .filter(|bundle| {
      if bundle.members.is_empty() {
        let message = format!("bundle '{}' built 0 assets, dropping it", bundle.name);
        warn!(bundle = %bundle.name, "built 0 assets, dropping");
        warnings.push(message);
        false
      } else {
        true
      }
    })
    .collect();

  Ok(VerifiedBuild { bundles, warnings })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn selection(names: &[&str]) -> Selection {
    Selection {
      names: names.iter().map(|s| s.to_string()).collect(),
    }
  }

  fn compiled(name: &str, members: &[&str]) -> CompiledBundle {
    CompiledBundle {
      name: name.to_string(),
      members: members.iter().map(|s| s.to_string()).collect(),
      raw_dependencies: Vec::new(),
      file: Default::default(),
    }
  }

  #[test]
  fn normalize_strips_hash_and_extension() {
    let hash = "0123456789abcdef0123456789abcdef";
    assert_eq!(normalize_bundle_name(&format!("foo_{}.bundlev2", hash)), "foo");
    assert_eq!(normalize_bundle_name(&format!("foo_{}", hash)), "foo");
    assert_eq!(normalize_bundle_name("foo.bundlev2"), "foo");
    assert_eq!(normalize_bundle_name("foo.bundle"), "foo");
    assert_eq!(normalize_bundle_name("foo"), "foo");
  }

  #[test]
  fn normalize_ignores_short_or_non_hex_suffixes() {
    assert_eq!(normalize_bundle_name("foo_cafe"), "foo_cafe");
    let not_hex = "z".repeat(32);
    assert_eq!(
      normalize_bundle_name(&format!("foo_{}", not_hex)),
      format!("foo_{}", not_hex)
    );
  }

  #[test]
  fn normalize_takes_the_basename() {
    assert_eq!(normalize_bundle_name("out/foo.bundlev2"), "foo");
    assert_eq!(normalize_bundle_name("out\\foo.bundlev2"), "foo");
  }

  #[test]
  fn equal_sets_pass_regardless_of_surface_names() {
    let requested = selection(&["a", "b"]);
    let built = vec![
      compiled(&format!("b_{}.bundlev2", "a".repeat(32)), &["m1"]),
      compiled(&format!("a_{}.bundlev2", "b".repeat(32)), &["m2"]),
    ];

    let verified = verify_build(&requested, built).unwrap();
    assert_eq!(verified.bundles.len(), 2);
    assert!(verified.warnings.is_empty());
  }

  #[test]
  fn missing_bundle_is_reported_as_skipped() {
    let requested = selection(&["a", "b", "c"]);
    let built = vec![compiled("b.bundlev2", &["m"])];

    match verify_build(&requested, built) {
      Err(VerifyError::Mismatch(report)) => {
        assert_eq!(report.skipped, vec!["a", "c"]);
        assert!(report.unexpected.is_empty());
      }
      other => panic!("expected mismatch, got {:?}", other),
    }
  }

  #[test]
  fn extra_bundle_is_reported_as_unexpected() {
    let requested = selection(&["a"]);
    let built = vec![compiled("a.bundlev2", &["m"]), compiled("rogue.bundlev2", &["m"])];

    match verify_build(&requested, built) {
      Err(VerifyError::Mismatch(report)) => {
        assert!(report.skipped.is_empty());
        assert_eq!(report.unexpected, vec!["rogue.bundlev2"]);
      }
      other => panic!("expected mismatch, got {:?}", other),
    }
  }

  #[test]
  fn every_discrepancy_is_enumerated() {
    let requested = selection(&["a", "b"]);
    let built = vec![compiled("x.bundlev2", &["m"]), compiled("y.bundlev2", &["m"])];

    match verify_build(&requested, built) {
      Err(VerifyError::Mismatch(report)) => {
        assert_eq!(report.skipped.len(), 2);
        assert_eq!(report.unexpected.len(), 2);
      }
      other => panic!("expected mismatch, got {:?}", other),
    }
  }

  #[test]
  fn zero_member_bundles_are_dropped_with_a_warning() {
    let requested = selection(&["a", "ghost"]);
    let built = vec![compiled("a.bundlev2", &["m"]), compiled("ghost.bundlev2", &[])];

    let verified = verify_build(&requested, built).unwrap();
    assert_eq!(verified.bundles.len(), 1);
    assert_eq!(verified.bundles[0].name, "a.bundlev2");
    assert_eq!(verified.warnings.len(), 1);
    assert!(verified.warnings[0].contains("ghost"));
  }

  #[test]
  fn report_display_itemizes_each_name() {
    let report = MismatchReport {
      skipped: vec!["a".to_string()],
      unexpected: vec!["b.bundlev2".to_string()],
    };
    let text = report.to_string();
    assert!(text.contains("requested but not built: a"));
    assert!(text.contains("built but not requested: b.bundlev2"));
  }
}
