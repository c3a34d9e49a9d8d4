//! Manifest construction, naming rules and persistence.
//!
//! Construction from a compiled build pass:
//!
//! 1. Every member path is stored short (asset root dropped, extension
//!    stripped); a collision between shortened paths anywhere in the
//!    manifest is fatal, because two bundles could no longer be told apart
//!    once shortened.
//! 2. `dependencies` is populated only for bundles with at least one raw
//!    dependency, with names normalized the same way the verifier compares
//!    them.
//! 3. Each variant's rename map records `raw file name -> mangled name`,
//!    where the mangled name embeds the variant tag, an 8-hex content
//!    checksum and the byte size.

mod types;

pub use types::BundleManifest;

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use thiserror::Error;
use tracing::{error, warn};

use bundlekit_platform::Variant;

use crate::compile::CompiledBundle;
use crate::util::hash::{ContentChecksum, checksum_file};
use crate::verify::normalize_bundle_name;

/// Root folder prefix dropped when shortening member paths.
pub const ASSET_ROOT: &str = "assets/";

/// Errors from manifest construction and persistence.
#[derive(Debug, Error)]
pub enum ManifestError {
  #[error("failed to read manifest {path}: {source}")]
  Io {
    path: String,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse manifest {path}: {source}")]
  Json {
    path: String,
    #[source]
    source: serde_json::Error,
  },

  #[error("shortened path '{short}' collides between bundles '{first}' and '{second}'")]
  ShortPathCollision {
    short: String,
    first: String,
    second: String,
  },
}

/// Shorten a member path to its canonical stored form.
///
/// Separators are normalized, the leading asset root is dropped and the
/// extension is stripped: `assets/games/g1/board.png` becomes
/// `games/g1/board`.
pub fn short_member_path(path: &str) -> String {
  let path = path.replace('\\', "/");
  let path = path.strip_prefix(ASSET_ROOT).unwrap_or(&path);

  match (path.rfind('.'), path.rfind('/')) {
    (Some(dot), Some(slash)) if dot > slash => path[..dot].to_string(),
    (Some(dot), None) => path[..dot].to_string(),
    _ => path.to_string(),
  }
}

/// Synthesize the deployed file name for one compiled bundle artifact.
///
/// Format: `<bundle>-<variant>-<checksum:8hex>-sz<bytes><ext>`, with the
/// extension taken from the raw file name, e.g.
/// `slots-hd-0e1d73ba-sz13434.bundlev2`.
pub fn mangled_file_name(
  bundle: &str,
  raw_file_name: &str,
  variant: Variant,
  checksum: ContentChecksum,
  size: u64,
) -> String {
  let ext = match raw_file_name.rfind('.') {
    Some(dot) => &raw_file_name[dot..],
    None => "",
  };
  format!("{}-{}-{}-sz{}{}", bundle, variant, checksum, size, ext)
}

impl BundleManifest {
  /// Build the contents and dependency maps from verified compiler output.
  ///
  /// Bundle keys are normalized names; member paths are stored short and
  /// checked for uniqueness across the entire manifest.
  pub fn from_compiled(bundles: &[CompiledBundle]) -> Result<BundleManifest, ManifestError> {
    let mut manifest = BundleManifest::default();
    let mut seen_shorts: HashMap<String, String> = HashMap::new();

    for bundle in bundles {
      let name = normalize_bundle_name(&bundle.name);

      let mut shorts = Vec::with_capacity(bundle.members.len());
      for member in &bundle.members {
        let short = short_member_path(member);
        if let Some(owner) = seen_shorts.get(&short) {
          return Err(ManifestError::ShortPathCollision {
            short,
            first: owner.clone(),
            second: name,
          });
        }
        seen_shorts.insert(short.clone(), name.clone());
        shorts.push(short);
      }
      manifest.contents.insert(name.clone(), shorts);

      let mut deps: Vec<String> = Vec::new();
      for raw in &bundle.raw_dependencies {
        let dep = normalize_bundle_name(raw);
        if !deps.contains(&dep) {
          deps.push(dep);
        }
      }
      if !deps.is_empty() {
        manifest.dependencies.insert(name, deps);
      }
    }

    Ok(manifest)
  }

  /// Record the variant's raw-to-mangled rename map from the artifact files.
  ///
  /// A checksum failure is logged and falls back to zero, and a zero
  /// checksum is suspicious; both produce a warning but neither aborts the
  /// build. Returns the warnings accumulated.
  pub fn attach_rename_map(&mut self, variant: Variant, bundles: &[CompiledBundle]) -> Vec<String> {
    let mut warnings = Vec::new();
    let renames = self.variants.entry(variant.to_string()).or_default();

    for bundle in bundles {
      if bundle.file.as_os_str().is_empty() {
        continue;
      }
      let raw_name = bundle
        .file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| bundle.name.clone());

      let checksum = match checksum_file(&bundle.file) {
        Ok(checksum) => {
          if checksum.is_zero() {
            warn!(bundle = %bundle.name, "artifact checksum is zero");
            warnings.push(format!("artifact checksum for '{}' is zero", bundle.name));
          }
          checksum
        }
        Err(e) => {
          error!(bundle = %bundle.name, error = %e, "failed to checksum artifact");
          warnings.push(format!(
            "failed to checksum artifact for '{}': {} (using zero)",
            bundle.name, e
          ));
          ContentChecksum::ZERO
        }
      };

      let size = match fs::metadata(&bundle.file) {
        Ok(meta) => meta.len(),
        Err(e) => {
          error!(bundle = %bundle.name, error = %e, "failed to stat artifact");
          warnings.push(format!("failed to stat artifact for '{}': {}", bundle.name, e));
          0
        }
      };

      let mangled = mangled_file_name(
        &normalize_bundle_name(&bundle.name),
        &raw_name,
        variant,
        checksum,
        size,
      );
      renames.insert(raw_name, mangled);
    }

    warnings
  }

  /// Write the manifest as pretty-printed JSON.
  pub fn save(&self, path: &Path) -> Result<(), ManifestError> {
    let text = serde_json::to_string_pretty(self).map_err(|e| ManifestError::Json {
      path: path.display().to_string(),
      source: e,
    })?;
    fs::write(path, text).map_err(|e| ManifestError::Io {
      path: path.display().to_string(),
      source: e,
    })
  }

  /// Read a manifest previously written with [`BundleManifest::save`].
  pub fn load(path: &Path) -> Result<BundleManifest, ManifestError> {
    let text = fs::read_to_string(path).map_err(|e| ManifestError::Io {
      path: path.display().to_string(),
      source: e,
    })?;
    serde_json::from_str(&text).map_err(|e| ManifestError::Json {
      path: path.display().to_string(),
      source: e,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::path::PathBuf;
  use tempfile::tempdir;

  fn compiled(name: &str, members: &[&str], deps: &[&str]) -> CompiledBundle {
    CompiledBundle {
      name: name.to_string(),
      members: members.iter().map(|s| s.to_string()).collect(),
      raw_dependencies: deps.iter().map(|s| s.to_string()).collect(),
      file: PathBuf::new(),
    }
  }

  #[test]
  fn short_member_path_drops_root_and_extension() {
    assert_eq!(short_member_path("assets/games/g1/board.png"), "games/g1/board");
    assert_eq!(short_member_path("assets\\games\\g1\\board.png"), "games/g1/board");
    assert_eq!(short_member_path("other/readme"), "other/readme");
    assert_eq!(short_member_path("assets/file.tar.gz"), "file.tar");
  }

  #[test]
  fn short_member_path_keeps_dotted_folders() {
    // A dot in a folder name is not an extension.
    assert_eq!(short_member_path("assets/v1.2/board"), "v1.2/board");
  }

  #[test]
  fn mangled_name_embeds_variant_checksum_and_size() {
    let name = mangled_file_name(
      "slots",
      "slots.bundlev2",
      Variant::Hd,
      ContentChecksum(0x0e1d73ba),
      13434,
    );
    assert_eq!(name, "slots-hd-0e1d73ba-sz13434.bundlev2");
  }

  #[test]
  fn mangled_name_without_extension() {
    let name = mangled_file_name("slots", "slots", Variant::Sd, ContentChecksum::ZERO, 7);
    assert_eq!(name, "slots-sd-00000000-sz7");
  }

  #[test]
  fn from_compiled_normalizes_names_and_sparse_dependencies() {
    let hash = "f".repeat(32);
    let bundles = vec![
      compiled(
        &format!("g1_{}.bundlev2", hash),
        &["assets/games/g1/board.png"],
        &[&format!("initialization_{}.bundlev2", hash)],
      ),
      compiled("initialization.bundlev2", &["assets/boot/logo.png"], &[]),
    ];

    let manifest = BundleManifest::from_compiled(&bundles).unwrap();

    assert_eq!(manifest.contents["g1"], vec!["games/g1/board"]);
    assert_eq!(manifest.contents["initialization"], vec!["boot/logo"]);
    // Only bundles with dependencies appear.
    assert_eq!(manifest.dependencies.len(), 1);
    assert_eq!(manifest.dependencies["g1"], vec!["initialization"]);
  }

  #[test]
  fn from_compiled_deduplicates_dependencies() {
    let bundles = vec![compiled(
      "g1",
      &["assets/games/g1/a.png"],
      &["initialization", "initialization.bundlev2"],
    )];
    let manifest = BundleManifest::from_compiled(&bundles).unwrap();
    assert_eq!(manifest.dependencies["g1"], vec!["initialization"]);
  }

  #[test]
  fn short_path_collision_is_fatal() {
    let bundles = vec![
      compiled("a", &["assets/shared/logo.png"], &[]),
      compiled("b", &["assets/shared/logo.jpg"], &[]),
    ];

    match BundleManifest::from_compiled(&bundles) {
      Err(ManifestError::ShortPathCollision { short, first, second }) => {
        assert_eq!(short, "shared/logo");
        assert_eq!(first, "a");
        assert_eq!(second, "b");
      }
      other => panic!("expected collision, got {:?}", other),
    }
  }

  #[test]
  fn attach_rename_map_records_mangled_names() {
    let temp = tempdir().unwrap();
    let file = temp.path().join("g1.bundlev2");
    fs::write(&file, b"artifact bytes").unwrap();

    let mut bundle = compiled("g1", &["assets/games/g1/a.png"], &[]);
    bundle.file = file.clone();

    let mut manifest = BundleManifest::from_compiled(std::slice::from_ref(&bundle)).unwrap();
    let warnings = manifest.attach_rename_map(Variant::Hd, &[bundle]);

    assert!(warnings.is_empty());
    let renames = &manifest.variants["hd"];
    let mangled = &renames["g1.bundlev2"];
    let checksum = checksum_file(&file).unwrap();
    assert_eq!(
      mangled,
      &format!("g1-hd-{}-sz{}.bundlev2", checksum, fs::metadata(&file).unwrap().len())
    );
  }

  #[test]
  fn attach_rename_map_missing_file_warns_and_uses_zero() {
    let temp = tempdir().unwrap();
    let mut bundle = compiled("g1", &["assets/games/g1/a.png"], &[]);
    bundle.file = temp.path().join("never-written.bundlev2");

    let mut manifest = BundleManifest::from_compiled(std::slice::from_ref(&bundle)).unwrap();
    let warnings = manifest.attach_rename_map(Variant::Sd, &[bundle]);

    // Checksum failure and stat failure both warn; the build continues.
    assert_eq!(warnings.len(), 2);
    let mangled = &manifest.variants["sd"]["never-written.bundlev2"];
    assert_eq!(mangled, "g1-sd-00000000-sz0.bundlev2");
  }

  #[test]
  fn save_load_round_trip() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("bundle_manifest.txt");

    let bundles = vec![
      compiled("g1", &["assets/games/g1/a.png"], &["initialization"]),
      compiled("initialization", &["assets/boot/logo.png"], &[]),
    ];
    let mut manifest = BundleManifest::from_compiled(&bundles).unwrap();
    manifest
      .variants
      .entry("hd".to_string())
      .or_default()
      .insert("g1.bundlev2".to_string(), "g1-hd-deadbeef-sz9.bundlev2".to_string());

    manifest.save(&path).unwrap();
    let loaded = BundleManifest::load(&path).unwrap();

    assert_eq!(loaded, manifest);
  }

  #[test]
  fn load_missing_file_is_io_error() {
    let temp = tempdir().unwrap();
    let result = BundleManifest::load(&temp.path().join("absent.txt"));
    assert!(matches!(result, Err(ManifestError::Io { .. })));
  }
}
