//! Filesystem layout contract for a build root
//!
//! Every pipeline stage derives its paths from a [`BuildLayout`] constructed
//! once per invocation; nothing probes the host environment.

use std::path::{Path, PathBuf};

use crate::target::{PlatformTarget, SkuId, Variant};

/// Default basename for manifest files
pub const DEFAULT_MANIFEST_BASE: &str = "bundle_manifest";

/// Resolved output locations for one build invocation
///
/// The layout under `root`:
///
/// ```text
/// <root>/temp/temp-<sku>-<platform>-<variant>/   intermediate compiler output
/// <root>/<platform>/                             deployed artifacts + merged manifest
/// <root>/logs/                                   diagnostics (dependency dump, size report)
/// ```
///
/// `app_resources` is the application's embedded-resources tree and lives
/// outside `root`; it receives the merged manifest and the policy-selected
/// embedded bundles.
#[derive(Debug, Clone)]
pub struct BuildLayout {
    root: PathBuf,
    app_resources: PathBuf,
}

impl BuildLayout {
    pub fn new(root: impl Into<PathBuf>, app_resources: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            app_resources: app_resources.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Intermediate build folder for one (sku, platform, variant)
    pub fn temp_dir(&self, sku: &SkuId, platform: PlatformTarget, variant: Variant) -> PathBuf {
        self.root
            .join("temp")
            .join(format!("temp-{}-{}-{}", sku, platform, variant))
    }

    /// Final output folder for a platform
    pub fn output_dir(&self, platform: PlatformTarget) -> PathBuf {
        self.root.join(platform.as_str())
    }

    /// Diagnostics folder (informational output only)
    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// The application's embedded-resources tree
    pub fn app_resources(&self) -> &Path {
        &self.app_resources
    }
}

/// File name of a per-variant manifest inside its temp folder
pub fn variant_manifest_name(base: &str, variant: Variant) -> String {
    format!("{}_{}.txt", base, variant)
}

/// File name of the merged manifest
///
/// With an override the platform is baked into the name so several platforms'
/// manifests can coexist in one tree; without one the canonical base is used.
pub fn merged_manifest_name(base: &str, override_name: Option<&str>, platform: PlatformTarget) -> String {
    match override_name {
        Some(name) => format!("{}_{}.txt", name, platform),
        None => format!("{}.txt", base),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> BuildLayout {
        BuildLayout::new("/builds/content", "/builds/app/resources")
    }

    #[test]
    fn temp_dir_embeds_sku_platform_variant() {
        let dir = layout().temp_dir(&SkuId::new("retail"), PlatformTarget::Windows, Variant::Hd);
        assert_eq!(dir, PathBuf::from("/builds/content/temp/temp-retail-windows-hd"));
    }

    #[test]
    fn output_dir_is_per_platform() {
        assert_eq!(
            layout().output_dir(PlatformTarget::Web),
            PathBuf::from("/builds/content/web")
        );
    }

    #[test]
    fn variant_manifest_name_appends_variant() {
        assert_eq!(
            variant_manifest_name(DEFAULT_MANIFEST_BASE, Variant::Sd),
            "bundle_manifest_sd.txt"
        );
    }

    #[test]
    fn merged_manifest_name_without_override() {
        assert_eq!(
            merged_manifest_name(DEFAULT_MANIFEST_BASE, None, PlatformTarget::Linux),
            "bundle_manifest.txt"
        );
    }

    #[test]
    fn merged_manifest_name_with_override_appends_platform() {
        assert_eq!(
            merged_manifest_name(DEFAULT_MANIFEST_BASE, Some("event_build"), PlatformTarget::Ios),
            "event_build_ios.txt"
        );
    }
}
