//! SKU, platform-target and variant identifiers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PlatformError;

/// Platform a build targets (not the host this tool runs on)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformTarget {
    Windows,
    MacOs,
    Linux,
    Ios,
    Android,
    Web,
}

impl PlatformTarget {
    /// All supported targets, in a stable order
    pub const ALL: [PlatformTarget; 6] = [
        PlatformTarget::Windows,
        PlatformTarget::MacOs,
        PlatformTarget::Linux,
        PlatformTarget::Ios,
        PlatformTarget::Android,
        PlatformTarget::Web,
    ];

    /// Returns the target name as used in folder and manifest names
    pub const fn as_str(&self) -> &'static str {
        match self {
            PlatformTarget::Windows => "windows",
            PlatformTarget::MacOs => "macos",
            PlatformTarget::Linux => "linux",
            PlatformTarget::Ios => "ios",
            PlatformTarget::Android => "android",
            PlatformTarget::Web => "web",
        }
    }

    /// True for the browser target, which ships without a local install
    pub const fn is_web(&self) -> bool {
        matches!(self, PlatformTarget::Web)
    }
}

impl fmt::Display for PlatformTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PlatformTarget {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "windows" => Ok(PlatformTarget::Windows),
            "macos" => Ok(PlatformTarget::MacOs),
            "linux" => Ok(PlatformTarget::Linux),
            "ios" => Ok(PlatformTarget::Ios),
            "android" => Ok(PlatformTarget::Android),
            "web" => Ok(PlatformTarget::Web),
            _ => Err(PlatformError::UnknownTarget(s.to_string())),
        }
    }
}

/// Content fidelity variant of a build
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    Hd,
    Sd,
}

impl Variant {
    /// All variants, highest fidelity first
    pub const ALL: [Variant; 2] = [Variant::Hd, Variant::Sd];

    /// Returns the variant tag as embedded in mangled file names
    pub const fn as_str(&self) -> &'static str {
        match self {
            Variant::Hd => "hd",
            Variant::Sd => "sd",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Variant {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hd" => Ok(Variant::Hd),
            "sd" => Ok(Variant::Sd),
            _ => Err(PlatformError::UnknownVariant(s.to_string())),
        }
    }
}

/// Identifier of a shipped SKU, also the content label bundles are tagged with
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SkuId(pub String);

impl SkuId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SkuId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
