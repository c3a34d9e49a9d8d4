//! Target identity and filesystem layout for bundlekit
//!
//! This crate provides the types shared by every pipeline stage:
//! - SKU, platform-target and variant identifiers
//! - The on-disk layout contract (per-variant temp folders, per-platform
//!   output folder, embedded-resources tree, logs)
//! - Manifest file naming

mod error;
mod layout;
mod target;

pub use error::PlatformError;
pub use layout::{BuildLayout, DEFAULT_MANIFEST_BASE, merged_manifest_name, variant_manifest_name};
pub use target::{PlatformTarget, SkuId, Variant};
