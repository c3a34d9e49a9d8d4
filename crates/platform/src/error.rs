//! Error types for bundlekit-platform

use thiserror::Error;

/// Errors from parsing target identifiers
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("unknown platform target: {0}")]
    UnknownTarget(String),

    #[error("unknown variant: {0}")]
    UnknownVariant(String),
}
