//! Content checksums for deployed bundle files.
//!
//! Mangled artifact names embed an 8-hex-char checksum of the compiled file.
//! The checksum is the first four bytes of the file's SHA-256; a value of
//! zero is suspicious (it is also the fallback when hashing fails) and
//! callers log it as a warning.

use std::fs;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A short content checksum as embedded in mangled file names.
///
/// # Format
///
/// Rendered as 8 lowercase hex chars, e.g. `0e1d73ba`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentChecksum(pub u32);

impl ContentChecksum {
  pub const ZERO: ContentChecksum = ContentChecksum(0);

  /// A zero checksum is either a hashing failure or a (vanishingly
  /// unlikely) real value; callers treat it as a warning, not an error.
  pub fn is_zero(&self) -> bool {
    self.0 == 0
  }
}

impl std::fmt::Display for ContentChecksum {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{:08x}", self.0)
  }
}

/// Error while checksumming a file.
#[derive(Debug, thiserror::Error)]
pub enum ChecksumError {
  #[error("failed to read {path}: {message}")]
  ReadFile { path: String, message: String },
}

/// Checksum a file's contents.
///
/// Streams the file through SHA-256 and truncates the digest to four bytes.
pub fn checksum_file(path: &Path) -> Result<ContentChecksum, ChecksumError> {
  let mut file = fs::File::open(path).map_err(|e| ChecksumError::ReadFile {
    path: path.display().to_string(),
    message: e.to_string(),
  })?;

  let mut hasher = Sha256::new();
  let mut buffer = [0u8; 8192];

  loop {
    let bytes_read = file.read(&mut buffer).map_err(|e| ChecksumError::ReadFile {
      path: path.display().to_string(),
      message: e.to_string(),
    })?;
    if bytes_read == 0 {
      break;
    }
    hasher.update(&buffer[..bytes_read]);
  }

  let digest = hasher.finalize();
  Ok(ContentChecksum(u32::from_be_bytes([
    digest[0], digest[1], digest[2], digest[3],
  ])))
}
