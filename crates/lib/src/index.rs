//! Content index boundary.
//!
//! The tagging editor maintains an index of which member paths carry which
//! bundle name and which label. The pipeline only queries it; constructing
//! and maintaining the index is external. The index is passed explicitly to
//! every stage that needs it, never held in ambient state.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Queryable mapping from bundle names and labels to member paths.
pub trait ContentIndex {
  /// All bundle names known to the index.
  fn bundle_names(&self) -> Vec<String>;

  /// Member paths tagged with the given bundle name.
  fn members_of(&self, name: &str) -> Vec<String>;

  /// Paths the given label was applied to.
  ///
  /// A label applies to all content nested under the labeled path, so
  /// callers must treat each returned path as covering its whole subtree.
  fn labeled_paths(&self, label: &str) -> Vec<String>;
}

/// Errors loading a content index file.
#[derive(Debug, Error)]
pub enum IndexError {
  #[error("failed to read index {path}: {source}")]
  Io {
    path: String,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse index {path}: {source}")]
  Parse {
    path: String,
    #[source]
    source: serde_json::Error,
  },
}

/// Content index backed by a JSON export of the tagging database.
///
/// # Format
///
/// ```json
/// {
///   "bundles": { "<bundleName>": ["<memberPath>", ...], ... },
///   "labels":  { "<label>": ["<labeledPath>", ...], ... }
/// }
/// ```
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonIndex {
  #[serde(default)]
  bundles: BTreeMap<String, Vec<String>>,
  #[serde(default)]
  labels: BTreeMap<String, Vec<String>>,
}

impl JsonIndex {
  pub fn new(bundles: BTreeMap<String, Vec<String>>, labels: BTreeMap<String, Vec<String>>) -> Self {
    Self { bundles, labels }
  }

  /// Load an index from a JSON file.
  pub fn from_file(path: &Path) -> Result<Self, IndexError> {
    let text = fs::read_to_string(path).map_err(|e| IndexError::Io {
      path: path.display().to_string(),
      source: e,
    })?;
    serde_json::from_str(&text).map_err(|e| IndexError::Parse {
      path: path.display().to_string(),
      source: e,
    })
  }
}

impl ContentIndex for JsonIndex {
  fn bundle_names(&self) -> Vec<String> {
    self.bundles.keys().cloned().collect()
  }

  fn members_of(&self, name: &str) -> Vec<String> {
    self.bundles.get(name).cloned().unwrap_or_default()
  }

  fn labeled_paths(&self, label: &str) -> Vec<String> {
    self.labels.get(label).cloned().unwrap_or_default()
  }
}
