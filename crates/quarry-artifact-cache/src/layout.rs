//! On-disk layout of an artifact cache location

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CacheError, Result};
use crate::{INDEX_FILE_NAME, LOCK_FILE_NAME};

/// Where one cache location keeps its index and lock files
///
/// The settings layer deserializes this from the build configuration;
/// defaults cover everything except the cache directory itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheLayout {
    /// Directory holding the cache files
    pub cache_dir: PathBuf,

    /// Index file name within the cache directory
    #[serde(default = "default_index_file")]
    pub index_file: String,

    /// Lock file name within the cache directory
    #[serde(default = "default_lock_file")]
    pub lock_file: String,
}

fn default_index_file() -> String {
    INDEX_FILE_NAME.to_string()
}

fn default_lock_file() -> String {
    LOCK_FILE_NAME.to_string()
}

impl CacheLayout {
    /// Layout with the default file names under `cache_dir`
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            index_file: default_index_file(),
            lock_file: default_lock_file(),
        }
    }

    pub fn index_path(&self) -> PathBuf {
        self.cache_dir.join(&self.index_file)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.cache_dir.join(&self.lock_file)
    }

    /// Load a layout from a JSON settings file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|source| CacheError::io(format!("reading layout {}", path.display()), source))?;
        serde_json::from_str(&content).map_err(|parse_error| {
            CacheError::invalid(format!(
                "layout file {} is not valid: {parse_error}",
                path.display()
            ))
        })
    }
}
