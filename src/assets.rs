//! Startup retrieval of the baseline dataset and the sticker catalog.
//!
//! Both are optional: a missing or broken asset is logged and replaced by an
//! empty result so the session still starts.

use std::collections::HashMap;
use std::path::PathBuf;

use thiserror::Error;

use crate::format::{FormatError, RecordSet, parse_baseline};

/// Errors from fetching or decoding an asset.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("I/O error reading '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Asset not found: {0}")]
    NotFound(String),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Format(#[from] FormatError),
}

/// Somewhere assets can be fetched from by relative path.
pub trait AssetSource {
    fn fetch_text(&self, path: &str) -> Result<String, AssetError>;
}

/// Assets served from a local directory.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl AssetSource for DirectorySource {
    fn fetch_text(&self, path: &str) -> Result<String, AssetError> {
        let full = self.root.join(path);
        std::fs::read_to_string(&full).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                AssetError::NotFound(full.display().to_string())
            } else {
                AssetError::Io {
                    path: full.display().to_string(),
                    source,
                }
            }
        })
    }
}

/// Assets held in memory, keyed by path.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: HashMap<String, String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<String>, contents: impl Into<String>) -> Self {
        self.files.insert(path.into(), contents.into());
        self
    }
}

impl AssetSource for MemorySource {
    fn fetch_text(&self, path: &str) -> Result<String, AssetError> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| AssetError::NotFound(path.to_string()))
    }
}

/// Sorted list of known sticker file names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StickerCatalog {
    names: Vec<String>,
}

impl StickerCatalog {
    pub fn new(names: impl IntoIterator<Item = String>) -> Self {
        let mut names: Vec<String> = names.into_iter().collect();
        names.sort();
        names.dedup();
        Self { names }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.binary_search_by(|n| n.as_str().cmp(name)).is_ok()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }
}

fn try_load_baseline(source: &dyn AssetSource, path: &str) -> Result<RecordSet, AssetError> {
    let text = source.fetch_text(path)?;
    Ok(parse_baseline(&text)?)
}

fn try_load_stickers(source: &dyn AssetSource, path: &str) -> Result<StickerCatalog, AssetError> {
    let text = source.fetch_text(path)?;
    let names: Vec<String> = serde_json::from_str(&text)?;
    Ok(StickerCatalog::new(names))
}

/// Fetch and parse the baseline dataset. Failures yield an empty set.
pub fn load_baseline(source: &dyn AssetSource, path: &str) -> RecordSet {
    match try_load_baseline(source, path) {
        Ok(records) => {
            log::info!(
                "Loaded baseline '{}': {} markers, {} zones",
                path,
                records.markers.len(),
                records.zones.len()
            );
            records
        }
        Err(e) => {
            log::warn!("Baseline unavailable, starting without presets: {}", e);
            RecordSet::default()
        }
    }
}

/// Fetch the sticker catalog. Failures yield an empty catalog.
pub fn load_sticker_catalog(source: &dyn AssetSource, path: &str) -> StickerCatalog {
    match try_load_stickers(source, path) {
        Ok(catalog) => {
            log::info!("Loaded {} stickers from '{}'", catalog.len(), path);
            catalog
        }
        Err(e) => {
            log::warn!("Sticker catalog unavailable: {}", e);
            StickerCatalog::default()
        }
    }
}
