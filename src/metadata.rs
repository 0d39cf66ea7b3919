//! Sign metadata store
//!
//! Read-only table mapping sign identifiers to descriptive and
//! animation-file metadata. Loaded once at startup; a failed load leaves
//! an empty table behind instead of an error.

use std::collections::HashMap;

use serde::Deserialize;

use crate::assets::AssetSource;

/// Metadata for one sign identifier
///
/// Every field is optional. Unknown identifiers look up as an all-absent
/// record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SignMetadata {
    /// Animation file name, relative to the animations directory
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// HamNoSys notation string
    #[serde(default)]
    pub hamnosys: Option<String>,
    #[serde(default)]
    pub biomechanical: Option<bool>,
    /// Sign language region, e.g. "ASL"
    #[serde(default)]
    pub region: Option<String>,
    /// Identifier this entry duplicates
    #[serde(default)]
    pub alias_for: Option<String>,
    /// Dataset identifier; some tables store it as a number, others as text
    #[serde(default)]
    pub wlasl_id: Option<serde_json::Value>,
}

impl SignMetadata {
    /// Whether this entry names an animation file
    pub fn has_file(&self) -> bool {
        self.file.as_deref().is_some_and(|f| !f.is_empty())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("Could not fetch {path}: {source}")]
    Fetch {
        path: String,
        #[source]
        source: crate::assets::LoadError,
    },

    #[error("Malformed metadata: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Immutable sign metadata table
#[derive(Debug, Clone, Default)]
pub struct SignMetadataStore {
    entries: HashMap<String, SignMetadata>,
    absent: SignMetadata,
}

impl SignMetadataStore {
    /// Create an empty table
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a JSON object of `key -> metadata`
    pub fn from_json_str(text: &str) -> Result<Self, MetadataError> {
        let entries: HashMap<String, SignMetadata> = serde_json::from_str(text)?;
        Ok(Self {
            entries,
            absent: SignMetadata::default(),
        })
    }

    /// Build a table from entries (used by hosts that already hold the data)
    pub fn from_entries<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, SignMetadata)>,
        K: Into<String>,
    {
        Self {
            entries: entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            absent: SignMetadata::default(),
        }
    }

    /// Fetch and parse the metadata document
    ///
    /// Never fails: a fetch or parse problem is logged and an empty table is
    /// returned.
    pub async fn load(source: &dyn AssetSource, path: &str) -> Self {
        log::info!("Loading {} metadata...", path);
        match Self::try_load(source, path).await {
            Ok(store) => {
                log::info!("{} loaded successfully ({} signs).", path, store.len());
                store
            }
            Err(e) => {
                log::error!("Could not load {}; using empty metadata. {}", path, e);
                Self::empty()
            }
        }
    }

    async fn try_load(source: &dyn AssetSource, path: &str) -> Result<Self, MetadataError> {
        let text = source
            .fetch_text(path)
            .await
            .map_err(|source| MetadataError::Fetch {
                path: path.to_string(),
                source,
            })?;
        Self::from_json_str(&text)
    }

    /// Look up a key; unknown keys yield an all-absent record
    pub fn lookup(&self, key: &str) -> &SignMetadata {
        self.entries.get(key).unwrap_or(&self.absent)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
