//! Manifest document model.
//!
//! The manifest is the single aggregated output of a scan: every
//! discovered asset and extracted narrative item across all projects,
//! with per-category, per-project, and grand-total counts. It is built
//! fresh on each run, never mutated afterwards, and written once as
//! pretty-printed JSON, replacing any prior file.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use tokio::fs;

use crate::catalog::ReviewType;
use crate::extract::ReviewableItem;
use crate::scan::FileMeta;

pub mod assembler;

pub use assembler::assemble;

/// Generator identity recorded in the manifest
pub const GENERATOR: &str = "qaportal";

/// Manifest format version
pub const MANIFEST_VERSION: &str = "1.0";

/// Vec-backed map that serializes as a JSON object in insertion order.
///
/// Project and category keys must appear in catalog declaration order for
/// deterministic output, which a plain HashMap or BTreeMap cannot promise.
#[derive(Debug, Clone, Default)]
pub struct OrderedMap<V>(Vec<(String, V)>);

impl<V> OrderedMap<V> {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Append a key/value pair. Callers guarantee key uniqueness (catalog
    /// validation enforces it upstream).
    pub fn insert(&mut self, key: impl Into<String>, value: V) {
        self.0.push((key.into(), value));
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<V: Serialize> Serialize for OrderedMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// File-level source information shared by both asset entry shapes
#[derive(Debug, Clone, Serialize)]
pub struct SourceFile {
    /// File name
    pub name: String,

    /// Path relative to the project root
    pub path: String,

    /// Absolute filesystem path
    #[serde(rename = "absolutePath")]
    pub absolute_path: String,

    /// Review classification of the owning category
    #[serde(rename = "reviewType")]
    pub review_type: ReviewType,

    /// Probed file metadata
    #[serde(flatten)]
    pub meta: FileMeta,
}

/// One entry in a category's asset list.
///
/// Either a narrative item extracted from a parseable document or an
/// opaque file-level record. Both shapes merge into one list so the
/// review UI treats them uniformly.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum AssetEntry {
    /// Extracted narrative item, with its source file's metadata merged in
    Narrative {
        #[serde(flatten)]
        item: ReviewableItem,
        #[serde(flatten)]
        source: SourceFile,
    },

    /// Opaque asset file
    File {
        #[serde(flatten)]
        source: SourceFile,
    },
}

impl AssetEntry {
    /// The item id for narrative entries
    pub fn item_id(&self) -> Option<&str> {
        match self {
            AssetEntry::Narrative { item, .. } => Some(&item.id),
            AssetEntry::File { .. } => None,
        }
    }

    /// The shared file-level record
    pub fn source(&self) -> &SourceFile {
        match self {
            AssetEntry::Narrative { source, .. } => source,
            AssetEntry::File { source } => source,
        }
    }
}

/// One category's slice of the manifest
#[derive(Debug, Clone, Serialize)]
pub struct CategoryManifest {
    /// Subpath under the project root
    pub path: String,

    #[serde(rename = "reviewType")]
    pub review_type: ReviewType,

    /// Whether matched files were parsed for embedded items
    pub extract: bool,

    /// All entries, in scan order
    pub assets: Vec<AssetEntry>,

    /// Number of entries
    pub count: usize,
}

/// One project's slice of the manifest
#[derive(Debug, Clone, Serialize)]
pub struct ProjectManifest {
    /// Display name
    pub name: String,

    /// Project filesystem root
    #[serde(rename = "basePath")]
    pub base_path: String,

    /// Categories that discovered at least one file, in catalog order
    pub categories: OrderedMap<CategoryManifest>,

    /// Sum of the category counts
    #[serde(rename = "totalAssets")]
    pub total_assets: usize,
}

/// The root manifest document
#[derive(Debug, Clone, Serialize)]
pub struct Manifest {
    /// Generation timestamp (ISO-8601, local time)
    pub generated: String,

    /// Tool that produced this manifest
    pub generator: String,

    /// Manifest format version
    pub version: String,

    /// Projects in catalog order
    pub projects: OrderedMap<ProjectManifest>,

    /// Grand total across all projects
    #[serde(rename = "totalAssets")]
    pub total_assets: usize,
}

impl Manifest {
    /// Create an empty manifest stamped with the current time
    pub fn new() -> Self {
        Self {
            generated: Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
            generator: GENERATOR.to_string(),
            version: MANIFEST_VERSION.to_string(),
            projects: OrderedMap::new(),
            total_assets: 0,
        }
    }

    /// Write the manifest as pretty-printed JSON, replacing any prior file
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write manifest: {}", path.display()))?;

        Ok(())
    }
}

impl Default for Manifest {
    fn default() -> Self {
        Self::new()
    }
}
