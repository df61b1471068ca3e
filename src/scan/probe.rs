//! Per-file metadata probing.
//!
//! Size, modification time, and a short content fingerprint for change
//! detection; pixel dimensions for raster images. Dimension decoding may
//! fail for any reason without affecting the rest of the metadata.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Extensions probed for pixel dimensions
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif"];

/// Derived metadata for a discovered file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileMeta {
    /// Size in bytes
    pub size: u64,

    /// Last-modified timestamp (ISO-8601, local time)
    pub modified: String,

    /// First 8 hex chars of the SHA-256 of the file contents
    pub hash: String,

    /// `WxH` for decodable raster images, null otherwise
    pub dimensions: Option<String>,
}

/// Probe a file for size, mtime, content fingerprint, and image dimensions.
///
/// A read failure during hashing propagates; a dimension decode failure
/// degrades to `dimensions: None`.
pub async fn probe_file(path: &Path) -> Result<FileMeta> {
    let metadata = tokio::fs::metadata(path)
        .await
        .with_context(|| format!("Failed to stat file: {}", path.display()))?;

    let modified = metadata
        .modified()
        .map(format_local_timestamp)
        .unwrap_or_default();

    let hash = fingerprint(path).await?;

    let dimensions = if is_image(path) {
        image_dimensions(path)
    } else {
        None
    };

    Ok(FileMeta {
        size: metadata.len(),
        modified,
        hash,
        dimensions,
    })
}

/// Short content fingerprint: first 8 hex chars of SHA-256
pub async fn fingerprint(path: &Path) -> Result<String> {
    let content = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read file for hashing: {}", path.display()))?;

    let mut hasher = Sha256::new();
    hasher.update(&content);
    let result = hasher.finalize();

    Ok(format!("{:x}", result)[..8].to_string())
}

fn format_local_timestamp(time: std::time::SystemTime) -> String {
    let datetime: DateTime<Local> = time.into();
    datetime.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Pixel dimensions as `WxH`, or None if the header cannot be decoded
fn image_dimensions(path: &Path) -> Option<String> {
    match image::image_dimensions(path) {
        Ok((width, height)) => Some(format!("{}x{}", width, height)),
        Err(_) => None,
    }
}
