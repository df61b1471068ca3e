//! Manifest assembly.
//!
//! Orchestrates scanner, probe, and extractor across the project catalog.
//! Per-project and per-category problems are warnings, never failures; the
//! assembler always produces whatever partial manifest it could build. The
//! one hard failure is an unreadable file during hashing, which means a
//! genuinely broken input the operator must fix.

use std::collections::HashSet;
use std::path::Path;

use anyhow::Result;
use tracing::warn;

use crate::catalog::{CategoryConfig, ProjectConfig};
use crate::config::ResolvedConfig;
use crate::extract::{self, Source};
use crate::scan;

use super::{AssetEntry, CategoryManifest, Manifest, OrderedMap, ProjectManifest, SourceFile};

/// Issued item ids across the whole manifest.
///
/// Extraction ids are only unique per document; two files reusing a
/// logical key (two "chapter 1"s) would silently collide in any index
/// keyed by id. Collisions are resolved here, at assembly time, so
/// extraction itself stays a pure function of the source document.
struct IdRegistry {
    seen: HashSet<String>,
}

impl IdRegistry {
    fn new() -> Self {
        Self {
            seen: HashSet::new(),
        }
    }

    /// Claim a manifest-unique id. Collisions are namespaced by the source
    /// file stem, then numbered.
    fn claim(&mut self, id: &str, stem: &str) -> String {
        if self.seen.insert(id.to_string()) {
            return id.to_string();
        }

        let namespaced = format!("{}_{}", stem, id);
        if self.seen.insert(namespaced.clone()) {
            warn!("Duplicate item id '{}' renamed to '{}'", id, namespaced);
            return namespaced;
        }

        let mut n = 2;
        loop {
            let candidate = format!("{}_{}", namespaced, n);
            if self.seen.insert(candidate.clone()) {
                warn!("Duplicate item id '{}' renamed to '{}'", id, candidate);
                return candidate;
            }
            n += 1;
        }
    }
}

/// Assemble a manifest for the catalog, optionally restricted to one
/// project key. An unknown key is a warning; the remaining projects (none,
/// in that case) are still processed.
pub async fn assemble(config: &ResolvedConfig, only: Option<&str>) -> Result<Manifest> {
    let mut manifest = Manifest::new();
    let mut ids = IdRegistry::new();

    if let Some(key) = only {
        if config.catalog.get(key).is_none() {
            warn!("Unknown project '{}'", key);
        }
    }

    for project in &config.catalog.projects {
        if let Some(key) = only {
            if project.key != key {
                continue;
            }
        }

        if !project.root.exists() {
            warn!("Project path not found: {}", project.root.display());
            continue;
        }

        let project_manifest = assemble_project(project, &mut ids).await?;
        manifest.total_assets += project_manifest.total_assets;
        manifest.projects.insert(&project.key, project_manifest);
    }

    Ok(manifest)
}

/// Scan every category of one project and build its manifest slice
async fn assemble_project(
    project: &ProjectConfig,
    ids: &mut IdRegistry,
) -> Result<ProjectManifest> {
    let mut categories = OrderedMap::new();
    let mut total_assets = 0;

    for category in &project.categories {
        let files = scan::scan_category(&project.root, &category.path, &category.patterns)?;

        // Categories with no matches are omitted entirely
        if files.is_empty() {
            continue;
        }

        let mut assets = Vec::new();
        for file in &files {
            assets.extend(entries_for_file(project, category, file, ids).await?);
        }

        total_assets += assets.len();
        categories.insert(
            &category.key,
            CategoryManifest {
                path: category.path.clone(),
                review_type: category.review_type,
                extract: category.extract,
                count: assets.len(),
                assets,
            },
        );
    }

    Ok(ProjectManifest {
        name: project.name.clone(),
        base_path: project.root.display().to_string(),
        categories,
        total_assets,
    })
}

/// Probe one discovered file and turn it into manifest entries.
///
/// Extraction applies only when the category asks for it and the file is a
/// JSON/YAML document. Zero extracted items, a parse failure, or a
/// non-document file all fall back to a single file-level record.
async fn entries_for_file(
    project: &ProjectConfig,
    category: &CategoryConfig,
    file: &Path,
    ids: &mut IdRegistry,
) -> Result<Vec<AssetEntry>> {
    let meta = scan::probe_file(file).await?;

    let relative = file.strip_prefix(&project.root).unwrap_or(file);
    let source_file = SourceFile {
        name: file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        path: relative.display().to_string(),
        absolute_path: file.display().to_string(),
        review_type: category.review_type,
        meta,
    };

    if category.extract {
        if let Some(source) = Source::from_path(file) {
            match extract_file(&source, file).await {
                Ok(items) if !items.is_empty() => {
                    let entries = items
                        .into_iter()
                        .map(|mut item| {
                            item.id = ids.claim(&item.id, &source.stem);
                            AssetEntry::Narrative {
                                item,
                                source: source_file.clone(),
                            }
                        })
                        .collect();
                    return Ok(entries);
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("Skipping extraction for {}: {:#}", file.display(), e);
                }
            }
        }
    }

    Ok(vec![AssetEntry::File {
        source: source_file,
    }])
}

async fn extract_file(
    source: &Source,
    file: &Path,
) -> Result<Vec<crate::extract::ReviewableItem>> {
    let content = tokio::fs::read_to_string(file).await?;
    extract::extract_from_str(source, &content)
}
