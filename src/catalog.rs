//! Project catalog definitions and loading.
//!
//! The catalog declares which projects are reviewable, where they live on
//! disk, and which asset categories each one contains. It is defined in
//! YAML and loaded at startup; declaration order is preserved so manifest
//! output is deterministic.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by catalog validation
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Project {0} has an empty key")]
    EmptyProjectKey(usize),

    #[error("Duplicate project key: {0}")]
    DuplicateProjectKey(String),

    #[error("Project '{project}': category {index} has an empty key")]
    EmptyCategoryKey { project: String, index: usize },

    #[error("Project '{project}': duplicate category key: {key}")]
    DuplicateCategoryKey { project: String, key: String },

    #[error("Project '{project}': category '{key}' has no patterns")]
    NoPatterns { project: String, key: String },
}

/// The full set of reviewable projects
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectCatalog {
    /// Ordered list of projects
    pub projects: Vec<ProjectConfig>,
}

impl ProjectCatalog {
    /// Load a catalog from a YAML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog file: {}", path.display()))?;

        Self::from_yaml(&content)
    }

    /// Parse a catalog from YAML content
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse catalog YAML")
    }

    /// Validate the catalog definition
    pub fn validate(&self) -> Result<(), CatalogError> {
        let mut project_keys: Vec<&str> = Vec::new();

        for (i, project) in self.projects.iter().enumerate() {
            if project.key.is_empty() {
                return Err(CatalogError::EmptyProjectKey(i));
            }
            if project_keys.contains(&project.key.as_str()) {
                return Err(CatalogError::DuplicateProjectKey(project.key.clone()));
            }
            project_keys.push(&project.key);

            let mut category_keys: Vec<&str> = Vec::new();
            for (j, category) in project.categories.iter().enumerate() {
                if category.key.is_empty() {
                    return Err(CatalogError::EmptyCategoryKey {
                        project: project.key.clone(),
                        index: j,
                    });
                }
                if category_keys.contains(&category.key.as_str()) {
                    return Err(CatalogError::DuplicateCategoryKey {
                        project: project.key.clone(),
                        key: category.key.clone(),
                    });
                }
                if category.patterns.is_empty() {
                    return Err(CatalogError::NoPatterns {
                        project: project.key.clone(),
                        key: category.key.clone(),
                    });
                }
                category_keys.push(&category.key);
            }
        }

        Ok(())
    }

    /// Get a project by key
    pub fn get(&self, key: &str) -> Option<&ProjectConfig> {
        self.projects.iter().find(|p| p.key == key)
    }

    /// All project keys, in declaration order
    pub fn keys(&self) -> Vec<&str> {
        self.projects.iter().map(|p| p.key.as_str()).collect()
    }
}

/// A single reviewable project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project key (unique, used in CLI and manifest)
    pub key: String,

    /// Human-readable display name
    pub name: String,

    /// Filesystem root of the project
    pub root: PathBuf,

    /// URL prefix the asset server maps to `root` (default: `/<key>/`)
    pub url_prefix: Option<String>,

    /// Ordered list of asset categories
    pub categories: Vec<CategoryConfig>,
}

impl ProjectConfig {
    /// URL prefix under which the server exposes this project's files
    pub fn url_prefix(&self) -> String {
        match &self.url_prefix {
            Some(prefix) => prefix.clone(),
            None => format!("/{}/", self.key),
        }
    }
}

/// One asset category within a project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryConfig {
    /// Category key (unique within the project)
    pub key: String,

    /// Subpath under the project root
    pub path: String,

    /// Review classification for UI routing
    pub review_type: ReviewType,

    /// Filename glob patterns to match
    pub patterns: Vec<String>,

    /// Parse matched files for embedded reviewable items
    #[serde(default)]
    pub extract: bool,
}

/// Review classification of an asset category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewType {
    /// Visual assets (backgrounds, sprites, UI)
    Art,

    /// Music and sound effects
    Audio,

    /// Narrative documents (encounters, dialogue)
    Narrative,

    /// Flavor text and world lore
    Lore,

    /// Voice-over lines
    Vocal,
}

impl std::fmt::Display for ReviewType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReviewType::Art => write!(f, "art"),
            ReviewType::Audio => write!(f, "audio"),
            ReviewType::Narrative => write!(f, "narrative"),
            ReviewType::Lore => write!(f, "lore"),
            ReviewType::Vocal => write!(f, "vocal"),
        }
    }
}

impl std::str::FromStr for ReviewType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "art" => Ok(ReviewType::Art),
            "audio" => Ok(ReviewType::Audio),
            "narrative" => Ok(ReviewType::Narrative),
            "lore" => Ok(ReviewType::Lore),
            "vocal" => Ok(ReviewType::Vocal),
            _ => anyhow::bail!("Unknown review type: {}", s),
        }
    }
}
