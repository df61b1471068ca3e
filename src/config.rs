//! Configuration for qaportal.
//!
//! One YAML file holds the project catalog and the server settings.
//!
//! Discovery (highest priority first):
//! 1. `QAPORTAL_CONFIG` environment variable (explicit path)
//! 2. `.qaportal/config.yaml` in the current directory or any parent
//! 3. `~/.qaportal/config.yaml`
//!
//! Relative paths in the config file resolve against the config file's
//! directory. The resolved configuration is passed explicitly to the
//! components that need it; there is no global state.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::catalog::{ProjectCatalog, ProjectConfig};

/// Default port for the asset server
pub const DEFAULT_PORT: u16 = 8888;

/// Default manifest file name, relative to the review directory
pub const DEFAULT_OUTPUT: &str = "manifest.json";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,

    /// Manifest output file, relative to the review directory
    #[serde(default)]
    pub output: Option<String>,

    #[serde(default)]
    pub server: Option<ServerSection>,

    /// Ordered list of reviewable projects
    pub projects: Vec<ProjectConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerSection {
    /// Port the asset server binds to
    pub port: Option<u16>,

    /// Review UI directory (relative to the config file)
    pub review_dir: Option<String>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The project catalog, in declaration order
    pub catalog: ProjectCatalog,

    /// Directory holding the review UI and the generated manifest
    pub review_dir: PathBuf,

    /// Default manifest output path
    pub output: PathBuf,

    /// Asset server port
    pub port: u16,

    /// Path the configuration was loaded from
    pub config_file: PathBuf,
}

/// Find the config file via env var, upward search, then home directory
pub fn find_config_file() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("QAPORTAL_CONFIG") {
        return Some(PathBuf::from(path));
    }

    let mut current = std::env::current_dir().ok()?;
    loop {
        let candidate = current.join(".qaportal").join("config.yaml");
        if candidate.exists() {
            return Some(candidate);
        }

        if !current.pop() {
            break;
        }
    }

    let home = dirs::home_dir()?;
    let fallback = home.join(".qaportal").join("config.yaml");
    if fallback.exists() {
        return Some(fallback);
    }

    None
}

/// Load configuration from the discovered location
pub fn load() -> Result<ResolvedConfig> {
    let path = find_config_file()
        .context("No config file found. Set QAPORTAL_CONFIG or create .qaportal/config.yaml")?;

    load_from(&path)
}

/// Load and resolve configuration from a specific file
pub fn load_from(path: &Path) -> Result<ResolvedConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let file: ConfigFile = serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    resolve(file, path)
}

/// Resolve a parsed config file against its on-disk location
fn resolve(file: ConfigFile, config_path: &Path) -> Result<ResolvedConfig> {
    let base_dir = config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let server = file.server.unwrap_or_default();

    let review_dir = match &server.review_dir {
        Some(dir) => resolve_path(&base_dir, dir),
        None => base_dir.clone(),
    };

    let output = review_dir.join(file.output.as_deref().unwrap_or(DEFAULT_OUTPUT));

    let mut projects = file.projects;
    for project in &mut projects {
        if !project.root.is_absolute() {
            let relative = project.root.to_string_lossy().into_owned();
            project.root = resolve_path(&base_dir, &relative);
        }
    }

    let catalog = ProjectCatalog { projects };
    catalog
        .validate()
        .with_context(|| format!("Invalid catalog in {}", config_path.display()))?;

    Ok(ResolvedConfig {
        catalog,
        review_dir,
        output,
        port: server.port.unwrap_or(DEFAULT_PORT),
        config_file: config_path.to_path_buf(),
    })
}

/// Resolve a path that may be relative to the config file's directory
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(&path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}
