//! Command-line interface for qaportal.
//!
//! Provides commands for generating the review manifest, serving the
//! review portal, and inspecting the resolved configuration.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::config;
use crate::manifest;
use crate::server;

/// qaportal - content review manifest generator and asset server
#[derive(Parser, Debug)]
#[command(name = "qaportal")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan asset directories and write the review manifest
    Generate {
        /// Project key to scan (default: all projects)
        #[arg(short, long)]
        project: Option<String>,

        /// Output file (default: manifest.json in the review directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Serve the review portal and project assets over local HTTP
    Serve {
        /// Port to bind (default: from config, else 8888)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Generate { project, output } => generate(project.as_deref(), output).await,
            Commands::Serve { port } => serve(port).await,
            Commands::Config => show_config(),
        }
    }
}

/// Generate the manifest and print a per-project summary
async fn generate(project_key: Option<&str>, output: Option<PathBuf>) -> Result<()> {
    let config = config::load()?;
    let manifest = manifest::assemble(&config, project_key).await?;

    let output_path = output.unwrap_or_else(|| config.output.clone());
    manifest.save(&output_path).await?;

    println!("Generated: {}", manifest.generated);
    println!();

    for (key, project) in manifest.projects.iter() {
        println!("  {} ({})", project.name, key);
        for (category_key, category) in project.categories.iter() {
            println!("    {}: {} assets", category_key, category.count);
        }
        println!("    TOTAL: {}", project.total_assets);
        println!();
    }

    println!("Grand total: {} assets", manifest.total_assets);
    println!("Output: {}", output_path.display());

    Ok(())
}

/// Run the asset server until interrupted
async fn serve(port: Option<u16>) -> Result<()> {
    let config = config::load()?;
    let port = port.unwrap_or(config.port);

    server::run(&config, port).await
}

/// Print the resolved configuration
fn show_config() -> Result<()> {
    let config = config::load()?;

    println!("Config file: {}", config.config_file.display());
    println!("Review dir:  {}", config.review_dir.display());
    println!("Output:      {}", config.output.display());
    println!("Port:        {}", config.port);
    println!();
    println!("Projects:");

    for project in &config.catalog.projects {
        let status = if project.root.exists() { "ok" } else { "missing" };
        println!(
            "  {} -> {} ({})",
            project.key,
            project.root.display(),
            status
        );

        for category in &project.categories {
            let extract = if category.extract { ", extract" } else { "" };
            println!(
                "    {}: {} ({}{})",
                category.key, category.path, category.review_type, extract
            );
        }
    }

    Ok(())
}
