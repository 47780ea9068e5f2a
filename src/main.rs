pub mod types;
pub mod config;
pub mod error;
pub mod taxonomy;
pub mod registry;
pub mod data;
pub mod icons;
pub mod map;
pub mod control;
pub mod export;
pub mod server;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the marker layer tree and write it out for the map page
    Build {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Serve the map, loading marker layers in the background
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
}

fn load_taxonomy(app_config: &config::AppConfig) -> anyhow::Result<taxonomy::Taxonomy> {
    match &app_config.input.taxonomy {
        Some(path) => {
            info!("Using taxonomy from {:?}", path);
            Ok(taxonomy::Taxonomy::load_from_file(path)?)
        }
        None => Ok(taxonomy::Taxonomy::loddlenaut().clone()),
    }
}

/// Writes every output to a `.tmp` sibling first and renames only once all
/// of them are on disk, so a failed write leaves no new outputs behind.
fn write_outputs(dir: &Path, outputs: &[(&str, String)]) -> anyhow::Result<()> {
    let staged: Vec<(PathBuf, PathBuf)> = outputs
        .iter()
        .map(|(name, _)| (dir.join(format!("{}.tmp", name)), dir.join(name)))
        .collect();

    for ((tmp, _), (_, content)) in staged.iter().zip(outputs) {
        if let Err(e) = std::fs::write(tmp, content) {
            for (tmp, _) in &staged {
                let _ = std::fs::remove_file(tmp);
            }
            return Err(e).with_context(|| format!("Failed to write {:?}", tmp));
        }
    }

    for (tmp, path) in &staged {
        std::fs::rename(tmp, path).with_context(|| format!("Failed to write {:?}", path))?;
        info!("Wrote {:?}", path);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Build { config } => {
            info!("Building marker layers with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(config)?;
            let taxonomy = load_taxonomy(&app_config)?;

            // 1. Load the raw document; nothing is written if this fails
            let document = data::load_document(&app_config.input.markers).await?;

            // 2. Build the layer tree
            let (tree, stats) = registry::build_with_stats(&document, &taxonomy);
            for (key, count) in tree.leaf_counts() {
                info!("  {:<28} {}", key, count);
            }
            if stats.dropped > 0 {
                info!("Dropped {} malformed records", stats.dropped);
            }

            // 3. Write the control tree and a GeoJSON copy of every marker
            let out_dir = &app_config.output.dir;
            std::fs::create_dir_all(out_dir)
                .with_context(|| format!("Failed to create output directory {:?}", out_dir))?;

            let overlays = control::OverlayControl::new(&app_config.map, &app_config.icons, Some(&tree));
            let markers = export::tree_feature_collection(&tree);
            write_outputs(
                out_dir,
                &[
                    ("overlays.json", serde_json::to_string(&overlays)?),
                    ("markers.geojson", serde_json::to_string(&markers)?),
                ],
            )?;

            info!("Build complete!");
        }
        Commands::Serve { config } => {
            info!("Serving map with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(config)?;
            let taxonomy = Arc::new(load_taxonomy(&app_config)?);

            server::start_server(app_config, taxonomy).await?;
        }
    }

    Ok(())
}
