use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::fs;
use anyhow::{Context, Result};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub input: InputConfig,
    #[serde(default)]
    pub map: MapConfig,
    #[serde(default)]
    pub icons: IconConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    pub markers: PathBuf,
    pub taxonomy: Option<PathBuf>, // Built-in taxonomy when absent
}

/// Viewport and tile layer setup for the game map.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct MapConfig {
    /// Pixels-to-world-units factor of the simple CRS.
    pub scale: f64,
    pub zoom_max: u8,
    pub zoom: u8,
    pub zoom_snap: f64,
    pub center: [f64; 2],
    pub max_bounds: [[f64; 2]; 2],
    /// Must contain `{layer}`; the tile widget fills in `{z}/{x}/{y}`.
    pub tile_url: String,
    pub fullscreen_position: String,
    pub base_layers: Vec<TileLayerConfig>,
    pub overlay_layers: Vec<TileLayerConfig>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct TileLayerConfig {
    pub name: String,
    pub label: String,
    #[serde(default)]
    pub z_index: Option<i32>,
    #[serde(default)]
    pub default: bool,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            // furthest-out zoom is 4480 units at 1080p
            scale: 108.0 / 448.0,
            zoom_max: 6,
            zoom: 2,
            zoom_snap: 1.0,
            center: [1000.0, 1500.0],
            max_bounds: [[0.0, 0.0], [2000.0, 3000.0]],
            tile_url: "map/{layer}/{z}/{x}/{y}.webp".to_string(),
            fullscreen_position: "topleft".to_string(),
            base_layers: vec![
                TileLayerConfig {
                    name: "cave".to_string(),
                    label: "Caves".to_string(),
                    z_index: None,
                    default: false,
                },
                TileLayerConfig {
                    name: "surface".to_string(),
                    label: "Surface".to_string(),
                    z_index: Some(1),
                    default: true,
                },
            ],
            overlay_layers: vec![TileLayerConfig {
                name: "hollow".to_string(),
                label: "Inside/Underneath".to_string(),
                z_index: Some(2),
                default: false,
            }],
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct IconConfig {
    pub base_url: String,
    pub numbered_size: [u32; 2],
}

impl Default for IconConfig {
    fn default() -> Self {
        Self {
            base_url: "icons".to_string(),
            numbered_size: [32, 32],
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { dir: PathBuf::from("site/data") }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub site_dir: PathBuf,
    pub tile_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            site_dir: PathBuf::from("site"),
            tile_dir: PathBuf::from("site/map"),
        }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content)
            .with_context(|| "Failed to parse TOML configuration")?;
        Ok(config)
    }
}
