//! Viewport and tile layer description handed to the map widget.

use crate::config::{MapConfig, TileLayerConfig};
use serde::Serialize;
use std::collections::BTreeMap;

pub fn tile_handle(name: &str) -> String {
    format!("tile:{}", name)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapView {
    /// Simple CRS scaled from pixels to world units: `[a, b, c, d]`.
    pub transformation: [f64; 4],
    pub center: [f64; 2],
    pub zoom: u8,
    pub zoom_snap: f64,
    pub max_bounds: [[f64; 2]; 2],
    pub fullscreen_position: String,
    pub base_tree: BaseTree,
    pub default_base: Option<String>,
    pub tile_layers: BTreeMap<String, TileLayerView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BaseTree {
    pub label: String,
    pub children: Vec<BaseLayerNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BaseLayerNode {
    pub label: String,
    pub layer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TileLayerView {
    pub url: String,
    pub min_zoom: u8,
    pub max_zoom: u8,
    pub max_native_zoom: u8,
    pub no_wrap: bool,
    pub continuous_world: bool,
    pub detect_retina: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub z_index: Option<i32>,
}

impl TileLayerView {
    /// High-density screens get one extra zoom level, served from tiles one
    /// native level lower so they are scaled to fit.
    pub fn new(config: &MapConfig, layer: &TileLayerConfig, pixel_ratio: f64) -> Self {
        let (max_zoom, max_native_zoom) = if pixel_ratio > 1.0 {
            (config.zoom_max.saturating_add(1), config.zoom_max.saturating_sub(1))
        } else {
            (config.zoom_max, config.zoom_max)
        };

        Self {
            url: config.tile_url.replace("{layer}", &layer.name),
            min_zoom: 0,
            max_zoom,
            max_native_zoom,
            no_wrap: true,
            continuous_world: false,
            detect_retina: true,
            z_index: layer.z_index,
        }
    }
}

impl MapView {
    pub fn new(config: &MapConfig, pixel_ratio: f64) -> Self {
        let tile_layers = config
            .base_layers
            .iter()
            .chain(config.overlay_layers.iter())
            .map(|layer| {
                (tile_handle(&layer.name), TileLayerView::new(config, layer, pixel_ratio))
            })
            .collect();

        let children = config
            .base_layers
            .iter()
            .map(|layer| BaseLayerNode {
                label: layer.label.clone(),
                layer: tile_handle(&layer.name),
            })
            .collect();

        let default_base = config
            .base_layers
            .iter()
            .find(|layer| layer.default)
            .or_else(|| config.base_layers.first())
            .map(|layer| tile_handle(&layer.name));

        Self {
            transformation: [config.scale, 0.0, config.scale, 0.0],
            center: config.center,
            zoom: config.zoom,
            zoom_snap: config.zoom_snap,
            max_bounds: config.max_bounds,
            fullscreen_position: config.fullscreen_position.clone(),
            base_tree: BaseTree {
                label: "Map".to_string(),
                children,
            },
            default_base,
            tile_layers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_density() {
        let view = MapView::new(&MapConfig::default(), 1.0);
        let surface = &view.tile_layers["tile:surface"];

        assert_eq!(surface.url, "map/surface/{z}/{x}/{y}.webp");
        assert_eq!(surface.max_zoom, 6);
        assert_eq!(surface.max_native_zoom, 6);
        assert_eq!(surface.z_index, Some(1));
        assert!(surface.no_wrap);
        assert!(surface.detect_retina);
    }

    #[test]
    fn test_high_density_zooms_further() {
        let view = MapView::new(&MapConfig::default(), 2.0);
        let cave = &view.tile_layers["tile:cave"];

        assert_eq!(cave.max_zoom, 7);
        assert_eq!(cave.max_native_zoom, 5);
        assert_eq!(cave.z_index, None);
    }

    #[test]
    fn test_high_density_at_zoom_limit() {
        let config = MapConfig { zoom_max: u8::MAX, ..MapConfig::default() };
        let view = MapView::new(&config, 2.0);
        let surface = &view.tile_layers["tile:surface"];

        assert_eq!(surface.max_zoom, u8::MAX);
        assert_eq!(surface.max_native_zoom, u8::MAX - 1);
    }

    #[test]
    fn test_viewport() {
        let view = MapView::new(&MapConfig::default(), 1.0);
        let scale = 108.0 / 448.0;

        assert_eq!(view.transformation, [scale, 0.0, scale, 0.0]);
        assert_eq!(view.center, [1000.0, 1500.0]);
        assert_eq!(view.zoom, 2);
        assert_eq!(view.max_bounds, [[0.0, 0.0], [2000.0, 3000.0]]);
        assert_eq!(view.fullscreen_position, "topleft");
    }

    #[test]
    fn test_base_tree_and_default() {
        let view = MapView::new(&MapConfig::default(), 1.0);

        assert_eq!(view.base_tree.label, "Map");
        let labels: Vec<&str> = view.base_tree.children.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["Caves", "Surface"]);
        assert_eq!(view.default_base.as_deref(), Some("tile:surface"));
        // hollow is an overlay, not a base layer
        assert!(view.tile_layers.contains_key("tile:hollow"));
        assert_eq!(view.base_tree.children.len(), 2);
    }

    #[test]
    fn test_default_falls_back_to_first() {
        let mut config = MapConfig::default();
        for layer in &mut config.base_layers {
            layer.default = false;
        }
        let view = MapView::new(&config, 1.0);
        assert_eq!(view.default_base.as_deref(), Some("tile:cave"));

        config.base_layers.clear();
        assert_eq!(MapView::new(&config, 1.0).default_base, None);
    }

    #[test]
    fn test_serialized_keys() {
        let json = serde_json::to_value(MapView::new(&MapConfig::default(), 1.0)).unwrap();
        assert_eq!(json["zoomSnap"], 1.0);
        assert_eq!(json["tileLayers"]["tile:hollow"]["maxNativeZoom"], 6);
        assert_eq!(json["tileLayers"]["tile:hollow"]["zIndex"], 2);
    }
}
