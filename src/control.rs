//! Converts a layer tree into the nested `{label, layer?, children?,
//! selectAllCheckbox?}` nodes read by the layer-tree control.

use crate::config::{IconConfig, MapConfig};
use crate::icons::IconSpec;
use crate::map::tile_handle;
use crate::registry::{LayerNode, LayerTree, MarkerGroup};
use serde::Serialize;
use std::collections::BTreeMap;

pub fn marker_handle(key: &str) -> String {
    format!("marker:{}", key)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlNode {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<ControlNode>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub select_all_checkbox: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerView {
    pub lat_lng: [f64; 2],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerLayerView {
    pub key: String,
    pub label: String,
    pub icon: IconSpec,
    pub visible: bool,
    pub markers: Vec<MarkerView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayControl {
    pub collapsed: bool,
    pub overlays: Vec<ControlNode>,
    /// Marker payloads keyed by the handle referenced from `overlays`.
    pub layers: BTreeMap<String, MarkerLayerView>,
}

impl OverlayControl {
    /// Tile overlays always appear. The marker subtree appears only when a
    /// whole layer tree is available.
    pub fn new(map: &MapConfig, icons: &IconConfig, tree: Option<&LayerTree>) -> Self {
        let mut overlays: Vec<ControlNode> = map
            .overlay_layers
            .iter()
            .map(|layer| ControlNode {
                label: layer.label.clone(),
                layer: Some(tile_handle(&layer.name)),
                children: None,
                select_all_checkbox: None,
            })
            .collect();

        let mut layers = BTreeMap::new();
        if let Some(tree) = tree {
            overlays.extend(tree.roots.iter().map(control_node));
            for group in tree.leaves() {
                layers.insert(marker_handle(&group.key), marker_layer(group, icons));
            }
        }

        Self {
            collapsed: true,
            overlays,
            layers,
        }
    }
}

fn control_node(node: &LayerNode) -> ControlNode {
    match node {
        LayerNode::Leaf(group) => ControlNode {
            label: group.label.clone(),
            layer: Some(marker_handle(&group.key)),
            children: None,
            select_all_checkbox: None,
        },
        LayerNode::Group {
            label,
            select_all,
            children,
        } => ControlNode {
            label: label.clone(),
            layer: None,
            children: Some(children.iter().map(control_node).collect()),
            select_all_checkbox: select_all.then_some(true),
        },
    }
}

pub fn marker_layer(group: &MarkerGroup, icons: &IconConfig) -> MarkerLayerView {
    MarkerLayerView {
        key: group.key.clone(),
        label: group.label.clone(),
        icon: icons.resolve(group),
        visible: group.visible,
        markers: group
            .markers
            .iter()
            .map(|marker| MarkerView {
                lat_lng: marker.lat_lng(),
                label: marker.label.clone(),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::build;
    use crate::taxonomy::Taxonomy;
    use serde_json::json;

    fn sample_tree() -> LayerTree {
        build(
            &json!({
                "litter": {"Metal_SodaCan": [{"x": 10, "y": 20}]},
                "goop": [{"x": 5, "y": 6, "amount": 3}]
            }),
            Taxonomy::loddlenaut(),
        )
    }

    #[test]
    fn test_without_tree_only_tile_overlays() {
        let control = OverlayControl::new(&MapConfig::default(), &IconConfig::default(), None);

        assert_eq!(control.overlays.len(), 1);
        assert_eq!(control.overlays[0].label, "Inside/Underneath");
        assert_eq!(control.overlays[0].layer.as_deref(), Some("tile:hollow"));
        assert!(control.layers.is_empty());
        assert!(control.collapsed);
    }

    #[test]
    fn test_tree_mirrors_layers() {
        let tree = sample_tree();
        let control = OverlayControl::new(&MapConfig::default(), &IconConfig::default(), Some(&tree));

        assert_eq!(control.overlays.len(), 2);
        let markers = &control.overlays[1];
        assert_eq!(markers.label, "Markers");
        assert_eq!(markers.select_all_checkbox, Some(true));
        assert!(markers.layer.is_none());

        let litter = &markers.children.as_ref().unwrap()[0];
        assert_eq!(litter.label, "Litter");
        let soda = &litter.children.as_ref().unwrap()[0];
        assert_eq!(soda.label, "Soda Cans");
        assert_eq!(soda.layer.as_deref(), Some("marker:Metal_SodaCan"));

        assert_eq!(control.layers.len(), tree.leaves().len());
    }

    #[test]
    fn test_marker_payloads() {
        let tree = sample_tree();
        let control = OverlayControl::new(&MapConfig::default(), &IconConfig::default(), Some(&tree));

        let soda = &control.layers["marker:Metal_SodaCan"];
        assert_eq!(soda.markers, vec![MarkerView { lat_lng: [20.0, 10.0], label: None }]);
        assert!(!soda.visible);

        let goop = &control.layers["marker:goop"];
        assert_eq!(goop.markers[0].label.as_deref(), Some("3"));
        assert!(matches!(goop.icon, IconSpec::Numbered { .. }));

        assert!(control.layers["marker:Tech_FuelCell"].markers.is_empty());
    }

    #[test]
    fn test_serialized_contract() {
        let tree = sample_tree();
        let control = OverlayControl::new(&MapConfig::default(), &IconConfig::default(), Some(&tree));
        let json = serde_json::to_value(&control).unwrap();

        let hollow = &json["overlays"][0];
        assert_eq!(hollow["label"], "Inside/Underneath");
        assert!(hollow.get("children").is_none());
        assert!(hollow.get("selectAllCheckbox").is_none());

        let markers = &json["overlays"][1];
        assert_eq!(markers["selectAllCheckbox"], true);
        assert!(markers.get("layer").is_none());
        assert_eq!(json["layers"]["marker:Metal_SodaCan"]["markers"][0]["latLng"], json!([20.0, 10.0]));
    }
}
