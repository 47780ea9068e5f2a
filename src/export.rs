use crate::registry::{LayerTree, MarkerGroup};
use crate::types::Marker;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};

fn marker_feature(group: &MarkerGroup, marker: &Marker) -> Feature {
    let mut properties = JsonObject::new();
    properties.insert("category".to_string(), group.key.clone().into());
    properties.insert("label".to_string(), group.label.clone().into());
    if let Some(amount) = &marker.label {
        properties.insert("amount".to_string(), amount.clone().into());
    }

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::Point(vec![marker.x, marker.y]))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

pub fn leaf_feature_collection(group: &MarkerGroup) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features: group
            .markers
            .iter()
            .map(|marker| marker_feature(group, marker))
            .collect(),
        foreign_members: None,
    }
}

/// Every marker in the tree, leaf by leaf in declared order.
pub fn tree_feature_collection(tree: &LayerTree) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features: tree
            .leaves()
            .into_iter()
            .flat_map(|group| {
                group
                    .markers
                    .iter()
                    .map(move |marker| marker_feature(group, marker))
            })
            .collect(),
        foreign_members: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::build;
    use crate::taxonomy::Taxonomy;
    use serde_json::json;

    fn tree() -> LayerTree {
        build(
            &json!({
                "crates": {"CrateRed": [{"x": 3, "y": 4}]},
                "flatgoop": [{"x": 1, "y": 2, "amount": 9}, {"x": 8, "y": 9, "amount": 1}]
            }),
            Taxonomy::loddlenaut(),
        )
    }

    #[test]
    fn test_leaf_collection() {
        let tree = tree();
        let fc = leaf_feature_collection(tree.leaf("flatgoop").unwrap());

        assert_eq!(fc.features.len(), 2);
        let first = &fc.features[0];
        assert_eq!(
            first.geometry.as_ref().unwrap().value,
            Value::Point(vec![1.0, 2.0])
        );
        assert_eq!(first.property("amount"), Some(&json!("9")));
        assert_eq!(first.property("category"), Some(&json!("flatgoop")));
    }

    #[test]
    fn test_tree_collection() {
        let tree = tree();
        let fc = tree_feature_collection(&tree);

        assert_eq!(fc.features.len(), tree.total_markers());
        // crates come before flat leaves in the taxonomy
        assert_eq!(fc.features[0].property("label"), Some(&json!("Red Crates")));
        assert!(fc.features[0].property("amount").is_none());
    }

    #[test]
    fn test_serializes_as_feature_collection() {
        let json = serde_json::to_value(tree_feature_collection(&tree())).unwrap();
        assert_eq!(json["type"], "FeatureCollection");
        assert_eq!(json["features"][0]["geometry"]["type"], "Point");
    }
}
