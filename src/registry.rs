//! Builds the layer tree: one toggleable marker group per taxonomy leaf,
//! arranged in the taxonomy's shape.

use crate::error::TreeError;
use crate::taxonomy::{LeafCategory, Taxonomy, TaxonomyNode};
use crate::types::{parse_record, Marker};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

/// The realized markers of one leaf category.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerGroup {
    pub key: String,
    pub label: String,
    pub icon: String,
    pub numbered: bool,
    pub markers: Vec<Marker>,
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LayerNode {
    Leaf(MarkerGroup),
    Group {
        label: String,
        select_all: bool,
        children: Vec<LayerNode>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayerTree {
    pub roots: Vec<LayerNode>,
}

/// State of a node's checkbox. Groups are `Partial` when only some
/// descendant leaves are shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Visible,
    Hidden,
    Partial,
}

/// Labels only; used to compare tree shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shape {
    Leaf(String),
    Group(String, Vec<Shape>),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildStats {
    /// Elements found under resolved paths.
    pub records: usize,
    pub markers: usize,
    pub dropped: usize,
    /// Leaf keys whose path did not resolve to an array.
    pub missing_paths: Vec<String>,
}

pub fn build(document: &Value, taxonomy: &Taxonomy) -> LayerTree {
    build_with_stats(document, taxonomy).0
}

pub fn build_with_stats(document: &Value, taxonomy: &Taxonomy) -> (LayerTree, BuildStats) {
    let mut stats = BuildStats::default();
    let roots = taxonomy
        .roots
        .iter()
        .map(|node| build_node(node, document, &mut stats))
        .collect();

    info!(
        "Built layer tree: {} markers from {} records ({} dropped, {} empty paths)",
        stats.markers,
        stats.records,
        stats.dropped,
        stats.missing_paths.len()
    );

    (LayerTree { roots }, stats)
}

fn build_node(node: &TaxonomyNode, document: &Value, stats: &mut BuildStats) -> LayerNode {
    match node {
        TaxonomyNode::Leaf(leaf) => LayerNode::Leaf(build_leaf(leaf, document, stats)),
        TaxonomyNode::Group(group) => LayerNode::Group {
            label: group.label.clone(),
            select_all: group.select_all,
            children: group
                .children
                .iter()
                .map(|child| build_node(child, document, stats))
                .collect(),
        },
    }
}

fn resolve<'a>(document: &'a Value, path: &[String]) -> Option<&'a Value> {
    path.iter().try_fold(document, |node, field| node.get(field.as_str()))
}

fn build_leaf(leaf: &LeafCategory, document: &Value, stats: &mut BuildStats) -> MarkerGroup {
    let mut markers = Vec::new();

    match resolve(document, &leaf.path) {
        Some(Value::Array(records)) => {
            stats.records += records.len();
            for (i, record) in records.iter().enumerate() {
                match parse_record(record, leaf.numbered) {
                    Ok(marker) => markers.push(marker),
                    Err(defect) => {
                        warn!("Dropping {} record {}: {:?}", leaf.key, i, defect);
                        stats.dropped += 1;
                    }
                }
            }
        }
        Some(other) => {
            warn!(
                "Path {:?} for {} is not an array ({}), leaving it empty",
                leaf.path,
                leaf.key,
                type_name(other)
            );
            stats.missing_paths.push(leaf.key.clone());
        }
        None => {
            debug!("No records for {} at {:?}", leaf.key, leaf.path);
            stats.missing_paths.push(leaf.key.clone());
        }
    }

    stats.markers += markers.len();

    MarkerGroup {
        key: leaf.key.clone(),
        label: leaf.label.clone(),
        icon: leaf.icon_key().to_string(),
        numbered: leaf.numbered,
        markers,
        visible: false,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl LayerNode {
    pub fn label(&self) -> &str {
        match self {
            LayerNode::Leaf(group) => &group.label,
            LayerNode::Group { label, .. } => label,
        }
    }

    /// Descendant marker groups in declared order; a leaf yields itself.
    pub fn leaves(&self) -> Vec<&MarkerGroup> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a MarkerGroup>) {
        match self {
            LayerNode::Leaf(group) => out.push(group),
            LayerNode::Group { children, .. } => {
                for child in children {
                    child.collect_leaves(out);
                }
            }
        }
    }

    /// Union of all descendant markers. Groups store none of their own.
    pub fn markers(&self) -> impl Iterator<Item = &Marker> + '_ {
        self.leaves().into_iter().flat_map(|group| group.markers.iter())
    }

    pub fn visible_markers(&self) -> impl Iterator<Item = &Marker> + '_ {
        self.leaves()
            .into_iter()
            .filter(|group| group.visible)
            .flat_map(|group| group.markers.iter())
    }

    pub fn visibility(&self) -> Visibility {
        let leaves = self.leaves();
        let shown = leaves.iter().filter(|g| g.visible).count();
        if shown == 0 {
            Visibility::Hidden
        } else if shown == leaves.len() {
            Visibility::Visible
        } else {
            Visibility::Partial
        }
    }

    /// Sets the flag on this leaf, or on every leaf below this group.
    pub fn set_visible(&mut self, visible: bool) {
        match self {
            LayerNode::Leaf(group) => group.visible = visible,
            LayerNode::Group { children, .. } => {
                for child in children {
                    child.set_visible(visible);
                }
            }
        }
    }

    pub fn shape(&self) -> Shape {
        match self {
            LayerNode::Leaf(group) => Shape::Leaf(group.label.clone()),
            LayerNode::Group { label, children, .. } => {
                Shape::Group(label.clone(), children.iter().map(LayerNode::shape).collect())
            }
        }
    }
}

fn find_in<'a, S: AsRef<str>>(nodes: &'a [LayerNode], path: &[S]) -> Option<&'a LayerNode> {
    let (first, rest) = path.split_first()?;
    let node = nodes.iter().find(|n| n.label() == first.as_ref())?;
    if rest.is_empty() {
        return Some(node);
    }
    match node {
        LayerNode::Group { children, .. } => find_in(children, rest),
        LayerNode::Leaf(_) => None,
    }
}

fn find_in_mut<'a, S: AsRef<str>>(
    nodes: &'a mut [LayerNode],
    path: &[S],
) -> Option<&'a mut LayerNode> {
    let (first, rest) = path.split_first()?;
    let node = nodes.iter_mut().find(|n| n.label() == first.as_ref())?;
    if rest.is_empty() {
        return Some(node);
    }
    match node {
        LayerNode::Group { children, .. } => find_in_mut(children, rest),
        LayerNode::Leaf(_) => None,
    }
}

impl LayerTree {
    /// Looks a node up by its label path from the roots.
    pub fn find<S: AsRef<str>>(&self, path: &[S]) -> Option<&LayerNode> {
        find_in(&self.roots, path)
    }

    pub fn set_visible<S: AsRef<str>>(
        &mut self,
        path: &[S],
        visible: bool,
    ) -> Result<Visibility, TreeError> {
        let owned = || -> Vec<String> { path.iter().map(|s| s.as_ref().to_string()).collect() };
        let node = find_in_mut(&mut self.roots, path)
            .ok_or_else(|| TreeError::NotFound(owned()))?;
        if let LayerNode::Group { select_all: false, .. } = node {
            return Err(TreeError::NotToggleable(owned()));
        }
        node.set_visible(visible);
        Ok(node.visibility())
    }

    pub fn leaves(&self) -> Vec<&MarkerGroup> {
        let mut out = Vec::new();
        for root in &self.roots {
            root.collect_leaves(&mut out);
        }
        out
    }

    pub fn leaf(&self, key: &str) -> Option<&MarkerGroup> {
        self.leaves().into_iter().find(|group| group.key == key)
    }

    pub fn total_markers(&self) -> usize {
        self.leaves().iter().map(|group| group.markers.len()).sum()
    }

    pub fn leaf_counts(&self) -> Vec<(&str, usize)> {
        self.leaves()
            .into_iter()
            .map(|group| (group.key.as_str(), group.markers.len()))
            .collect()
    }

    pub fn visible_markers(&self) -> impl Iterator<Item = &Marker> + '_ {
        self.roots.iter().flat_map(|node| node.visible_markers())
    }

    pub fn shape(&self) -> Vec<Shape> {
        self.roots.iter().map(LayerNode::shape).collect()
    }
}

/// The shape every tree built from `taxonomy` must have.
pub fn taxonomy_shape(taxonomy: &Taxonomy) -> Vec<Shape> {
    fn shape(node: &TaxonomyNode) -> Shape {
        match node {
            TaxonomyNode::Leaf(leaf) => Shape::Leaf(leaf.label.clone()),
            TaxonomyNode::Group(group) => {
                Shape::Group(group.label.clone(), group.children.iter().map(shape).collect())
            }
        }
    }
    taxonomy.roots.iter().map(shape).collect()
}
