//! The category taxonomy: which leaf categories exist, where their records
//! live in the marker document and how they are grouped for toggling.

use crate::error::TaxonomyError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Taxonomy {
    pub roots: Vec<TaxonomyNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaxonomyNode {
    Leaf(LeafCategory),
    Group(TaxonomyGroup),
}

/// A concrete item type with its own marker group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeafCategory {
    pub key: String,
    /// Field accessors from the document root to the record array.
    pub path: Vec<String>,
    pub label: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub numbered: bool,
}

impl LeafCategory {
    pub fn icon_key(&self) -> &str {
        self.icon.as_deref().unwrap_or(&self.key)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxonomyGroup {
    pub label: String,
    #[serde(default)]
    pub select_all: bool,
    pub children: Vec<TaxonomyNode>,
}

// (document key, label) for categories nested one level under a section.
const LITTER: &[(&str, &str)] = &[
    ("Metal_SodaCan", "Soda Cans"),
    ("Metal_FoodCan", "Food Cans"),
    ("Metal_SoupCan", "Soup Cans"),
    ("Metal_MetalBolt", "Metal Bolts"),
    ("Metal_ScrapMetal", "Scrap Metal"),
    ("Glass_GlassBottle", "Glass Bottles"),
    ("Glass_FancyBottle", "Fancy Bottles"),
    ("Glass_GlassJar", "Glass Jars"),
    ("Glass_MiniJar", "Glass Mini Jars"),
    ("Plastic_SixPackRings", "Plastic Rings"),
    ("Plastic_SodaBottle", "Soda Bottles"),
    ("Plastic_DrinkCup", "GUP-Cups"),
    ("Plastic_ClamshellContainer", "Clamshells"),
    ("Plastic_UtilityJug", "Plastic Jugs"),
    ("Tech_Battery", "Batteries"),
    ("Tech_FuelCell", "Fuel Cells"),
    ("Tech_Phone", "Phones"),
    ("Tech_Laptop", "Laptops"),
];

const MATERIAL_BITS: &[(&str, &str)] = &[
    ("MetalBit", "Metal Bits"),
    ("GlassBit", "Glass Bits"),
    ("PlasticBit", "Plastic Bits"),
    ("TechBit", "Tech Bits"),
    ("OrganicBit", "Organic Bits"),
];

const CRATES: &[(&str, &str)] = &[
    ("CrateRed", "Red Crates"),
    ("CrateGreen", "Green Crates"),
    ("CrateTeal", "Teal Crates"),
    ("CrateYellow", "Yellow Crates"),
    ("CrateGray", "Gray Crates"),
];

const PLANTS: &[(&str, &str)] = &[
    ("CoralPear", "Coral Pears"),
    ("TubeyMelon", "Tubey Melons"),
    ("LilyBanana", "Lily Bananas"),
    ("LotusKiwi", "Lotus Kiwis"),
    ("KelpHeart", "Kelp Hearts"),
    ("StarKelp", "Star Kelp"),
    ("RainbowStarKelp", "Rainbow Star Kelp"),
    ("PearlBerries", "Pearl Berries"),
    ("PassionFig", "Passion Figs"),
    ("CrystalCrisp", "Crystal Crisps"),
    ("EnergyPlant", "Energy Plants"),
];

// (section label, document key, categories)
const SECTIONS: &[(&str, &str, &[(&str, &str)])] = &[
    ("Litter", "litter", LITTER),
    ("Material Bits", "materialbits", MATERIAL_BITS),
    ("Crates", "crates", CRATES),
    ("Plants", "plants", PLANTS),
];

// (document key, label, numbered) for top-level record arrays.
const FLAT: &[(&str, &str, bool)] = &[
    ("trashbags", "Trash Bags", false),
    ("microplastics", "Microplastics", true),
    ("goop", "Goop", true),
    ("flatgoop", "Flat Goop", true),
    ("holobadges", "Holo-Badges", false),
    ("loddles", "Loddles", false),
    ("nests", "Nests", false),
    ("seedlingplots", "Seedling Plots", false),
    ("teleport", "Ship Teleports", false),
];

static LODDLENAUT: OnceLock<Taxonomy> = OnceLock::new();

impl TaxonomyNode {
    pub fn label(&self) -> &str {
        match self {
            TaxonomyNode::Leaf(leaf) => &leaf.label,
            TaxonomyNode::Group(group) => &group.label,
        }
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a LeafCategory>) {
        match self {
            TaxonomyNode::Leaf(leaf) => out.push(leaf),
            TaxonomyNode::Group(group) => {
                for child in &group.children {
                    child.collect_leaves(out);
                }
            }
        }
    }
}

impl Taxonomy {
    /// The game map's taxonomy, built on first use.
    pub fn loddlenaut() -> &'static Taxonomy {
        LODDLENAUT.get_or_init(build_loddlenaut)
    }

    pub fn load_from_file(path: &Path) -> Result<Self, TaxonomyError> {
        let content = std::fs::read_to_string(path).map_err(|source| TaxonomyError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let taxonomy: Taxonomy = toml::from_str(&content)?;
        taxonomy.validate()?;
        Ok(taxonomy)
    }

    /// All leaves, depth-first in declared order.
    pub fn leaves(&self) -> Vec<&LeafCategory> {
        let mut out = Vec::new();
        for root in &self.roots {
            root.collect_leaves(&mut out);
        }
        out
    }

    pub fn leaf(&self, key: &str) -> Option<&LeafCategory> {
        self.leaves().into_iter().find(|leaf| leaf.key == key)
    }

    /// Leaf keys must be unique tree-wide and labels unique among siblings,
    /// since toggles address nodes by label path.
    pub fn validate(&self) -> Result<(), TaxonomyError> {
        unique_labels(&self.roots)?;
        let mut stack: Vec<&TaxonomyNode> = self.roots.iter().collect();
        let mut seen = HashSet::new();

        while let Some(node) = stack.pop() {
            match node {
                TaxonomyNode::Leaf(leaf) => {
                    if leaf.path.is_empty() {
                        return Err(TaxonomyError::EmptyPath(leaf.key.clone()));
                    }
                    if !seen.insert(leaf.key.as_str()) {
                        return Err(TaxonomyError::DuplicateKey(leaf.key.clone()));
                    }
                }
                TaxonomyNode::Group(group) => {
                    if group.children.is_empty() {
                        return Err(TaxonomyError::EmptyGroup(group.label.clone()));
                    }
                    unique_labels(&group.children)?;
                    stack.extend(group.children.iter());
                }
            }
        }

        Ok(())
    }
}

fn unique_labels(siblings: &[TaxonomyNode]) -> Result<(), TaxonomyError> {
    let mut labels = HashSet::new();
    for node in siblings {
        if !labels.insert(node.label()) {
            return Err(TaxonomyError::DuplicateLabel(node.label().to_string()));
        }
    }
    Ok(())
}

fn leaf(key: &str, path: &[&str], label: &str, numbered: bool) -> TaxonomyNode {
    TaxonomyNode::Leaf(LeafCategory {
        key: key.to_string(),
        path: path.iter().map(|s| s.to_string()).collect(),
        label: label.to_string(),
        icon: None,
        numbered,
    })
}

fn build_loddlenaut() -> Taxonomy {
    let mut children: Vec<TaxonomyNode> = SECTIONS
        .iter()
        .map(|(label, section, entries)| {
            TaxonomyNode::Group(TaxonomyGroup {
                label: label.to_string(),
                select_all: true,
                children: entries
                    .iter()
                    .map(|(key, label)| leaf(key, &[*section, *key], label, false))
                    .collect(),
            })
        })
        .collect();

    children.extend(
        FLAT.iter()
            .map(|(key, label, numbered)| leaf(key, &[*key], label, *numbered)),
    );

    Taxonomy {
        roots: vec![TaxonomyNode::Group(TaxonomyGroup {
            label: "Markers".to_string(),
            select_all: true,
            children,
        })],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builtin_taxonomy_is_valid() {
        let taxonomy = Taxonomy::loddlenaut();
        taxonomy.validate().unwrap();
        assert_eq!(taxonomy.leaves().len(), 18 + 5 + 5 + 11 + 9);
    }

    #[test]
    fn test_builtin_taxonomy_shape() {
        let taxonomy = Taxonomy::loddlenaut();
        assert_eq!(taxonomy.roots.len(), 1);

        let TaxonomyNode::Group(markers) = &taxonomy.roots[0] else {
            panic!("root should be a group");
        };
        assert_eq!(markers.label, "Markers");
        assert!(markers.select_all);

        let labels: Vec<&str> = markers.children.iter().map(|c| c.label()).collect();
        assert_eq!(
            labels,
            vec![
                "Litter", "Material Bits", "Crates", "Plants", "Trash Bags",
                "Microplastics", "Goop", "Flat Goop", "Holo-Badges", "Loddles",
                "Nests", "Seedling Plots", "Ship Teleports",
            ]
        );
    }

    #[test]
    fn test_builtin_leaf_paths() {
        let taxonomy = Taxonomy::loddlenaut();

        let soda = taxonomy.leaf("Metal_SodaCan").unwrap();
        assert_eq!(soda.path, vec!["litter", "Metal_SodaCan"]);
        assert_eq!(soda.label, "Soda Cans");
        assert!(!soda.numbered);

        let goop = taxonomy.leaf("goop").unwrap();
        assert_eq!(goop.path, vec!["goop"]);
        assert!(goop.numbered);

        let fuel = taxonomy.leaf("Tech_FuelCell").unwrap();
        assert_eq!(fuel.label, "Fuel Cells");

        let numbered: Vec<&str> = taxonomy
            .leaves()
            .into_iter()
            .filter(|l| l.numbered)
            .map(|l| l.key.as_str())
            .collect();
        assert_eq!(numbered, vec!["microplastics", "goop", "flatgoop"]);
    }

    #[test]
    fn test_icon_defaults_to_key() {
        let taxonomy = Taxonomy::loddlenaut();
        assert_eq!(taxonomy.leaf("CrateRed").unwrap().icon_key(), "CrateRed");
    }

    #[test]
    fn test_validate_rejects_duplicates() {
        let taxonomy = Taxonomy {
            roots: vec![leaf("a", &["a"], "A", false), leaf("a", &["b"], "B", false)],
        };
        assert!(matches!(taxonomy.validate(), Err(TaxonomyError::DuplicateKey(k)) if k == "a"));
    }

    #[test]
    fn test_validate_rejects_sibling_labels() {
        let taxonomy = Taxonomy {
            roots: vec![leaf("a", &["a"], "Same", false), leaf("b", &["b"], "Same", false)],
        };
        assert!(matches!(taxonomy.validate(), Err(TaxonomyError::DuplicateLabel(l)) if l == "Same"));

        let nested = Taxonomy {
            roots: vec![TaxonomyNode::Group(TaxonomyGroup {
                label: "G".to_string(),
                select_all: true,
                children: vec![leaf("a", &["a"], "Same", false), leaf("b", &["b"], "Same", false)],
            })],
        };
        assert!(matches!(nested.validate(), Err(TaxonomyError::DuplicateLabel(_))));

        // the same label under different parents is fine
        let cousins = Taxonomy {
            roots: vec![
                TaxonomyNode::Group(TaxonomyGroup {
                    label: "G1".to_string(),
                    select_all: true,
                    children: vec![leaf("a", &["a"], "Same", false)],
                }),
                TaxonomyNode::Group(TaxonomyGroup {
                    label: "G2".to_string(),
                    select_all: true,
                    children: vec![leaf("b", &["b"], "Same", false)],
                }),
            ],
        };
        cousins.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_empty_path_and_group() {
        let taxonomy = Taxonomy { roots: vec![leaf("a", &[], "A", false)] };
        assert!(matches!(taxonomy.validate(), Err(TaxonomyError::EmptyPath(_))));

        let taxonomy = Taxonomy {
            roots: vec![TaxonomyNode::Group(TaxonomyGroup {
                label: "Empty".to_string(),
                select_all: true,
                children: vec![],
            })],
        };
        assert!(matches!(taxonomy.validate(), Err(TaxonomyError::EmptyGroup(_))));
    }

    #[test]
    fn test_load_from_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
            [[roots]]
            kind = "group"
            label = "Markers"
            select_all = true

            [[roots.children]]
            kind = "leaf"
            key = "goop"
            path = ["goop"]
            label = "Goop"
            numbered = true

            [[roots.children]]
            kind = "leaf"
            key = "CrateRed"
            path = ["crates", "CrateRed"]
            label = "Red Crates"
            icon = "crate-red"
            "#
        )
        .unwrap();

        let taxonomy = Taxonomy::load_from_file(file.path()).unwrap();
        let leaves = taxonomy.leaves();
        assert_eq!(leaves.len(), 2);
        assert!(leaves[0].numbered);
        assert_eq!(leaves[1].icon_key(), "crate-red");
    }

    #[test]
    fn test_load_missing_file() {
        let err = Taxonomy::load_from_file(Path::new("/nonexistent/taxonomy.toml")).unwrap_err();
        assert!(matches!(err, TaxonomyError::Read { .. }));
    }
}
