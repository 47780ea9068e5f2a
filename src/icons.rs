use crate::config::IconConfig;
use crate::registry::MarkerGroup;
use serde::Serialize;

/// How the display layer should draw a category's markers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum IconSpec {
    #[serde(rename_all = "camelCase")]
    Standard { url: String, retina_url: String },
    /// Single image of fixed size; each marker's label is drawn on top.
    Numbered { url: String, size: [u32; 2] },
}

impl IconConfig {
    pub fn resolve(&self, group: &MarkerGroup) -> IconSpec {
        let base = self.base_url.trim_end_matches('/');
        if group.numbered {
            IconSpec::Numbered {
                url: format!("{}/{}.png", base, group.icon),
                size: self.numbered_size,
            }
        } else {
            IconSpec::Standard {
                url: format!("{}/{}.png", base, group.icon),
                retina_url: format!("{}/{}@2x.png", base, group.icon),
            }
        }
    }
}
