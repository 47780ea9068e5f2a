use crate::error::DocumentError;
use crate::registry::{build_with_stats, LayerTree};
use crate::taxonomy::Taxonomy;
use serde_json::Value;
use std::path::Path;
use tracing::{error, info};

/// Reads the marker document. The top level must be an object; everything
/// below it is checked lazily by the builder.
pub async fn load_document(path: &Path) -> Result<Value, DocumentError> {
    info!("Loading marker document from {:?}...", path);
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| DocumentError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    parse_document(&content)
}

pub fn parse_document(content: &str) -> Result<Value, DocumentError> {
    let document: Value = serde_json::from_str(content)?;
    if !document.is_object() {
        return Err(DocumentError::NotAnObject);
    }
    Ok(document)
}

/// Loads and builds in one step. Either the whole tree comes back or, on
/// any load failure, nothing does.
pub async fn load_layer_tree(path: &Path, taxonomy: &Taxonomy) -> Option<LayerTree> {
    match load_document(path).await {
        Ok(document) => {
            let (tree, stats) = build_with_stats(&document, taxonomy);
            info!(
                "Loaded {} markers across {} categories",
                stats.markers,
                tree.leaves().len()
            );
            Some(tree)
        }
        Err(e) => {
            error!("Marker layers unavailable: {}", e);
            None
        }
    }
}
