//! Typed errors for the document loader, taxonomy and layer tree.

use std::path::PathBuf;
use thiserror::Error;

/// Errors while loading the raw marker document.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Failed to read marker document {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse marker document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Marker document must be a JSON object")]
    NotAnObject,
}

/// Errors in a taxonomy definition.
#[derive(Debug, Error)]
pub enum TaxonomyError {
    #[error("Duplicate leaf key: {0}")]
    DuplicateKey(String),

    #[error("Leaf {0} has an empty data path")]
    EmptyPath(String),

    #[error("Label {0:?} appears more than once among siblings")]
    DuplicateLabel(String),

    #[error("Group {0} has no children")]
    EmptyGroup(String),

    #[error("Failed to read taxonomy {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse taxonomy: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Errors addressing a node of a built layer tree.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("No layer at path {0:?}")]
    NotFound(Vec<String>),

    #[error("Group at path {0:?} has no select-all control")]
    NotToggleable(Vec<String>),
}
