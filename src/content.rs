//! Node content lookup.
//!
//! The review core only needs read-only node metadata to decorate due
//! reviews. [`Catalog`] is a static implementation that can be loaded from a
//! TOML file:
//!
//! ```toml
//! [[node]]
//! id = "armbar"
//! name = "Armbar from guard"
//! difficulty = "intermediate"
//! order = 4
//! xp_reward = 50
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::{validate_id, Node};
use crate::error::{Result, ReviewError};

/// Read-only lookup of node metadata.
pub trait ContentStore: Send + Sync {
    /// Look up a node by id. Returns `Ok(None)` for unknown nodes.
    fn node(&self, node_id: &str) -> Result<Option<Node>>;
}

impl<T: ContentStore + ?Sized> ContentStore for Arc<T> {
    fn node(&self, node_id: &str) -> Result<Option<Node>> {
        (**self).node(node_id)
    }
}

/// On-disk catalog format.
#[derive(Debug, Default, Serialize, Deserialize)]
struct CatalogFile {
    #[serde(default, rename = "node")]
    nodes: Vec<Node>,
}

/// Static in-memory node catalog.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    nodes: HashMap<String, Node>,
}

impl Catalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from nodes. Later duplicates replace earlier ones.
    pub fn from_nodes(nodes: impl IntoIterator<Item = Node>) -> Self {
        let mut catalog = Self::new();
        for node in nodes {
            catalog.insert(node);
        }
        catalog
    }

    /// Parse a catalog from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        let file: CatalogFile = toml::from_str(content)
            .map_err(|e| ReviewError::config(format!("invalid catalog: {}", e)))?;
        for node in &file.nodes {
            validate_id(&node.id)?;
        }
        Ok(Self::from_nodes(file.nodes))
    }

    /// Load a catalog from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| ReviewError::storage(path, e))?;
        Self::from_toml(&content)
    }

    /// Add or replace a node.
    pub fn insert(&mut self, node: Node) {
        self.nodes.insert(node.id.clone(), node);
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the catalog has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl ContentStore for Catalog {
    fn node(&self, node_id: &str) -> Result<Option<Node>> {
        Ok(self.nodes.get(node_id).cloned())
    }
}
