//! Node relationship management.
//!
//! Relationships link a node to its source document and to its neighbours,
//! parent, and children, keyed by [`NodeRelationship`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Node relationship kinds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NodeRelationship {
    /// The node is the source document.
    Source,
    /// The node is the previous node in the document.
    Previous,
    /// The node is the next node in the document.
    Next,
    /// The node is the parent node in the document.
    Parent,
    /// The node is a child node in the document.
    Child,
}

/// Information about a related node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedNodeInfo {
    /// ID of the related node.
    pub node_id: String,
    /// Additional metadata for the relationship.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl RelatedNodeInfo {
    /// Create a new `RelatedNodeInfo`.
    pub fn new<S: Into<String>>(node_id: S) -> Self {
        Self {
            node_id: node_id.into(),
            metadata: HashMap::new(),
        }
    }

    /// Add metadata to the relationship.
    #[must_use]
    pub fn with_metadata<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<serde_json::Value>,
    {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A relationship target: one node, or several for [`NodeRelationship::Child`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelatedNodeType {
    /// Single related node.
    Single(RelatedNodeInfo),
    /// Multiple related nodes.
    Multiple(Vec<RelatedNodeInfo>),
}

impl RelatedNodeType {
    /// Get as a single node (returns `None` if multiple).
    pub fn as_single(&self) -> Option<&RelatedNodeInfo> {
        match self {
            Self::Single(info) => Some(info),
            Self::Multiple(_) => None,
        }
    }

    /// Get all related nodes as a slice-like vector of references.
    pub fn all(&self) -> Vec<&RelatedNodeInfo> {
        match self {
            Self::Single(info) => vec![info],
            Self::Multiple(infos) => infos.iter().collect(),
        }
    }
}

/// Relationship map of a node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeRelationships {
    relationships: HashMap<NodeRelationship, RelatedNodeType>,
}

impl NodeRelationships {
    /// Create an empty relationship map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a single-node relationship, replacing any previous value.
    pub fn set(&mut self, kind: NodeRelationship, info: RelatedNodeInfo) {
        self.relationships
            .insert(kind, RelatedNodeType::Single(info));
    }

    /// Append a child relationship.
    pub fn add_child(&mut self, info: RelatedNodeInfo) {
        match self.relationships.get_mut(&NodeRelationship::Child) {
            Some(RelatedNodeType::Multiple(children)) => children.push(info),
            Some(RelatedNodeType::Single(existing)) => {
                let existing = existing.clone();
                self.relationships.insert(
                    NodeRelationship::Child,
                    RelatedNodeType::Multiple(vec![existing, info]),
                );
            }
            None => {
                self.relationships.insert(
                    NodeRelationship::Child,
                    RelatedNodeType::Multiple(vec![info]),
                );
            }
        }
    }

    /// Look up a relationship by kind.
    pub fn get(&self, kind: NodeRelationship) -> Option<&RelatedNodeType> {
        self.relationships.get(&kind)
    }

    /// Source document, if recorded.
    pub fn source(&self) -> Option<&RelatedNodeInfo> {
        self.get(NodeRelationship::Source)?.as_single()
    }

    /// Previous node, if recorded.
    pub fn previous(&self) -> Option<&RelatedNodeInfo> {
        self.get(NodeRelationship::Previous)?.as_single()
    }

    /// Next node, if recorded.
    pub fn next(&self) -> Option<&RelatedNodeInfo> {
        self.get(NodeRelationship::Next)?.as_single()
    }

    /// Parent node, if recorded.
    pub fn parent(&self) -> Option<&RelatedNodeInfo> {
        self.get(NodeRelationship::Parent)?.as_single()
    }

    /// Child nodes; empty when none are recorded.
    pub fn children(&self) -> Vec<&RelatedNodeInfo> {
        self.get(NodeRelationship::Child)
            .map(RelatedNodeType::all)
            .unwrap_or_default()
    }

    /// Number of relationship kinds recorded.
    pub fn len(&self) -> usize {
        self.relationships.len()
    }

    /// Whether no relationships are recorded.
    pub fn is_empty(&self) -> bool {
        self.relationships.is_empty()
    }
}
