//! Text nodes and scored nodes.
//!
//! A [`TextNode`] is the unit of retrievable text flowing through the
//! postprocessing pipeline. A [`NodeWithScore`] pairs a node with a score
//! whose meaning depends on the channel that produced it: retrieval yields
//! similarity-like scores, LLM reranking overwrites them with judge scores,
//! and reordering preserves them. Scores from different channels are not
//! comparable.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::relationships::{NodeRelationship, NodeRelationships, RelatedNodeInfo};
use crate::{RaglineError, Result};

/// Metadata mode for controlling which metadata is rendered with the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetadataMode {
    /// Include all metadata.
    All,
    /// Include only metadata suitable for embeddings.
    Embed,
    /// Include only metadata suitable for the LLM.
    Llm,
    /// Include no metadata.
    None,
}

/// A unit of retrievable text with identity, content, and metadata.
///
/// The `id` is stable for the lifetime of the node and uniquely identifies it
/// within one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextNode {
    /// Unique identifier for the node.
    pub id: String,

    /// Text content of the node.
    pub text: String,

    /// Scalar or string metadata.
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,

    /// Structured relationships to other nodes.
    #[serde(default)]
    pub relationships: NodeRelationships,

    /// Metadata keys hidden from embedding text.
    #[serde(default, skip_serializing_if = "HashSet::is_empty")]
    pub excluded_embed_metadata_keys: HashSet<String>,

    /// Metadata keys hidden from LLM prompts.
    #[serde(default, skip_serializing_if = "HashSet::is_empty")]
    pub excluded_llm_metadata_keys: HashSet<String>,
}

impl TextNode {
    /// Create a node with a freshly generated id.
    pub fn new<S: Into<String>>(text: S) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), text)
    }

    /// Create a node with an explicit id.
    pub fn with_id<I: Into<String>, S: Into<String>>(id: I, text: S) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            metadata: HashMap::new(),
            relationships: NodeRelationships::new(),
            excluded_embed_metadata_keys: HashSet::new(),
            excluded_llm_metadata_keys: HashSet::new(),
        }
    }

    /// Create a builder for constructing nodes with a fluent API.
    #[must_use]
    pub fn builder() -> TextNodeBuilder {
        TextNodeBuilder::default()
    }

    /// Add or update metadata for this node.
    #[must_use]
    pub fn with_metadata<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<serde_json::Value>,
    {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Record a single-node relationship.
    #[must_use]
    pub fn with_relationship(mut self, kind: NodeRelationship, info: RelatedNodeInfo) -> Self {
        if kind == NodeRelationship::Child {
            self.relationships.add_child(info);
        } else {
            self.relationships.set(kind, info);
        }
        self
    }

    /// Get a metadata value as a string, if it is one.
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key)?.as_str()
    }

    /// Render the metadata visible under `mode` as `key: value` lines,
    /// sorted by key.
    pub fn get_metadata_str(&self, mode: MetadataMode) -> String {
        let excluded = match mode {
            MetadataMode::None => return String::new(),
            MetadataMode::All => None,
            MetadataMode::Embed => Some(&self.excluded_embed_metadata_keys),
            MetadataMode::Llm => Some(&self.excluded_llm_metadata_keys),
        };

        let mut keys: Vec<&String> = self
            .metadata
            .keys()
            .filter(|key| excluded.is_none_or(|set| !set.contains(*key)))
            .collect();
        keys.sort();

        keys.into_iter()
            .map(|key| {
                let value = &self.metadata[key];
                match value.as_str() {
                    Some(s) => format!("{key}: {s}"),
                    None => format!("{key}: {value}"),
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Text with visible metadata prepended.
    pub fn get_content(&self, mode: MetadataMode) -> String {
        let metadata_str = self.get_metadata_str(mode);
        if metadata_str.is_empty() {
            self.text.clone()
        } else {
            format!("{metadata_str}\n\n{}", self.text)
        }
    }
}

impl std::fmt::Display for TextNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let preview: String = self.text.chars().take(100).collect();
        let ellipsis = if self.text.chars().count() > 100 { "..." } else { "" };
        write!(f, "Node ID: {}\nText: {preview}{ellipsis}", self.id)
    }
}

/// Builder for [`TextNode`].
#[derive(Debug, Default)]
pub struct TextNodeBuilder {
    id: Option<String>,
    text: Option<String>,
    metadata: HashMap<String, serde_json::Value>,
    relationships: NodeRelationships,
    excluded_embed_metadata_keys: HashSet<String>,
    excluded_llm_metadata_keys: HashSet<String>,
}

impl TextNodeBuilder {
    /// Set the node id. A UUID is generated when absent.
    #[must_use]
    pub fn id<S: Into<String>>(mut self, id: S) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the node text.
    #[must_use]
    pub fn text<S: Into<String>>(mut self, text: S) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Add metadata.
    #[must_use]
    pub fn metadata<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<serde_json::Value>,
    {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Add a relationship.
    #[must_use]
    pub fn relationship(mut self, kind: NodeRelationship, info: RelatedNodeInfo) -> Self {
        if kind == NodeRelationship::Child {
            self.relationships.add_child(info);
        } else {
            self.relationships.set(kind, info);
        }
        self
    }

    /// Hide a metadata key from embedding text.
    #[must_use]
    pub fn exclude_embed_metadata<S: Into<String>>(mut self, key: S) -> Self {
        self.excluded_embed_metadata_keys.insert(key.into());
        self
    }

    /// Hide a metadata key from LLM prompts.
    #[must_use]
    pub fn exclude_llm_metadata<S: Into<String>>(mut self, key: S) -> Self {
        self.excluded_llm_metadata_keys.insert(key.into());
        self
    }

    /// Build the node.
    pub fn build(self) -> Result<TextNode> {
        let text = self
            .text
            .ok_or_else(|| RaglineError::validation("node text is required"))?;
        let id = self.id.unwrap_or_else(|| Uuid::new_v4().to_string());
        if id.is_empty() {
            return Err(RaglineError::validation("node id must not be empty"));
        }

        Ok(TextNode {
            id,
            text,
            metadata: self.metadata,
            relationships: self.relationships,
            excluded_embed_metadata_keys: self.excluded_embed_metadata_keys,
            excluded_llm_metadata_keys: self.excluded_llm_metadata_keys,
        })
    }
}

/// A node with an associated score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeWithScore {
    /// The node.
    pub node: TextNode,

    /// Channel-dependent score (higher is better within one channel).
    pub score: f32,
}

impl NodeWithScore {
    /// Create a new scored node.
    pub fn new(node: TextNode, score: f32) -> Self {
        Self { node, score }
    }

    /// The node id.
    pub fn id(&self) -> &str {
        &self.node.id
    }

    /// The node text.
    pub fn text(&self) -> &str {
        &self.node.text
    }
}

/// Reject node lists in which two nodes share an id.
pub fn ensure_unique_ids(nodes: &[NodeWithScore]) -> Result<()> {
    let mut seen = HashSet::with_capacity(nodes.len());
    for scored in nodes {
        if !seen.insert(scored.node.id.as_str()) {
            return Err(RaglineError::validation(format!(
                "duplicate node id in postprocessor input: {}",
                scored.node.id
            )));
        }
    }
    Ok(())
}
