//! Replace node text with a metadata value.
//!
//! Used for sentence-window retrieval: short sentences are embedded and
//! retrieved, and the wider window stored in metadata is substituted before
//! prompting.

use async_trait::async_trait;
use ragline_core::{CallContext, NodeWithScore, QueryBundle, Result, ensure_unique_ids};
use tracing::debug;

use super::NodePostprocessor;

/// Replaces each node's text with `metadata[target_metadata_key]` when that
/// value is a string. Other nodes pass through unchanged. Order, ids,
/// metadata, and scores are preserved.
#[derive(Debug, Clone)]
pub struct MetadataReplacement {
    target_metadata_key: String,
}

impl MetadataReplacement {
    /// Create a replacement reading `target_metadata_key`.
    pub fn new<S: Into<String>>(target_metadata_key: S) -> Self {
        Self {
            target_metadata_key: target_metadata_key.into(),
        }
    }

    /// The metadata key being read.
    pub fn target_metadata_key(&self) -> &str {
        &self.target_metadata_key
    }
}

#[async_trait]
impl NodePostprocessor for MetadataReplacement {
    async fn postprocess_nodes(
        &self,
        nodes: Vec<NodeWithScore>,
        _query: Option<&QueryBundle>,
        _ctx: &CallContext,
    ) -> Result<Vec<NodeWithScore>> {
        ensure_unique_ids(&nodes)?;

        let mut replaced = 0usize;
        let nodes = nodes
            .into_iter()
            .map(|mut scored| {
                let window = scored
                    .node
                    .metadata_str(&self.target_metadata_key)
                    .map(str::to_string);
                if let Some(text) = window {
                    scored.node.text = text;
                    replaced += 1;
                }
                scored
            })
            .collect::<Vec<_>>();

        debug!(
            key = %self.target_metadata_key,
            replaced,
            total = nodes.len(),
            "replaced node text from metadata"
        );
        Ok(nodes)
    }

    fn name(&self) -> &'static str {
        "MetadataReplacement"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use ragline_core::TextNode;

    #[tokio::test]
    async fn test_non_string_or_missing_values_pass_through() {
        let nodes = vec![
            NodeWithScore::new(TextNode::with_id("a", "short a").with_metadata("window", "wide a"), 0.9),
            NodeWithScore::new(TextNode::with_id("b", "short b").with_metadata("window", 42), 0.8),
            NodeWithScore::new(TextNode::with_id("c", "short c"), 0.7),
        ];

        let out = MetadataReplacement::new("window")
            .postprocess_nodes(nodes, None, &CallContext::new())
            .await
            .unwrap();

        let texts: Vec<&str> = out.iter().map(NodeWithScore::text).collect();
        assert_eq!(texts, vec!["wide a", "short b", "short c"]);
        let scores: Vec<f32> = out.iter().map(|n| n.score).collect();
        assert_eq!(scores, vec![0.9, 0.8, 0.7]);
    }

    #[tokio::test]
    async fn test_duplicate_ids_rejected() {
        let nodes = vec![
            NodeWithScore::new(TextNode::with_id("x", "one"), 0.5),
            NodeWithScore::new(TextNode::with_id("x", "two"), 0.4),
        ];
        let result = MetadataReplacement::new("window")
            .postprocess_nodes(nodes, None, &CallContext::new())
            .await;
        assert!(result.is_err());
    }
}
