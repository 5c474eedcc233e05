//! Long-context reordering.

use async_trait::async_trait;
use ragline_core::{CallContext, NodeWithScore, QueryBundle, Result, ensure_unique_ids};
use std::collections::VecDeque;

use super::NodePostprocessor;

/// Places the highest-scored nodes at both ends of the list and the weakest
/// in the middle, countering "lost in the middle" degradation.
///
/// Nodes are stably sorted by descending score; then the i-th node goes to
/// the back of the head when i is even and to the front of the tail when i
/// is odd. Scores are preserved. Never suspends.
#[derive(Debug, Clone, Copy, Default)]
pub struct LongContextReorder;

impl LongContextReorder {
    /// Create the reorderer.
    pub fn new() -> Self {
        Self
    }

    /// Reorder without id validation.
    pub fn reorder(mut nodes: Vec<NodeWithScore>) -> Vec<NodeWithScore> {
        nodes.sort_by(|a, b| b.score.total_cmp(&a.score));

        let mut head = Vec::with_capacity(nodes.len().div_ceil(2));
        let mut tail = VecDeque::with_capacity(nodes.len() / 2);
        for (i, node) in nodes.into_iter().enumerate() {
            if i % 2 == 0 {
                head.push(node);
            } else {
                tail.push_front(node);
            }
        }
        head.extend(tail);
        head
    }
}

#[async_trait]
impl NodePostprocessor for LongContextReorder {
    async fn postprocess_nodes(
        &self,
        nodes: Vec<NodeWithScore>,
        _query: Option<&QueryBundle>,
        _ctx: &CallContext,
    ) -> Result<Vec<NodeWithScore>> {
        ensure_unique_ids(&nodes)?;
        Ok(Self::reorder(nodes))
    }

    fn name(&self) -> &'static str {
        "LongContextReorder"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use ragline_core::TextNode;
    use test_case::test_case;

    fn scored(scores: &[f32]) -> Vec<NodeWithScore> {
        scores
            .iter()
            .enumerate()
            .map(|(i, s)| NodeWithScore::new(TextNode::with_id(format!("n{i}"), "t"), *s))
            .collect()
    }

    #[test_case(&[], &[] ; "empty")]
    #[test_case(&[0.4], &[0.4] ; "single")]
    #[test_case(&[0.2, 0.9], &[0.9, 0.2] ; "pair")]
    #[test_case(&[0.5, 0.9, 0.7, 0.8], &[0.9, 0.7, 0.5, 0.8] ; "unsorted input")]
    fn test_reorder_shapes(input: &[f32], expected: &[f32]) {
        let out: Vec<f32> = LongContextReorder::reorder(scored(input))
            .iter()
            .map(|n| n.score)
            .collect();
        assert_eq!(out, expected.to_vec());
    }

    #[test]
    fn test_equal_scores_keep_input_order() {
        let out = LongContextReorder::reorder(scored(&[0.5, 0.5, 0.5]));
        let ids: Vec<&str> = out.iter().map(NodeWithScore::id).collect();
        assert_eq!(ids, vec!["n0", "n2", "n1"]);
    }
}
