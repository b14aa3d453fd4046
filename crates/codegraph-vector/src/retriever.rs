use crate::index::VectorIndex;
use codegraph_core::{EmbeddingProvider, GraphFilter, GraphStore, NodeRef, Result, RetrievalConfig};
use std::collections::HashMap;

/// Hard cap on the number of candidates `graph_ranking` pulls from the
/// store before scoring, independent of `limit` (§4.H).
const GRAPH_FIRST_CANDIDATE_CAP: usize = 1000;

/// The three retrieval strategies this server supports (§4.H).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalMode {
    /// Rank purely by embedding cosine similarity to the query.
    SemanticFirst,
    /// Rank the store's own filtered candidates by cosine similarity to
    /// the query, independent of the semantic index.
    GraphFirst,
    /// Run both rankings and merge them with Reciprocal Rank Fusion.
    Fusion,
}

/// Combines symbolic graph structure with semantic similarity (§4.H).
pub struct HybridRetriever<'a> {
    store: &'a dyn GraphStore,
    index: &'a VectorIndex,
    provider: &'a dyn EmbeddingProvider,
    config: &'a RetrievalConfig,
}

impl<'a> HybridRetriever<'a> {
    pub fn new(
        store: &'a dyn GraphStore,
        index: &'a VectorIndex,
        provider: &'a dyn EmbeddingProvider,
        config: &'a RetrievalConfig,
    ) -> Self {
        Self {
            store,
            index,
            provider,
            config,
        }
    }

    pub async fn retrieve(
        &self,
        query: &str,
        mode: RetrievalMode,
        limit: usize,
        filter: &GraphFilter,
    ) -> Result<Vec<(NodeRef, f64)>> {
        let embedded = self.provider.embed(query).await?;

        match mode {
            RetrievalMode::SemanticFirst => {
                let semantic = self.semantic_first(&embedded, filter, limit).await?;
                Ok(semantic
                    .into_iter()
                    .map(|(id, score)| (id, score as f64))
                    .collect())
            }
            RetrievalMode::GraphFirst => self.graph_ranking(&embedded, filter, limit).await,
            RetrievalMode::Fusion => {
                let wide = limit.max(self.config.default_limit);
                let semantic = self.semantic_first(&embedded, filter, wide).await?;
                let graph = self.graph_ranking(&embedded, filter, wide).await?;
                Ok(Self::reciprocal_rank_fusion(
                    &[
                        semantic.into_iter().map(|(id, _)| id).collect(),
                        graph.into_iter().map(|(id, _)| id).collect(),
                    ],
                    self.config.rrf_k,
                    limit,
                ))
            }
        }
    }

    /// `semantic_first` (§4.H): search the index for `2·limit` hits,
    /// post-filter each by the graph filter predicate (which requires
    /// pulling the hit's stored `NodeData` back from the store, since
    /// the vector index itself knows nothing but vectors), then take
    /// the top `limit`.
    async fn semantic_first(
        &self,
        embedded: &[f32],
        filter: &GraphFilter,
        limit: usize,
    ) -> Result<Vec<(NodeRef, f32)>> {
        let hits = self.index.search(
            embedded,
            limit * 2,
            self.config.default_threshold,
            filter.kind,
        );

        if filter.attributes.is_empty() {
            return Ok(hits.into_iter().take(limit).collect());
        }

        let mut kept = Vec::with_capacity(limit);
        for (id, score) in hits {
            if kept.len() >= limit {
                break;
            }
            if let Some(data) = self.store.get_node(id.kind(), &id).await? {
                if filter.matches(&id, &data) {
                    kept.push((id, score));
                }
            }
        }
        Ok(kept)
    }

    /// `graph_first` (§4.H): enumerate the store's own candidates
    /// matching `filter` (capped at [`GRAPH_FIRST_CANDIDATE_CAP`]),
    /// drop any without a stored embedding, rank the rest by cosine
    /// similarity to the query, keep scores at or above the configured
    /// threshold, and take the top `limit`.
    async fn graph_ranking(
        &self,
        embedded: &[f32],
        filter: &GraphFilter,
        limit: usize,
    ) -> Result<Vec<(NodeRef, f64)>> {
        let candidates = self
            .store
            .list_nodes(filter.kind, Some(GRAPH_FIRST_CANDIDATE_CAP))
            .await?;

        let mut scored = Vec::new();
        for node in candidates {
            if !filter.matches(&node.id, &node.data) {
                continue;
            }
            let Some((vector, _)) = self.store.get_embedding(node.id.kind(), &node.id).await?
            else {
                continue;
            };
            let score = crate::index::cosine_similarity(embedded, &vector) as f64;
            if score >= self.config.default_threshold as f64 {
                scored.push((node.id, score));
            }
        }

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);
        Ok(scored)
    }

    /// Reciprocal Rank Fusion: `score(node) = sum_over_lists 1 / (k +
    /// rank)`, rank 1-based, summed over every list the node appears in.
    /// Monotonic in rank within each list and stable under rescoring,
    /// which is the point of using ranks instead of raw scores to fuse
    /// across heterogeneous rankers. Ties are broken by first-seen order
    /// across the input lists: `order` tracks each id's first occurrence
    /// and the final sort is stable, so equal scores keep that order.
    fn reciprocal_rank_fusion(
        rankings: &[Vec<NodeRef>],
        k: f64,
        limit: usize,
    ) -> Vec<(NodeRef, f64)> {
        let mut scores: HashMap<NodeRef, f64> = HashMap::new();
        let mut order: Vec<NodeRef> = Vec::new();
        for ranking in rankings {
            for (rank, id) in ranking.iter().enumerate() {
                if !scores.contains_key(id) {
                    order.push(id.clone());
                }
                *scores.entry(id.clone()).or_insert(0.0) += 1.0 / (k + (rank + 1) as f64);
            }
        }
        let mut out: Vec<(NodeRef, f64)> = order
            .into_iter()
            .map(|id| {
                let score = scores[&id];
                (id, score)
            })
            .collect();
        out.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        out.truncate(limit);
        out
    }
}
