use codegraph_core::{GraphStore, NodeKind, NodeRef, Result};
use dashmap::DashMap;

/// Cosine similarity of two vectors, bounded to `[-1, 1]`. Zero-norm
/// inputs (the deterministic provider's empty-text case) similarity to
/// `0.0` rather than dividing by zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

/// An in-memory cache of every embedding currently in the `GraphStore`
/// (§4.G), kept so a similarity search does not have to pay the store's
/// writer-serialized round trip per candidate. `rebuild` resyncs from
/// the store; `upsert`/`remove` keep it current as the pipeline writes.
pub struct VectorIndex {
    entries: DashMap<NodeRef, Vec<f32>>,
}

impl VectorIndex {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    pub async fn rebuild(&self, store: &dyn GraphStore) -> Result<()> {
        self.entries.clear();
        for (_, id, vector, _) in store.list_embeddings(None, None).await? {
            self.entries.insert(id, vector);
        }
        Ok(())
    }

    pub fn upsert(&self, id: NodeRef, vector: Vec<f32>) {
        self.entries.insert(id, vector);
    }

    pub fn remove(&self, id: &NodeRef) {
        self.entries.remove(id);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Brute-force cosine search (§4.G): ranks every indexed node
    /// matching `kind_filter` (if given), drops scores below
    /// `threshold`, and returns at most `limit` results sorted by
    /// descending similarity, ties broken by id.
    pub fn search(
        &self,
        query: &[f32],
        limit: usize,
        threshold: f32,
        kind_filter: Option<NodeKind>,
    ) -> Vec<(NodeRef, f32)> {
        let mut scored: Vec<(NodeRef, f32)> = self
            .entries
            .iter()
            .filter(|entry| match kind_filter {
                Some(k) => entry.key().kind() == k,
                None => true,
            })
            .map(|entry| (entry.key().clone(), cosine_similarity(query, entry.value())))
            .filter(|(_, score)| *score >= threshold)
            .collect();
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.to_string().cmp(&b.0.to_string()))
        });
        scored.truncate(limit);
        scored
    }
}

impl Default for VectorIndex {
    fn default() -> Self {
        Self::new()
    }
}
