use super::snapshot;
use codegraph_core::{AlgorithmConfig, GraphStore, NodeRef, Result};
use std::collections::HashMap;

/// Weighted PageRank over the call graph (§4.I). Dangling nodes (no
/// outgoing edges) redistribute their mass uniformly across every node,
/// so the returned scores always sum to approximately 1.0 regardless of
/// how many sinks the graph has.
pub async fn pagerank(
    store: &dyn GraphStore,
    config: &AlgorithmConfig,
) -> Result<HashMap<NodeRef, f64>> {
    let snap = snapshot(store, None).await?;
    let n = snap.len();
    if n == 0 {
        return Ok(HashMap::new());
    }

    let d = config.pagerank_damping;
    let base = (1.0 - d) / n as f64;

    let out_weight: Vec<f64> = snap
        .out
        .iter()
        .map(|edges| edges.iter().map(|(_, w)| w.max(0.0)).sum())
        .collect();

    let mut scores = vec![1.0 / n as f64; n];
    for _ in 0..config.pagerank_max_iterations {
        let dangling_mass: f64 = (0..n)
            .filter(|&i| out_weight[i] <= 0.0)
            .map(|i| scores[i])
            .sum();
        let dangling_share = d * dangling_mass / n as f64;

        let mut next = vec![base + dangling_share; n];
        for (i, edges) in snap.out.iter().enumerate() {
            if out_weight[i] <= 0.0 {
                continue;
            }
            let contribution = d * scores[i] / out_weight[i];
            for &(j, w) in edges {
                next[j] += contribution * w.max(0.0);
            }
        }

        let delta: f64 = next
            .iter()
            .zip(scores.iter())
            .map(|(a, b)| (a - b).abs())
            .sum();
        scores = next;
        if delta < config.pagerank_tolerance {
            break;
        }
    }

    Ok(snap
        .nodes
        .into_iter()
        .zip(scores)
        .collect::<HashMap<_, _>>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryGraphStore;
    use codegraph_core::{EdgeKind, Language, NodeData, NodeId, NodeKind};

    async fn chain_store() -> InMemoryGraphStore {
        let store = InMemoryGraphStore::new(1);
        for name in ["A", "B", "C"] {
            store
                .put_node(
                    NodeKind::Module,
                    NodeId::module(name),
                    NodeData::new(format!("{name}.rs"), 1, Language::Rust),
                )
                .await
                .unwrap();
        }
        store
            .put_edge(
                NodeId::module("A"),
                NodeId::module("B"),
                EdgeKind::Calls,
                None,
                None,
            )
            .await
            .unwrap();
        store
            .put_edge(
                NodeId::module("B"),
                NodeId::module("C"),
                EdgeKind::Calls,
                None,
                None,
            )
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn mass_conserved_across_dangling_nodes() {
        let store = chain_store().await;
        let config = AlgorithmConfig::default();
        let scores = pagerank(&store, &config).await.unwrap();
        let total: f64 = scores.values().sum();
        assert!((total - 1.0).abs() < 1e-6, "total was {total}");
    }

    #[tokio::test]
    async fn sink_outranks_source_in_a_chain() {
        let store = chain_store().await;
        let config = AlgorithmConfig::default();
        let scores = pagerank(&store, &config).await.unwrap();
        assert!(scores[&NodeId::module("C")] > scores[&NodeId::module("A")]);
    }
}
