use super::{snapshot, Snapshot};
use codegraph_core::{AlgorithmConfig, GraphStore, NodeRef, Result};

/// Hard ceiling on explored DFS states, independent of `max_depth` and
/// `max_paths`. A densely connected subgraph can otherwise blow up
/// combinatorially well before either of those limits is hit.
const MAX_EXPLORED_STATES: usize = 200_000;

/// Enumerates simple paths from `from` to `to`, bounded by
/// `find_paths_max_depth` (edge count) and `find_paths_max_paths`
/// (result count), per §4.I. Returns an empty vector, not an error, when
/// either endpoint is absent from the graph.
pub async fn find_paths(
    store: &dyn GraphStore,
    from: &NodeRef,
    to: &NodeRef,
    config: &AlgorithmConfig,
) -> Result<Vec<Vec<NodeRef>>> {
    let snap = snapshot(store, None).await?;
    let (Some(&start), Some(&target)) = (snap.index.get(from), snap.index.get(to)) else {
        return Ok(vec![]);
    };

    let out_degree = snap.out[start].len();
    if out_degree >= 20 {
        tracing::warn!(
            from = %from,
            out_degree,
            "dense source node, path enumeration may be expensive"
        );
    } else if out_degree >= 10 {
        tracing::info!(from = %from, out_degree, "source node has a high out-degree");
    }

    let mut results = Vec::new();
    let mut visited = vec![false; snap.len()];
    let mut path = vec![start];
    visited[start] = true;
    let mut explored = 0usize;

    walk(
        &snap,
        start,
        target,
        config.find_paths_max_depth,
        config.find_paths_max_paths,
        &mut visited,
        &mut path,
        &mut results,
        &mut explored,
    );

    Ok(results
        .into_iter()
        .map(|indices| indices.into_iter().map(|i| snap.nodes[i].clone()).collect())
        .collect())
}

#[allow(clippy::too_many_arguments)]
fn walk(
    snap: &Snapshot,
    current: usize,
    target: usize,
    max_depth: usize,
    max_paths: usize,
    visited: &mut [bool],
    path: &mut Vec<usize>,
    results: &mut Vec<Vec<usize>>,
    explored: &mut usize,
) {
    if results.len() >= max_paths || *explored >= MAX_EXPLORED_STATES {
        return;
    }
    *explored += 1;

    if current == target {
        results.push(path.clone());
        return;
    }
    if path.len() - 1 >= max_depth {
        return;
    }

    for &(next, _) in &snap.out[current] {
        if visited[next] {
            continue;
        }
        if results.len() >= max_paths || *explored >= MAX_EXPLORED_STATES {
            return;
        }
        visited[next] = true;
        path.push(next);
        walk(
            snap, next, target, max_depth, max_paths, visited, path, results, explored,
        );
        path.pop();
        visited[next] = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryGraphStore;
    use codegraph_core::{EdgeKind, Language, NodeData, NodeId, NodeKind};

    #[tokio::test]
    async fn finds_both_routes_in_a_diamond() {
        let store = InMemoryGraphStore::new(1);
        for name in ["A", "B", "C", "D"] {
            store
                .put_node(
                    NodeKind::Module,
                    NodeId::module(name),
                    NodeData::new(format!("{name}.rs"), 1, Language::Rust),
                )
                .await
                .unwrap();
        }
        for (from, to) in [("A", "B"), ("A", "C"), ("B", "D"), ("C", "D")] {
            store
                .put_edge(
                    NodeId::module(from),
                    NodeId::module(to),
                    EdgeKind::Calls,
                    None,
                    None,
                )
                .await
                .unwrap();
        }

        let config = AlgorithmConfig::default();
        let paths = find_paths(&store, &NodeId::module("A"), &NodeId::module("D"), &config)
            .await
            .unwrap();
        assert_eq!(paths.len(), 2);
        assert!(paths.iter().all(|p| p.len() == 3));
    }

    #[tokio::test]
    async fn respects_max_depth() {
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
            .put_edge(NodeId::module("A"), NodeId::module("B"), EdgeKind::Calls, None, None)
            .await
            .unwrap();
        store
            .put_edge(NodeId::module("B"), NodeId::module("C"), EdgeKind::Calls, None, None)
            .await
            .unwrap();

        let mut config = AlgorithmConfig::default();
        config.find_paths_max_depth = 1;
        let paths = find_paths(&store, &NodeId::module("A"), &NodeId::module("C"), &config)
            .await
            .unwrap();
        assert!(paths.is_empty());
    }

    #[tokio::test]
    async fn missing_endpoint_yields_empty_not_error() {
        let store = InMemoryGraphStore::new(1);
        store
            .put_node(
                NodeKind::Module,
                NodeId::module("A"),
                NodeData::new("a.rs", 1, Language::Rust),
            )
            .await
            .unwrap();
        let config = AlgorithmConfig::default();
        let paths = find_paths(&store, &NodeId::module("A"), &NodeId::module("Z"), &config)
            .await
            .unwrap();
        assert!(paths.is_empty());
    }
}
