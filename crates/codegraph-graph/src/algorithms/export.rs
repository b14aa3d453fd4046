use super::Snapshot;
use codegraph_core::NodeRef;
use serde_json::json;
use std::collections::HashMap;
use std::fmt::Write as _;

/// Which metric a DOT export colors nodes by (§4.I).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportMetric {
    PageRank,
    Betweenness,
    Degree,
}

/// Default cap on how many nodes a node-link JSON export carries before
/// truncating (§4.I).
pub const DEFAULT_MAX_EXPORT_NODES: usize = 500;

/// Replaces every character outside `[A-Za-z0-9_]` with `_`, then
/// prefixes with `n` so an identifier that happens to start with a
/// digit (or be empty) is still a legal Graphviz id.
fn sanitize_dot_id(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    format!("n_{cleaned}")
}

fn dot_escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Maps a value in `[0, max]` to a Graphviz HSV color string running
/// from white (`value == 0`) to red (`value == max`): saturation and
/// value ramp up together while hue stays fixed at red (`0.0`).
fn white_to_red(value: f64, max: f64) -> String {
    let t = if max > 0.0 { (value / max).clamp(0.0, 1.0) } else { 0.0 };
    format!("{:.3} {:.3} 1.000", 0.0, t)
}

/// Renders a graph snapshot as Graphviz DOT (§4.I): left-to-right rank
/// direction, one `subgraph cluster_N` per community (when a partition
/// is given), nodes colored on a white-to-red HSV scale keyed by
/// `metric_map`, and edges with `penwidth` proportional to weight. This
/// is a pure projection of `(snapshot, metric_map, community_partition)`
/// — it reads nothing from the store itself.
pub fn to_dot(
    snapshot: &Snapshot,
    metric: ExportMetric,
    metric_map: &HashMap<NodeRef, f64>,
    community_partition: Option<&HashMap<NodeRef, usize>>,
) -> String {
    let max_metric = metric_map.values().cloned().fold(0.0f64, f64::max);
    let max_weight = snapshot
        .out
        .iter()
        .flat_map(|edges| edges.iter().map(|&(_, w)| w))
        .fold(0.0f64, f64::max)
        .max(1.0);

    let mut out = String::from("digraph codegraph {\n  rankdir=LR;\n");

    let mut clusters: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut unclustered: Vec<usize> = Vec::new();
    for (i, id) in snapshot.nodes.iter().enumerate() {
        match community_partition.and_then(|p| p.get(id)) {
            Some(&community) => clusters.entry(community).or_default().push(i),
            None => unclustered.push(i),
        }
    }

    let render_node = |out: &mut String, i: usize| {
        let id = &snapshot.nodes[i];
        let value = metric_map.get(id).copied().unwrap_or(0.0);
        let color = white_to_red(value, max_metric);
        let _ = writeln!(
            out,
            "    \"{}\" [label=\"{}\", style=filled, fillcolor=\"{}\"];",
            sanitize_dot_id(&id.to_string()),
            dot_escape(&id.short_label()),
            color,
        );
    };

    let mut cluster_ids: Vec<usize> = clusters.keys().copied().collect();
    cluster_ids.sort_unstable();
    for community in cluster_ids {
        let _ = writeln!(out, "  subgraph cluster_{community} {{");
        let _ = writeln!(out, "    label=\"community {community}\";");
        for &i in &clusters[&community] {
            render_node(&mut out, i);
        }
        out.push_str("  }\n");
    }
    for &i in &unclustered {
        render_node(&mut out, i);
    }

    for (i, edges) in snapshot.out.iter().enumerate() {
        for &(j, weight) in edges {
            let penwidth = (weight / max_weight * 4.0).max(0.3);
            let _ = writeln!(
                out,
                "  \"{}\" -> \"{}\" [penwidth={:.2}];",
                sanitize_dot_id(&snapshot.nodes[i].to_string()),
                sanitize_dot_id(&snapshot.nodes[j].to_string()),
                penwidth,
            );
        }
    }

    out.push_str("}\n");
    out
}

/// Renders a graph snapshot as d3-style node-link JSON (§4.I): each node
/// carries `{id, type, pagerank, degree, community?}`, and the result is
/// truncated to at most `max_nodes` nodes (edges are only emitted
/// between nodes that survive truncation). Like [`to_dot`] this is a
/// pure projection of its arguments.
pub fn to_node_link_json(
    snapshot: &Snapshot,
    pagerank_map: &HashMap<NodeRef, f64>,
    degree_map: &HashMap<NodeRef, f64>,
    community_partition: Option<&HashMap<NodeRef, usize>>,
    max_nodes: usize,
) -> serde_json::Value {
    let kept: Vec<usize> = (0..snapshot.len()).take(max_nodes).collect();
    let kept_set: std::collections::HashSet<usize> = kept.iter().copied().collect();

    let node_json: Vec<_> = kept
        .iter()
        .map(|&i| {
            let id = &snapshot.nodes[i];
            let mut entry = json!({
                "id": id.to_string(),
                "type": id.kind().to_string(),
                "pagerank": pagerank_map.get(id).copied().unwrap_or(0.0),
                "degree": degree_map.get(id).copied().unwrap_or(0.0),
            });
            if let Some(community) = community_partition.and_then(|p| p.get(id)) {
                entry["community"] = json!(community);
            }
            entry
        })
        .collect();

    let mut link_json = Vec::new();
    for &i in &kept {
        for &(j, weight) in &snapshot.out[i] {
            if kept_set.contains(&j) {
                link_json.push(json!({
                    "source": snapshot.nodes[i].to_string(),
                    "target": snapshot.nodes[j].to_string(),
                    "weight": weight,
                }));
            }
        }
    }

    json!({ "nodes": node_json, "links": link_json })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::snapshot;
    use crate::store::InMemoryGraphStore;
    use codegraph_core::{EdgeKind, Language, NodeData, NodeId, NodeKind};

    async fn two_node_store() -> InMemoryGraphStore {
        let store = InMemoryGraphStore::new(1);
        store
            .put_node(NodeKind::Module, NodeId::module("A"), NodeData::new("a.rs", 1, Language::Rust))
            .await
            .unwrap();
        store
            .put_node(NodeKind::Module, NodeId::module("B"), NodeData::new("b.rs", 1, Language::Rust))
            .await
            .unwrap();
        store
            .put_edge(NodeId::module("A"), NodeId::module("B"), EdgeKind::Imports, None, Some(2.5))
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn dot_uses_left_to_right_rank_and_sanitized_ids() {
        let store = two_node_store().await;
        let snap = snapshot(&store, None).await.unwrap();
        let metric_map: HashMap<NodeRef, f64> =
            HashMap::from([(NodeId::module("A"), 1.0), (NodeId::module("B"), 0.0)]);

        let dot = to_dot(&snap, ExportMetric::PageRank, &metric_map, None);
        assert!(dot.contains("rankdir=LR"));
        assert!(dot.contains(&sanitize_dot_id(&NodeId::module("A").to_string())));
        assert!(dot.contains("penwidth="));
        assert!(!dot.contains('('));
    }

    #[tokio::test]
    async fn dot_groups_nodes_into_community_clusters() {
        let store = two_node_store().await;
        let snap = snapshot(&store, None).await.unwrap();
        let metric_map: HashMap<NodeRef, f64> = HashMap::new();
        let community: HashMap<NodeRef, usize> =
            HashMap::from([(NodeId::module("A"), 0), (NodeId::module("B"), 0)]);

        let dot = to_dot(&snap, ExportMetric::Degree, &metric_map, Some(&community));
        assert!(dot.contains("subgraph cluster_0"));
    }

    #[tokio::test]
    async fn node_link_json_carries_metric_and_community_fields() {
        let store = two_node_store().await;
        let snap = snapshot(&store, None).await.unwrap();
        let pagerank: HashMap<NodeRef, f64> = HashMap::from([(NodeId::module("A"), 0.6)]);
        let degree: HashMap<NodeRef, f64> = HashMap::from([(NodeId::module("A"), 1.0)]);
        let community: HashMap<NodeRef, usize> = HashMap::from([(NodeId::module("A"), 2)]);

        let value = to_node_link_json(&snap, &pagerank, &degree, Some(&community), 500);
        let nodes = value["nodes"].as_array().unwrap();
        assert_eq!(nodes.len(), 2);
        let a = nodes.iter().find(|n| n["id"] == NodeId::module("A").to_string()).unwrap();
        assert_eq!(a["pagerank"], 0.6);
        assert_eq!(a["degree"], 1.0);
        assert_eq!(a["community"], 2);
        assert_eq!(value["links"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn node_link_json_truncates_to_max_nodes() {
        let store = two_node_store().await;
        let snap = snapshot(&store, None).await.unwrap();
        let empty = HashMap::new();

        let value = to_node_link_json(&snap, &empty, &empty, None, 1);
        assert_eq!(value["nodes"].as_array().unwrap().len(), 1);
        assert_eq!(value["links"].as_array().unwrap().len(), 0);
    }
}
