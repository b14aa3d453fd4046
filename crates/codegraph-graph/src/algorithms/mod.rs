mod centrality;
mod community;
mod export;
mod pagerank;
mod paths;

pub use centrality::{
    betweenness_centrality, closeness_centrality, compute_centrality, degree_breakdown,
    degree_centrality, Centrality, DegreeBreakdown,
};
pub use community::{label_propagation, louvain, Community};
pub use export::{to_dot, to_node_link_json, ExportMetric, DEFAULT_MAX_EXPORT_NODES};
pub use pagerank::pagerank;
pub use paths::find_paths;

use codegraph_core::{EdgeKind, GraphStore, NodeRef, Result};
use std::collections::{HashMap, HashSet};

/// A point-in-time snapshot of the graph's topology, indexed by integer
/// position, used as the common working set for every algorithm in this
/// module so each one pays the `GraphStore` traversal cost exactly once.
/// Exported so callers (e.g. the API layer building an export) can take
/// one snapshot and feed it to several of these functions instead of
/// re-walking the store per call.
pub struct Snapshot {
    pub nodes: Vec<NodeRef>,
    pub index: HashMap<NodeRef, usize>,
    /// `out[i]` = (target index, edge weight) pairs leaving node `i`.
    pub out: Vec<Vec<(usize, f64)>>,
    /// `inn[i]` = (source index, edge weight) pairs entering node `i`.
    pub inn: Vec<Vec<(usize, f64)>>,
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }
}

/// Builds a [`Snapshot`] from every node and edge currently in `store`,
/// optionally restricted to a single edge kind (algorithms that only
/// care about call graphs pass `Some(EdgeKind::Calls)`).
///
/// Edge endpoints are not required to have a registered node (forward
/// references, e.g. a call into a module that hasn't been ingested yet):
/// such endpoints are still given a slot here, as a degree-0 sink or
/// source, so they participate in every downstream algorithm exactly
/// like a fully-ingested node would. Only an edge whose *both* endpoints
/// are unregistered and never observed from a registered node's own
/// outgoing/incoming list is unreachable through this snapshot — the
/// `GraphStore` interface has no "list every edge" operation to recover
/// that case from.
pub async fn snapshot(
    store: &dyn GraphStore,
    kind_filter: Option<EdgeKind>,
) -> Result<Snapshot> {
    let registered: Vec<NodeRef> = store
        .list_nodes(None, None)
        .await?
        .into_iter()
        .map(|n| n.id)
        .collect();

    let mut nodes: Vec<NodeRef> = Vec::new();
    let mut index: HashMap<NodeRef, usize> = HashMap::new();
    for id in &registered {
        if !index.contains_key(id) {
            index.insert(id.clone(), nodes.len());
            nodes.push(id.clone());
        }
    }

    let mut seen_edges: HashSet<(NodeRef, NodeRef, EdgeKind)> = HashSet::new();
    let mut collected: Vec<(NodeRef, NodeRef, f64)> = Vec::new();
    for id in &registered {
        for edge in store.outgoing(id, kind_filter).await? {
            if seen_edges.insert((edge.from.clone(), edge.to.clone(), edge.kind)) {
                collected.push((edge.from, edge.to, edge.metadata.weight));
            }
        }
        for edge in store.incoming(id, kind_filter).await? {
            if seen_edges.insert((edge.from.clone(), edge.to.clone(), edge.kind)) {
                collected.push((edge.from, edge.to, edge.metadata.weight));
            }
        }
    }

    for (from, to, _) in &collected {
        for id in [from, to] {
            if !index.contains_key(id) {
                index.insert(id.clone(), nodes.len());
                nodes.push(id.clone());
            }
        }
    }

    let mut out = vec![Vec::new(); nodes.len()];
    let mut inn = vec![Vec::new(); nodes.len()];
    for (from, to, weight) in collected {
        let i = index[&from];
        let j = index[&to];
        out[i].push((j, weight));
        inn[j].push((i, weight));
    }

    Ok(Snapshot {
        nodes,
        index,
        out,
        inn,
    })
}
