pub mod algorithms;
mod store;

pub use algorithms::{
    betweenness_centrality, closeness_centrality, compute_centrality, degree_breakdown,
    degree_centrality, find_paths, label_propagation, louvain, pagerank, snapshot, to_dot,
    to_node_link_json, Centrality, Community, DegreeBreakdown, ExportMetric, Snapshot,
    DEFAULT_MAX_EXPORT_NODES,
};
pub use store::InMemoryGraphStore;
