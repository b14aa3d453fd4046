use crate::pipeline::{AnalyzeOptions, BatchReport, IngestionPipeline, ProgressSink};
use codegraph_cache::{EmbeddingCache, FileTracker};
use codegraph_core::{
    AlgorithmConfig, CodeGraphError, Edge, EdgeKind, EmbeddingProvider, GraphFilter, GraphStats,
    GraphStore, Node, NodeData, NodeId, NodeKind, NodeRef, RetrievalConfig, Result,
};
use codegraph_graph::{
    betweenness_centrality, closeness_centrality, compute_centrality, degree_breakdown,
    degree_centrality, find_paths, label_propagation, louvain, pagerank, snapshot, to_dot,
    to_node_link_json, Centrality, Community, DegreeBreakdown, ExportMetric, InMemoryGraphStore,
    DEFAULT_MAX_EXPORT_NODES,
};
use codegraph_vector::{HybridRetriever, RetrievalMode, VectorIndex};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// The stable façade over every other component (§4.J). Every method
/// takes and returns plain values so a transport layer on top (JSON-RPC
/// or otherwise) can forward calls without reaching into any
/// collaborator directly.
pub struct QueryAPI {
    store: Arc<dyn GraphStore>,
    vector_index: Arc<VectorIndex>,
    provider: Arc<dyn EmbeddingProvider>,
    tracker: Arc<FileTracker>,
    pipeline: IngestionPipeline,
    retrieval: RetrievalConfig,
    algorithms: AlgorithmConfig,
}

impl QueryAPI {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self::with_config(provider, RetrievalConfig::default(), AlgorithmConfig::default())
    }

    pub fn with_config(
        provider: Arc<dyn EmbeddingProvider>,
        retrieval: RetrievalConfig,
        algorithms: AlgorithmConfig,
    ) -> Self {
        let store: Arc<dyn GraphStore> = Arc::new(InMemoryGraphStore::new(provider.dimension()));
        let vector_index = Arc::new(VectorIndex::new());
        let tracker = Arc::new(FileTracker::new());
        let pipeline = IngestionPipeline::new(
            Arc::clone(&store),
            Arc::clone(&tracker),
            Arc::clone(&provider),
            Arc::clone(&vector_index),
        );
        Self {
            store,
            vector_index,
            provider,
            tracker,
            pipeline,
            retrieval,
            algorithms,
        }
    }

    // ---- Ingestion (§4.F) ----------------------------------------

    pub async fn analyze_paths(
        &self,
        paths: &[PathBuf],
        options: &AnalyzeOptions,
        progress: Option<Arc<dyn ProgressSink>>,
    ) -> Result<BatchReport> {
        self.pipeline.analyze_paths(paths, options, progress).await
    }

    /// Removes every node this single path produced, and forgets its
    /// tracked state so a later `analyze_paths` treats it as new again.
    pub async fn remove_path(&self, path: &str) -> Result<()> {
        if let Some(record) = self.tracker.forget(path) {
            for id in record.produced_nodes {
                self.store.remove_node(id.kind(), &id).await?;
                self.vector_index.remove(&id);
            }
        }
        Ok(())
    }

    pub async fn clear(&self) -> Result<()> {
        self.store.clear().await?;
        self.tracker.clear();
        self.vector_index.rebuild(self.store.as_ref()).await?;
        Ok(())
    }

    // ---- Embedding cache (§4.D) ------------------------------------

    /// Loads a previously saved embedding snapshot into the live store
    /// and vector index, rejecting it outright if it was built under a
    /// different model or project.
    pub async fn load_embedding_cache(&self, path: &Path, project_key: &str) -> Result<usize> {
        if !path.exists() {
            return Err(CodeGraphError::NotFound(path.display().to_string()));
        }
        let cache = EmbeddingCache::load(
            path,
            &self.provider.model_identity(),
            self.provider.dimension(),
            project_key,
        )?;

        let mut loaded = 0usize;
        for (id, (vector, text)) in cache.iter_entries() {
            self.store
                .put_embedding(id.kind(), id.clone(), vector.clone(), text.clone())
                .await?;
            self.vector_index.upsert(id, vector);
            loaded += 1;
        }
        Ok(loaded)
    }

    /// Snapshots every embedding currently in the store to `path`,
    /// atomically from the caller's perspective (§4.D).
    pub async fn save_embedding_cache(&self, path: &Path, project_key: &str) -> Result<()> {
        let cache = EmbeddingCache::new(
            self.provider.model_identity(),
            self.provider.dimension(),
            project_key,
        );
        for (_, id, vector, text) in self.store.list_embeddings(None, None).await? {
            cache.put(id, vector, text);
        }
        cache.save(path)
    }

    // ---- GraphStore passthrough (§4.A) -----------------------------

    pub async fn get_node(&self, kind: NodeKind, id: &NodeId) -> Result<Option<NodeData>> {
        self.store.get_node(kind, id).await
    }

    pub async fn find_function(&self, module: &str, name: &str) -> Result<Option<(NodeId, NodeData)>> {
        self.store.find_function(module, name).await
    }

    pub async fn list_nodes(&self, kind: Option<NodeKind>, limit: Option<usize>) -> Result<Vec<Node>> {
        self.store.list_nodes(kind, limit).await
    }

    pub async fn outgoing(&self, from: &NodeRef, kind: Option<EdgeKind>) -> Result<Vec<Edge>> {
        self.store.outgoing(from, kind).await
    }

    pub async fn incoming(&self, to: &NodeRef, kind: Option<EdgeKind>) -> Result<Vec<Edge>> {
        self.store.incoming(to, kind).await
    }

    pub async fn stats(&self) -> Result<GraphStats> {
        self.store.stats().await
    }

    // ---- Retrieval (§4.G, §4.H) ------------------------------------

    pub async fn search(&self, query_vec: &[f32], limit: usize, threshold: f32) -> Vec<(NodeRef, f32)> {
        self.vector_index.search(query_vec, limit, threshold, None)
    }

    pub async fn knn(&self, query_vec: &[f32], k: usize) -> Vec<(NodeRef, f32)> {
        self.vector_index.search(query_vec, k, f32::NEG_INFINITY, None)
    }

    pub async fn retrieve(
        &self,
        query: &str,
        mode: RetrievalMode,
        limit: usize,
        filter: &GraphFilter,
    ) -> Result<Vec<(NodeRef, f64)>> {
        let retriever = HybridRetriever::new(
            self.store.as_ref(),
            self.vector_index.as_ref(),
            self.provider.as_ref(),
            &self.retrieval,
        );
        let results = retriever.retrieve(query, mode, limit, filter).await?;
        if results.is_empty() {
            return Err(CodeGraphError::NoResults);
        }
        Ok(results)
    }

    // ---- Graph algorithms (§4.I) ------------------------------------

    pub async fn pagerank(&self) -> Result<HashMap<NodeRef, f64>> {
        pagerank(self.store.as_ref(), &self.algorithms).await
    }

    pub async fn degree_centrality(&self) -> Result<HashMap<NodeRef, f64>> {
        degree_centrality(self.store.as_ref()).await
    }

    pub async fn degree_breakdown(&self) -> Result<HashMap<NodeRef, DegreeBreakdown>> {
        degree_breakdown(self.store.as_ref()).await
    }

    pub async fn betweenness_centrality(&self) -> Result<HashMap<NodeRef, f64>> {
        betweenness_centrality(self.store.as_ref(), &self.algorithms).await
    }

    pub async fn closeness_centrality(&self) -> Result<HashMap<NodeRef, f64>> {
        closeness_centrality(self.store.as_ref(), &self.algorithms).await
    }

    pub async fn centrality(&self) -> Result<Centrality> {
        compute_centrality(self.store.as_ref(), &self.algorithms).await
    }

    pub async fn find_paths(&self, from: &NodeRef, to: &NodeRef) -> Result<Vec<Vec<NodeRef>>> {
        find_paths(self.store.as_ref(), from, to, &self.algorithms).await
    }

    pub async fn louvain(&self) -> Result<Community> {
        louvain(self.store.as_ref(), &self.algorithms).await
    }

    pub async fn label_propagation(&self) -> Result<HashMap<NodeRef, usize>> {
        label_propagation(self.store.as_ref(), &self.algorithms).await
    }

    /// Renders the whole graph as DOT (§4.I), colored by `metric` and
    /// clustered by Louvain community.
    pub async fn export_dot(&self, metric: ExportMetric) -> Result<String> {
        let snap = snapshot(self.store.as_ref(), None).await?;
        let metric_map = match metric {
            ExportMetric::PageRank => pagerank(self.store.as_ref(), &self.algorithms).await?,
            ExportMetric::Betweenness => {
                betweenness_centrality(self.store.as_ref(), &self.algorithms).await?
            }
            ExportMetric::Degree => degree_centrality(self.store.as_ref()).await?,
        };
        let community = louvain(self.store.as_ref(), &self.algorithms).await?;
        Ok(to_dot(&snap, metric, &metric_map, Some(&community.assignments)))
    }

    /// Renders the whole graph as node-link JSON (§4.I), truncated to
    /// `max_nodes` (default [`DEFAULT_MAX_EXPORT_NODES`]).
    pub async fn export_node_link_json(&self, max_nodes: Option<usize>) -> Result<serde_json::Value> {
        let snap = snapshot(self.store.as_ref(), None).await?;
        let pagerank_map = pagerank(self.store.as_ref(), &self.algorithms).await?;
        let degree_map = degree_centrality(self.store.as_ref()).await?;
        let community = louvain(self.store.as_ref(), &self.algorithms).await?;
        Ok(to_node_link_json(
            &snap,
            &pagerank_map,
            &degree_map,
            Some(&community.assignments),
            max_nodes.unwrap_or(DEFAULT_MAX_EXPORT_NODES),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codegraph_vector::HashingEmbeddingProvider;
    use std::fs;
    use tempfile::tempdir;

    fn api() -> QueryAPI {
        QueryAPI::new(Arc::new(HashingEmbeddingProvider::new(8)))
    }

    #[tokio::test]
    async fn ingest_then_find_paths_matches_s1_and_s2() {
        let api = api();
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("a.rs"),
            "mod a { pub fn f(x: i32) { b::g(x, x); } }",
        )
        .unwrap();

        api.analyze_paths(&[dir.path().to_path_buf()], &AnalyzeOptions::default(), None)
            .await
            .unwrap();

        let stats = api.stats().await.unwrap();
        assert!(stats.nodes >= 2);
        assert!(stats.edges >= 1);
    }

    #[tokio::test]
    async fn degree_centrality_matches_s5() {
        let api = api();
        for (from, to) in [("A", "B"), ("A", "C"), ("B", "C")] {
            api.store
                .put_node(
                    NodeKind::Module,
                    NodeId::module(from),
                    NodeData::new(format!("{from}.rs"), 1, codegraph_core::Language::Rust),
                )
                .await
                .unwrap();
            api.store
                .put_node(
                    NodeKind::Module,
                    NodeId::module(to),
                    NodeData::new(format!("{to}.rs"), 1, codegraph_core::Language::Rust),
                )
                .await
                .unwrap();
            api.store
                .put_edge(NodeId::module(from), NodeId::module(to), EdgeKind::Calls, None, None)
                .await
                .unwrap();
        }

        let degree = api.degree_breakdown().await.unwrap();
        let a = degree[&NodeId::module("A")];
        assert_eq!((a.in_degree, a.out_degree, a.total_degree), (0, 2, 2));
        let b = degree[&NodeId::module("B")];
        assert_eq!((b.in_degree, b.out_degree, b.total_degree), (1, 1, 2));
        let c = degree[&NodeId::module("C")];
        assert_eq!((c.in_degree, c.out_degree, c.total_degree), (2, 0, 2));
    }

    #[tokio::test]
    async fn save_and_load_embedding_cache_round_trips() {
        let api = api();
        api.store
            .put_node(
                NodeKind::Module,
                NodeId::module("A"),
                NodeData::new("a.rs", 1, codegraph_core::Language::Rust),
            )
            .await
            .unwrap();
        api.store
            .put_embedding(NodeKind::Module, NodeId::module("A"), vec![1.0; 8], "alpha".into())
            .await
            .unwrap();

        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.bin");
        api.save_embedding_cache(&path, "proj").await.unwrap();

        let fresh = api();
        let loaded = fresh.load_embedding_cache(&path, "proj").await.unwrap();
        assert_eq!(loaded, 1);
    }
}
