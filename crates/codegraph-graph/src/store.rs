use async_trait::async_trait;
use codegraph_core::{
    CodeGraphError, Edge, EdgeKind, EdgeMetadata, GraphStats, GraphStore, Node, NodeData, NodeId,
    NodeKind, NodeRef, Result,
};
use dashmap::{DashMap, DashSet};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;

type EdgeKey = (NodeRef, NodeRef, EdgeKind);

/// In-memory knowledge-graph store (§4.A). Point reads go straight to the
/// `DashMap` tables and are lock-free with respect to each other; every
/// mutation first acquires `writer`, a single token that gives all
/// writes one total order regardless of which caller issued them.
pub struct InMemoryGraphStore {
    nodes: DashMap<NodeId, NodeData>,
    edges: DashMap<EdgeKey, EdgeMetadata>,
    out_adj: DashMap<NodeRef, DashSet<(NodeRef, EdgeKind)>>,
    in_adj: DashMap<NodeRef, DashSet<(NodeRef, EdgeKind)>>,
    embeddings: DashMap<NodeId, codegraph_core::StoredEmbedding>,
    dimension: usize,
    writer: Mutex<()>,
    write_timeout: Option<Duration>,
}

impl InMemoryGraphStore {
    /// `dimension` is the embedding width this store will accept; it
    /// should come from the configured `EmbeddingProvider::dimension()`.
    pub fn new(dimension: usize) -> Self {
        Self {
            nodes: DashMap::new(),
            edges: DashMap::new(),
            out_adj: DashMap::new(),
            in_adj: DashMap::new(),
            embeddings: DashMap::new(),
            dimension,
            writer: Mutex::new(()),
            write_timeout: None,
        }
    }

    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = Some(timeout);
        self
    }

    async fn acquire_writer(&self) -> Result<tokio::sync::MutexGuard<'_, ()>> {
        match self.write_timeout {
            None => Ok(self.writer.lock().await),
            Some(d) => tokio::time::timeout(d, self.writer.lock())
                .await
                .map_err(|_| CodeGraphError::Timeout),
        }
    }

    fn build_edge(&self, from: &NodeRef, to: &NodeRef, kind: EdgeKind) -> Option<Edge> {
        self.edges
            .get(&(from.clone(), to.clone(), kind))
            .map(|metadata| Edge {
                from: from.clone(),
                to: to.clone(),
                kind,
                metadata: metadata.clone(),
            })
    }
}

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    async fn put_node(&self, _kind: NodeKind, id: NodeId, data: NodeData) -> Result<()> {
        let _guard = self.acquire_writer().await?;
        self.nodes.insert(id, data);
        Ok(())
    }

    async fn get_node(&self, _kind: NodeKind, id: &NodeId) -> Result<Option<NodeData>> {
        Ok(self.nodes.get(id).map(|r| r.value().clone()))
    }

    async fn find_function(&self, module: &str, name: &str) -> Result<Option<(NodeId, NodeData)>> {
        for entry in self.nodes.iter() {
            if let NodeId::Function {
                module: m,
                name: n,
                ..
            } = entry.key()
            {
                if m == module && n == name {
                    return Ok(Some((entry.key().clone(), entry.value().clone())));
                }
            }
        }
        Ok(None)
    }

    async fn list_nodes(&self, kind: Option<NodeKind>, limit: Option<usize>) -> Result<Vec<Node>> {
        let mut out = Vec::new();
        for entry in self.nodes.iter() {
            if let Some(k) = kind {
                if entry.key().kind() != k {
                    continue;
                }
            }
            out.push(Node {
                kind: entry.key().kind(),
                id: entry.key().clone(),
                data: entry.value().clone(),
            });
            if let Some(limit) = limit {
                if out.len() >= limit {
                    break;
                }
            }
        }
        Ok(out)
    }

    async fn remove_node(&self, _kind: NodeKind, id: &NodeId) -> Result<()> {
        let _guard = self.acquire_writer().await?;
        self.nodes.remove(id);
        self.embeddings.remove(id);

        if let Some((_, outs)) = self.out_adj.remove(id) {
            for (to, kind) in outs.iter() {
                self.edges.remove(&(id.clone(), to.clone(), *kind));
                if let Some(reverse) = self.in_adj.get(to) {
                    reverse.remove(&(id.clone(), *kind));
                }
            }
        }
        if let Some((_, ins)) = self.in_adj.remove(id) {
            for (from, kind) in ins.iter() {
                self.edges.remove(&(from.clone(), id.clone(), *kind));
                if let Some(forward) = self.out_adj.get(from) {
                    forward.remove(&(id.clone(), *kind));
                }
            }
        }
        Ok(())
    }

    async fn put_edge(
        &self,
        from: NodeRef,
        to: NodeRef,
        kind: EdgeKind,
        weight: Option<f64>,
        metadata: Option<HashMap<String, String>>,
    ) -> Result<()> {
        let _guard = self.acquire_writer().await?;
        let meta = EdgeMetadata {
            weight: weight.unwrap_or(1.0),
            attributes: metadata.unwrap_or_default(),
        };
        self.edges
            .insert((from.clone(), to.clone(), kind), meta);
        self.out_adj
            .entry(from.clone())
            .or_insert_with(DashSet::new)
            .insert((to.clone(), kind));
        self.in_adj
            .entry(to)
            .or_insert_with(DashSet::new)
            .insert((from, kind));
        Ok(())
    }

    async fn outgoing(&self, from: &NodeRef, kind: Option<EdgeKind>) -> Result<Vec<Edge>> {
        let Some(set) = self.out_adj.get(from) else {
            return Ok(vec![]);
        };
        let mut out = Vec::new();
        for (to, k) in set.iter() {
            if kind.is_some_and(|filter| filter != *k) {
                continue;
            }
            if let Some(edge) = self.build_edge(from, to, *k) {
                out.push(edge);
            }
        }
        Ok(out)
    }

    async fn incoming(&self, to: &NodeRef, kind: Option<EdgeKind>) -> Result<Vec<Edge>> {
        let Some(set) = self.in_adj.get(to) else {
            return Ok(vec![]);
        };
        let mut out = Vec::new();
        for (from, k) in set.iter() {
            if kind.is_some_and(|filter| filter != *k) {
                continue;
            }
            if let Some(edge) = self.build_edge(from, to, *k) {
                out.push(edge);
            }
        }
        Ok(out)
    }

    async fn edge_weight(&self, from: &NodeRef, to: &NodeRef, kind: EdgeKind) -> Result<Option<f64>> {
        Ok(self
            .edges
            .get(&(from.clone(), to.clone(), kind))
            .map(|m| m.weight))
    }

    async fn put_embedding(
        &self,
        _kind: NodeKind,
        id: NodeId,
        vector: Vec<f32>,
        text: String,
    ) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(CodeGraphError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        let _guard = self.acquire_writer().await?;
        self.embeddings
            .insert(id, codegraph_core::StoredEmbedding { vector, text });
        Ok(())
    }

    async fn get_embedding(
        &self,
        _kind: NodeKind,
        id: &NodeId,
    ) -> Result<Option<(Vec<f32>, String)>> {
        Ok(self
            .embeddings
            .get(id)
            .map(|e| (e.vector.clone(), e.text.clone())))
    }

    async fn list_embeddings(
        &self,
        kind: Option<NodeKind>,
        limit: Option<usize>,
    ) -> Result<Vec<(NodeKind, NodeId, Vec<f32>, String)>> {
        let mut out = Vec::new();
        for entry in self.embeddings.iter() {
            let id = entry.key();
            if let Some(k) = kind {
                if id.kind() != k {
                    continue;
                }
            }
            out.push((id.kind(), id.clone(), entry.value().vector.clone(), entry.value().text.clone()));
            if let Some(limit) = limit {
                if out.len() >= limit {
                    break;
                }
            }
        }
        Ok(out)
    }

    async fn stats(&self) -> Result<GraphStats> {
        Ok(GraphStats {
            nodes: self.nodes.len(),
            edges: self.edges.len(),
            embeddings: self.embeddings.len(),
        })
    }

    async fn clear(&self) -> Result<()> {
        let _guard = self.acquire_writer().await?;
        self.nodes.clear();
        self.edges.clear();
        self.out_adj.clear();
        self.in_adj.clear();
        self.embeddings.clear();
        Ok(())
    }
}
