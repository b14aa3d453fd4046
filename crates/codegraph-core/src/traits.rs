use crate::error::Result;
use crate::types::{Edge, EdgeKind, GraphStats, Node, NodeData, NodeId, NodeKind, NodeRef};
use async_trait::async_trait;

/// The knowledge-graph store contract (§4.A). Point reads are expected to
/// be lock-free/read-shared; mutations are expected to be serialized
/// through a single writer so they apply in one total order.
#[async_trait]
pub trait GraphStore: Send + Sync {
    async fn put_node(&self, kind: NodeKind, id: NodeId, data: NodeData) -> Result<()>;
    async fn get_node(&self, kind: NodeKind, id: &NodeId) -> Result<Option<NodeData>>;
    async fn find_function(&self, module: &str, name: &str) -> Result<Option<(NodeId, NodeData)>>;
    async fn list_nodes(&self, kind: Option<NodeKind>, limit: Option<usize>) -> Result<Vec<Node>>;
    async fn remove_node(&self, kind: NodeKind, id: &NodeId) -> Result<()>;

    async fn put_edge(
        &self,
        from: NodeRef,
        to: NodeRef,
        kind: EdgeKind,
        weight: Option<f64>,
        metadata: Option<std::collections::HashMap<String, String>>,
    ) -> Result<()>;
    async fn outgoing(&self, from: &NodeRef, kind: Option<EdgeKind>) -> Result<Vec<Edge>>;
    async fn incoming(&self, to: &NodeRef, kind: Option<EdgeKind>) -> Result<Vec<Edge>>;
    async fn edge_weight(&self, from: &NodeRef, to: &NodeRef, kind: EdgeKind) -> Result<Option<f64>>;

    async fn put_embedding(
        &self,
        kind: NodeKind,
        id: NodeId,
        vector: Vec<f32>,
        text: String,
    ) -> Result<()>;
    async fn get_embedding(&self, kind: NodeKind, id: &NodeId) -> Result<Option<(Vec<f32>, String)>>;
    async fn list_embeddings(
        &self,
        kind: Option<NodeKind>,
        limit: Option<usize>,
    ) -> Result<Vec<(NodeKind, NodeId, Vec<f32>, String)>>;

    async fn stats(&self) -> Result<GraphStats>;
    async fn clear(&self) -> Result<()>;
}

/// Turns a text description into a fixed-dimension unit vector (§4.C).
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
    fn model_identity(&self) -> String;
    fn dimension(&self) -> usize;
}

/// A normalized analysis record produced by a language analyzer (§4.E).
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct AnalysisResult {
    pub modules: Vec<ModuleRecord>,
    pub functions: Vec<FunctionRecord>,
    pub calls: Vec<CallRecord>,
    pub imports: Vec<ImportRecord>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ModuleRecord {
    pub name: String,
    pub file: String,
    pub line: u32,
    pub doc: Option<String>,
    pub metadata: std::collections::HashMap<String, String>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct FunctionRecord {
    pub name: String,
    pub arity: u32,
    pub module: String,
    pub file: String,
    pub line: u32,
    pub doc: Option<String>,
    pub public: bool,
    pub metadata: std::collections::HashMap<String, String>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CallRecord {
    pub from_module: String,
    pub from_function: String,
    pub from_arity: u32,
    pub to_module: String,
    pub to_function: String,
    pub to_arity: u32,
    pub line: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ImportKind {
    Import,
    Require,
    Use,
    Alias,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ImportRecord {
    pub from_module: String,
    pub to_module: String,
    pub kind: ImportKind,
}

/// A pure function from source text to a normalized analysis record
/// (§4.E, §6). Analyzers carry no store access and report errors per
/// file rather than aborting a batch.
pub trait Analyzer: Send + Sync {
    fn supported_extensions(&self) -> &[&str];
    fn analyze(&self, source_text: &str, file_path: &str) -> Result<AnalysisResult>;
}
