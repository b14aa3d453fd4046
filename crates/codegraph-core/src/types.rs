use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// The closed set of entity kinds the knowledge graph stores. Only
/// `Module` and `Function` are produced by the ingestion pipeline and
/// consumed by the graph algorithms; the rest are storage-compatible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Module,
    Function,
    Type,
    Variable,
    File,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeKind::Module => "module",
            NodeKind::Function => "function",
            NodeKind::Type => "type",
            NodeKind::Variable => "variable",
            NodeKind::File => "file",
        };
        write!(f, "{s}")
    }
}

/// A node identity, canonical and kind-carrying. This is the "flattened
/// node reference" used both as the GraphStore's node key and as edge
/// endpoints, collapsing what would otherwise be separate (kind, id)
/// pairs and tuple/atom identifier shapes into one hashable value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeId {
    Module(String),
    Function {
        module: String,
        name: String,
        arity: u32,
    },
    Type(String),
    Variable(String),
    File(String),
}

impl NodeId {
    pub fn module(name: impl Into<String>) -> Self {
        NodeId::Module(name.into())
    }

    pub fn function(module: impl Into<String>, name: impl Into<String>, arity: u32) -> Self {
        NodeId::Function {
            module: module.into(),
            name: name.into(),
            arity,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            NodeId::Module(_) => NodeKind::Module,
            NodeId::Function { .. } => NodeKind::Function,
            NodeId::Type(_) => NodeKind::Type,
            NodeId::Variable(_) => NodeKind::Variable,
            NodeId::File(_) => NodeKind::File,
        }
    }

    /// A human-readable, DOT/JSON safe label with any module qualifier
    /// stripped for display purposes.
    pub fn short_label(&self) -> String {
        match self {
            NodeId::Module(name) => name.rsplit('.').next().unwrap_or(name).to_string(),
            NodeId::Function { name, arity, .. } => format!("{name}/{arity}"),
            NodeId::Type(name) | NodeId::Variable(name) | NodeId::File(name) => name.clone(),
        }
    }

    /// The owning module qualified name, when this id has one.
    pub fn owning_module(&self) -> Option<&str> {
        match self {
            NodeId::Function { module, .. } => Some(module),
            _ => None,
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeId::Module(name) => write!(f, "Module({name})"),
            NodeId::Function {
                module,
                name,
                arity,
            } => write!(f, "Function({module}, {name}, {arity})"),
            NodeId::Type(name) => write!(f, "Type({name})"),
            NodeId::Variable(name) => write!(f, "Variable({name})"),
            NodeId::File(name) => write!(f, "File({name})"),
        }
    }
}

/// Flattened node reference, used as edge endpoints and algorithm keys.
/// An alias of `NodeId`: the id already carries its kind.
pub type NodeRef = NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Visibility {
    Public,
    Private,
}

/// A normalized-structural source language tag. Analyzer-specific
/// semantics stay out of scope; this is used only for display and
/// routing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    Rust,
    Python,
    JavaScript,
    TypeScript,
    Other(String),
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Language::Rust => "rust",
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Other(s) => s.as_str(),
        };
        write!(f, "{s}")
    }
}

/// Node payload: everything about a node besides its identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeData {
    pub file_path: String,
    pub line: u32,
    pub doc: Option<String>,
    pub visibility: Visibility,
    pub language: Language,
    pub metadata: HashMap<String, String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl NodeData {
    pub fn new(file_path: impl Into<String>, line: u32, language: Language) -> Self {
        let now = chrono::Utc::now();
        Self {
            file_path: file_path.into(),
            line,
            doc: None,
            visibility: Visibility::Public,
            language,
            metadata: HashMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }
}

/// A single stored node: identity plus payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub kind: NodeKind,
    pub id: NodeId,
    pub data: NodeData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    Calls,
    Imports,
    Defines,
    Inherits,
    Implements,
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EdgeKind::Calls => "calls",
            EdgeKind::Imports => "imports",
            EdgeKind::Defines => "defines",
            EdgeKind::Inherits => "inherits",
            EdgeKind::Implements => "implements",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeMetadata {
    pub weight: f64,
    pub attributes: HashMap<String, String>,
}

impl Default for EdgeMetadata {
    fn default() -> Self {
        Self {
            weight: 1.0,
            attributes: HashMap::new(),
        }
    }
}

/// A single directed labeled edge. Endpoints are flattened node
/// references; endpoint existence in the node registry is not enforced
/// (forward references across files are expected).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub from: NodeRef,
    pub to: NodeRef,
    pub kind: EdgeKind,
    pub metadata: EdgeMetadata,
}

/// A node's stored embedding: a unit vector plus the source text it was
/// generated from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEmbedding {
    pub vector: Vec<f32>,
    pub text: String,
}

/// Point-in-time counts returned by `GraphStore::stats`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct GraphStats {
    pub nodes: usize,
    pub edges: usize,
    pub embeddings: usize,
}

/// A file's tracked state: content hash and the node keys it produced,
/// used by `FileTracker` to classify and clean up re-analyzed files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub content_hash: String,
    pub last_modified: chrono::DateTime<chrono::Utc>,
    pub produced_nodes: Vec<NodeId>,
}

/// Outcome of comparing a file's current content hash against its
/// tracked record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileChange {
    New,
    Changed,
    Unchanged,
    Deleted,
}

/// A symbolic filter predicate for the hybrid retriever (§4.H): an
/// optional node-kind restriction plus an open map of key→value
/// constraints. The special key `module` matches a function hit's
/// owning module; every other key is matched against the node's stored
/// `NodeData::metadata` map.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphFilter {
    pub kind: Option<NodeKind>,
    pub attributes: HashMap<String, String>,
}

impl GraphFilter {
    pub fn is_empty(&self) -> bool {
        self.kind.is_none() && self.attributes.is_empty()
    }

    /// Tests `id`/`data` against every constraint in this filter. An
    /// empty filter matches everything.
    pub fn matches(&self, id: &NodeId, data: &NodeData) -> bool {
        if let Some(kind) = self.kind {
            if id.kind() != kind {
                return false;
            }
        }
        for (key, value) in &self.attributes {
            if key == "module" {
                match id.owning_module() {
                    Some(module) if module == value => continue,
                    _ => return false,
                }
            }
            match data.metadata.get(key) {
                Some(v) if v == value => continue,
                _ => return false,
            }
        }
        true
    }
}
