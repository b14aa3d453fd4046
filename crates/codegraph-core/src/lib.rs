pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::{
    init_tracing, AlgorithmConfig, IngestionConfig, LoggingConfig, RetrievalConfig, Settings,
};
pub use error::{CodeGraphError, Result};
pub use traits::{
    AnalysisResult, Analyzer, CallRecord, EmbeddingProvider, FunctionRecord, GraphStore,
    ImportKind, ImportRecord, ModuleRecord,
};
pub use types::{
    Edge, EdgeKind, EdgeMetadata, FileChange, FileRecord, GraphFilter, GraphStats, Language, Node,
    NodeData, NodeId, NodeKind, NodeRef, StoredEmbedding, Visibility,
};
