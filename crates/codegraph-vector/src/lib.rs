mod index;
mod provider;
mod retriever;

pub use index::{cosine_similarity, VectorIndex};
pub use provider::HashingEmbeddingProvider;
pub use retriever::{HybridRetriever, RetrievalMode};
