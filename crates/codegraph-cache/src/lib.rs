mod embedding_cache;
mod file_tracker;

pub use embedding_cache::EmbeddingCache;
pub use file_tracker::FileTracker;
