use codegraph_core::{CodeGraphError, NodeId, Result};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Serialize, Deserialize)]
struct Manifest {
    model_identity: String,
    dimension: usize,
    project_key: String,
    created_at: chrono::DateTime<chrono::Utc>,
    entries: Vec<(NodeId, Vec<f32>, String)>,
}

/// A persisted snapshot of every embedding computed so far (§4.D),
/// self-describing by `model_identity`, `dimension` and `project_key` so
/// multiple repositories' caches never collide and a mismatched model
/// is refused rather than silently mixed in, since vectors from two
/// models are not comparable.
pub struct EmbeddingCache {
    model_identity: String,
    dimension: usize,
    project_key: String,
    entries: DashMap<NodeId, (Vec<f32>, String)>,
}

impl EmbeddingCache {
    pub fn new(model_identity: impl Into<String>, dimension: usize, project_key: impl Into<String>) -> Self {
        Self {
            model_identity: model_identity.into(),
            dimension,
            project_key: project_key.into(),
            entries: DashMap::new(),
        }
    }

    pub fn get(&self, id: &NodeId) -> Option<(Vec<f32>, String)> {
        self.entries.get(id).map(|e| e.clone())
    }

    pub fn put(&self, id: NodeId, vector: Vec<f32>, text: String) {
        self.entries.insert(id, (vector, text));
    }

    pub fn remove(&self, id: &NodeId) {
        self.entries.remove(id);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn model_identity(&self) -> &str {
        &self.model_identity
    }

    pub fn project_key(&self) -> &str {
        &self.project_key
    }

    /// Every entry currently held, for callers that want to replay the
    /// snapshot into a `GraphStore` after loading.
    pub fn iter_entries(&self) -> Vec<(NodeId, (Vec<f32>, String))> {
        self.entries
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }

    /// Writes the snapshot to `path` atomically: the manifest is
    /// serialized to a sibling `.tmp` file, flushed, then renamed over
    /// the destination so a crash mid-write never leaves a truncated
    /// cache file behind.
    pub fn save(&self, path: &Path) -> Result<()> {
        let manifest = Manifest {
            model_identity: self.model_identity.clone(),
            dimension: self.dimension,
            project_key: self.project_key.clone(),
            created_at: chrono::Utc::now(),
            entries: self
                .entries
                .iter()
                .map(|e| (e.key().clone(), e.value().0.clone(), e.value().1.clone()))
                .collect(),
        };
        let bytes = bincode::serde::encode_to_vec(&manifest, bincode::config::standard())
            .map_err(|e| CodeGraphError::InvalidArgument(format!("cache encode error: {e}")))?;

        let tmp_path = path.with_extension("tmp");
        std::fs::write(&tmp_path, &bytes)?;
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }

    /// Loads a snapshot from `path`, rejecting it with
    /// [`CodeGraphError::Incompatible`] if its `model_identity`,
    /// `dimension` or `project_key` does not match what the caller
    /// expects to use going forward.
    pub fn load(path: &Path, model_identity: &str, dimension: usize, project_key: &str) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let (manifest, _): (Manifest, usize) =
            bincode::serde::decode_from_slice(&bytes, bincode::config::standard())
                .map_err(|e| CodeGraphError::InvalidArgument(format!("cache decode error: {e}")))?;

        if manifest.model_identity != model_identity
            || manifest.dimension != dimension
            || manifest.project_key != project_key
        {
            return Err(CodeGraphError::Incompatible(format!(
                "cache was built with model '{}' (dim {}, project '{}'), current is '{}' (dim {}, project '{}')",
                manifest.model_identity,
                manifest.dimension,
                manifest.project_key,
                model_identity,
                dimension,
                project_key
            )));
        }

        let entries = DashMap::new();
        for (id, vector, text) in manifest.entries {
            entries.insert(id, (vector, text));
        }
        Ok(Self {
            model_identity: manifest.model_identity,
            dimension: manifest.dimension,
            project_key: manifest.project_key,
            entries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn save_then_load_round_trips_entries() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("embeddings.bin");

        let cache = EmbeddingCache::new("hashing-bow-v1/8", 8, "proj-a");
        cache.put(NodeId::module("A"), vec![1.0; 8], "alpha".into());
        cache.save(&path).unwrap();

        let loaded = EmbeddingCache::load(&path, "hashing-bow-v1/8", 8, "proj-a").unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(
            loaded.get(&NodeId::module("A")).unwrap().1,
            "alpha".to_string()
        );
    }

    #[test]
    fn load_rejects_mismatched_model() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("embeddings.bin");

        let cache = EmbeddingCache::new("hashing-bow-v1/8", 8, "proj-a");
        cache.put(NodeId::module("A"), vec![1.0; 8], "alpha".into());
        cache.save(&path).unwrap();

        let err = EmbeddingCache::load(&path, "hashing-bow-v1/16", 16, "proj-a").unwrap_err();
        assert!(matches!(err, CodeGraphError::Incompatible(_)));
    }

    #[test]
    fn load_rejects_mismatched_project_key() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("embeddings.bin");

        let cache = EmbeddingCache::new("hashing-bow-v1/8", 8, "proj-a");
        cache.put(NodeId::module("A"), vec![1.0; 8], "alpha".into());
        cache.save(&path).unwrap();

        let err = EmbeddingCache::load(&path, "hashing-bow-v1/8", 8, "proj-b").unwrap_err();
        assert!(matches!(err, CodeGraphError::Incompatible(_)));
    }
}
