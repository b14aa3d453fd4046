use codegraph_core::{FileChange, FileRecord, NodeId};
use dashmap::DashMap;
use sha2::{Digest, Sha256};

fn content_hash(content: &[u8]) -> String {
    let digest = Sha256::digest(content);
    hex_encode(&digest)
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Tracks which files have been analyzed and what they produced (§4.B),
/// so a re-ingest can skip unchanged files and clean up nodes orphaned
/// by changed or deleted ones. Keyed by the file's path as given by the
/// caller; callers are responsible for normalizing paths consistently.
pub struct FileTracker {
    records: DashMap<String, FileRecord>,
}

impl FileTracker {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    /// Classifies `path` by comparing `content`'s hash against the
    /// tracked record, without mutating any state.
    pub fn classify(&self, path: &str, content: &[u8]) -> FileChange {
        let hash = content_hash(content);
        match self.records.get(path) {
            None => FileChange::New,
            Some(record) if record.content_hash == hash => FileChange::Unchanged,
            Some(_) => FileChange::Changed,
        }
    }

    /// Records (or replaces) the tracked state for `path` after a
    /// successful re-analysis.
    pub fn record(
        &self,
        path: impl Into<String>,
        content: &[u8],
        produced_nodes: Vec<NodeId>,
    ) {
        self.records.insert(
            path.into(),
            FileRecord {
                content_hash: content_hash(content),
                last_modified: chrono::Utc::now(),
                produced_nodes,
            },
        );
    }

    /// Removes and returns the tracked record for `path`, used when a
    /// file is classified `Deleted` and its nodes need to be cleaned up.
    pub fn forget(&self, path: &str) -> Option<FileRecord> {
        self.records.remove(path).map(|(_, record)| record)
    }

    pub fn record_for(&self, path: &str) -> Option<FileRecord> {
        self.records.get(path).map(|r| r.clone())
    }

    pub fn tracked_paths(&self) -> Vec<String> {
        self.records.iter().map(|r| r.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&self) {
        self.records.clear();
    }
}

impl Default for FileTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_file_is_new_then_unchanged_after_record() {
        let tracker = FileTracker::new();
        assert_eq!(tracker.classify("a.rs", b"fn main() {}"), FileChange::New);
        tracker.record("a.rs", b"fn main() {}", vec![NodeId::module("A")]);
        assert_eq!(
            tracker.classify("a.rs", b"fn main() {}"),
            FileChange::Unchanged
        );
    }

    #[test]
    fn edited_content_is_changed() {
        let tracker = FileTracker::new();
        tracker.record("a.rs", b"v1", vec![]);
        assert_eq!(tracker.classify("a.rs", b"v2"), FileChange::Changed);
    }

    #[test]
    fn forget_returns_produced_nodes_for_cleanup() {
        let tracker = FileTracker::new();
        tracker.record("a.rs", b"v1", vec![NodeId::module("A")]);
        let record = tracker.forget("a.rs").unwrap();
        assert_eq!(record.produced_nodes, vec![NodeId::module("A")]);
        assert!(tracker.record_for("a.rs").is_none());
    }
}
