use codegraph_cache::FileTracker;
use codegraph_core::{
    AnalysisResult, CodeGraphError, EdgeKind, EmbeddingProvider, FileChange, GraphStats,
    GraphStore, IngestionConfig, Language, NodeData, NodeId, NodeKind, Result, Visibility,
};
use codegraph_parser::AnalyzerRegistry;
use codegraph_vector::VectorIndex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

/// Options for a single `analyze_paths` call (§4.F). `incremental` with
/// `force_refresh = false` skips files whose content hash has not
/// changed since the last run; `force_refresh` re-analyzes everything
/// `incremental` would otherwise skip.
#[derive(Debug, Clone)]
pub struct AnalyzeOptions {
    pub incremental: bool,
    pub force_refresh: bool,
    pub ingestion: IngestionConfig,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            incremental: true,
            force_refresh: false,
            ingestion: IngestionConfig::default(),
        }
    }
}

/// What happened to a single file during a batch (§4.F, §6 progress
/// notifications).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FileOutcome {
    Analyzed,
    Skipped,
    Deleted,
    Error(String),
    TimedOut,
}

/// Aggregate result of one `analyze_paths` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub analyzed: usize,
    pub skipped: usize,
    pub deleted: usize,
    pub errors: Vec<(String, String)>,
    pub timed_out: Vec<String>,
    pub stats: GraphStats,
}

/// The progress events an `IngestionPipeline` run emits (§4.F, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ProgressEvent {
    AnalysisStart { total: usize },
    AnalysisFile { path: String, outcome: FileOutcome },
    AnalysisComplete { report: BatchReport },
}

/// An optional collaborator that observes ingestion progress. Failures
/// to notify are never fatal to the batch itself.
pub trait ProgressSink: Send + Sync {
    fn notify(&self, event: ProgressEvent);
}

/// Discards every event; the default when no caller supplies a sink.
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn notify(&self, _event: ProgressEvent) {}
}

/// Forwards every event onto an unbounded channel, for callers (editors,
/// CLIs) that want to stream progress rather than poll for it.
pub struct ChannelProgressSink {
    sender: tokio::sync::mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelProgressSink {
    pub fn new(sender: tokio::sync::mpsc::UnboundedSender<ProgressEvent>) -> Self {
        Self { sender }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn notify(&self, event: ProgressEvent) {
        let _ = self.sender.send(event);
    }
}

fn emit(progress: &Option<Arc<dyn ProgressSink>>, event: ProgressEvent) {
    if let Some(sink) = progress {
        sink.notify(event);
    }
}

/// Per-file task outcome, fed back from the worker pool into the
/// serialized graph-assembly step. Carries enough to both assemble the
/// graph and record the new `FileTracker` state without re-reading the
/// file.
enum TaskOutcome {
    Analyzed {
        path: String,
        content: Vec<u8>,
        result: AnalysisResult,
    },
    Failed {
        path: String,
        reason: String,
    },
    TimedOut {
        path: String,
    },
}

fn guess_language(path: &str) -> Language {
    match path.rsplit('.').next() {
        Some("rs") => Language::Rust,
        Some("py") => Language::Python,
        Some("js") => Language::JavaScript,
        Some("ts") => Language::TypeScript,
        Some(other) => Language::Other(other.to_string()),
        None => Language::Other("unknown".to_string()),
    }
}

/// Discovers files, filters by change, runs analyzers under a bounded
/// worker pool, assembles the resulting graph, and generates embeddings
/// for new or changed nodes (§4.F).
pub struct IngestionPipeline {
    store: Arc<dyn GraphStore>,
    registry: Arc<AnalyzerRegistry>,
    tracker: Arc<FileTracker>,
    provider: Arc<dyn EmbeddingProvider>,
    vector_index: Arc<VectorIndex>,
}

impl IngestionPipeline {
    pub fn new(
        store: Arc<dyn GraphStore>,
        tracker: Arc<FileTracker>,
        provider: Arc<dyn EmbeddingProvider>,
        vector_index: Arc<VectorIndex>,
    ) -> Self {
        Self {
            store,
            registry: Arc::new(AnalyzerRegistry::new()),
            tracker,
            provider,
            vector_index,
        }
    }

    pub async fn analyze_paths(
        &self,
        paths: &[PathBuf],
        options: &AnalyzeOptions,
        progress: Option<Arc<dyn ProgressSink>>,
    ) -> Result<BatchReport> {
        let mut discovered: Vec<PathBuf> = Vec::new();
        for root in paths {
            discovered.extend(codegraph_parser::discover_files(root, &options.ingestion));
        }
        discovered.sort();
        discovered.dedup();

        let discovered_strs: HashSet<String> = discovered
            .iter()
            .map(|p| p.to_string_lossy().to_string())
            .collect();

        let mut report = BatchReport {
            analyzed: 0,
            skipped: 0,
            deleted: 0,
            errors: Vec::new(),
            timed_out: Vec::new(),
            stats: GraphStats::default(),
        };

        if options.incremental {
            for tracked in self.tracker.tracked_paths() {
                if !discovered_strs.contains(&tracked) {
                    self.forget_and_remove(&tracked).await?;
                    report.deleted += 1;
                    emit(
                        &progress,
                        ProgressEvent::AnalysisFile {
                            path: tracked,
                            outcome: FileOutcome::Deleted,
                        },
                    );
                }
            }
        }

        let mut to_process: Vec<(PathBuf, Vec<u8>)> = Vec::new();
        for path in &discovered {
            let path_str = path.to_string_lossy().to_string();
            let content = match std::fs::read(path) {
                Ok(bytes) => bytes,
                Err(err) => {
                    report.errors.push((path_str.clone(), err.to_string()));
                    emit(
                        &progress,
                        ProgressEvent::AnalysisFile {
                            path: path_str,
                            outcome: FileOutcome::Error(err.to_string()),
                        },
                    );
                    continue;
                }
            };

            if options.incremental && !options.force_refresh {
                if let FileChange::Unchanged = self.tracker.classify(&path_str, &content) {
                    report.skipped += 1;
                    emit(
                        &progress,
                        ProgressEvent::AnalysisFile {
                            path: path_str,
                            outcome: FileOutcome::Skipped,
                        },
                    );
                    continue;
                }
            }
            to_process.push((path.clone(), content));
        }

        emit(
            &progress,
            ProgressEvent::AnalysisStart {
                total: to_process.len(),
            },
        );

        let budget = Duration::from_secs(options.ingestion.per_file_timeout_secs);
        let worker_count = options.ingestion.effective_worker_threads().max(1);

        let mut pending = to_process.into_iter();
        let mut joinset: JoinSet<TaskOutcome> = JoinSet::new();

        for (path, content) in pending.by_ref().take(worker_count) {
            self.spawn_analysis(&mut joinset, path, content, budget);
        }

        while let Some(joined) = joinset.join_next().await {
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(join_err) => TaskOutcome::Failed {
                    path: "<unknown>".to_string(),
                    reason: join_err.to_string(),
                },
            };
            self.apply_outcome(outcome, &mut report, &progress).await?;

            if let Some((path, content)) = pending.next() {
                self.spawn_analysis(&mut joinset, path, content, budget);
            }
        }

        report.stats = self.store.stats().await?;
        emit(
            &progress,
            ProgressEvent::AnalysisComplete {
                report: report.clone(),
            },
        );
        Ok(report)
    }

    fn spawn_analysis(
        &self,
        joinset: &mut JoinSet<TaskOutcome>,
        path: PathBuf,
        content: Vec<u8>,
        budget: Duration,
    ) {
        let registry = Arc::clone(&self.registry);
        joinset.spawn(async move {
            let path_str = path.to_string_lossy().to_string();
            let source = match String::from_utf8(content.clone()) {
                Ok(s) => s,
                Err(err) => {
                    return TaskOutcome::Failed {
                        path: path_str,
                        reason: format!("not valid utf-8: {err}"),
                    }
                }
            };

            let analysis = tokio::time::timeout(
                budget,
                tokio::task::spawn_blocking(move || registry.analyze_file(&path_str, &source)),
            )
            .await;

            let path_str = path.to_string_lossy().to_string();
            match analysis {
                Err(_) => TaskOutcome::TimedOut { path: path_str },
                Ok(Err(join_err)) => TaskOutcome::Failed {
                    path: path_str,
                    reason: join_err.to_string(),
                },
                Ok(Ok(Err(CodeGraphError::AnalyzerError { file, reason }))) => {
                    TaskOutcome::Failed { path: file, reason }
                }
                Ok(Ok(Err(other))) => TaskOutcome::Failed {
                    path: path_str,
                    reason: other.to_string(),
                },
                Ok(Ok(Ok(result))) => TaskOutcome::Analyzed {
                    path: path_str,
                    content,
                    result,
                },
            }
        });
    }

    async fn apply_outcome(
        &self,
        outcome: TaskOutcome,
        report: &mut BatchReport,
        progress: &Option<Arc<dyn ProgressSink>>,
    ) -> Result<()> {
        match outcome {
            TaskOutcome::Failed { path, reason } => {
                report.errors.push((path.clone(), reason.clone()));
                emit(
                    progress,
                    ProgressEvent::AnalysisFile {
                        path,
                        outcome: FileOutcome::Error(reason),
                    },
                );
            }
            TaskOutcome::TimedOut { path } => {
                report.timed_out.push(path.clone());
                emit(
                    progress,
                    ProgressEvent::AnalysisFile {
                        path,
                        outcome: FileOutcome::TimedOut,
                    },
                );
            }
            TaskOutcome::Analyzed {
                path,
                content,
                result,
            } => {
                self.forget_and_remove(&path).await?;
                let produced = self.assemble(&path, &result).await?;
                self.tracker.record(path.clone(), &content, produced);
                report.analyzed += 1;
                emit(
                    progress,
                    ProgressEvent::AnalysisFile {
                        path,
                        outcome: FileOutcome::Analyzed,
                    },
                );
            }
        }
        Ok(())
    }

    /// Removes whatever the previous analysis of `path` produced, so a
    /// re-analysis never leaves stale nodes or edges from a prior
    /// version of the file behind.
    async fn forget_and_remove(&self, path: &str) -> Result<()> {
        if let Some(record) = self.tracker.forget(path) {
            for id in record.produced_nodes {
                self.store.remove_node(id.kind(), &id).await?;
                self.vector_index.remove(&id);
            }
        }
        Ok(())
    }

    /// Upserts the modules, functions, and edges an `AnalysisResult`
    /// describes, then generates embeddings for every node it produced.
    /// Returns the full set of node keys attributed to `path`.
    async fn assemble(&self, path: &str, result: &AnalysisResult) -> Result<Vec<NodeId>> {
        let language = guess_language(path);
        let mut produced = Vec::new();

        for module in &result.modules {
            let id = NodeId::module(module.name.clone());
            let mut data = NodeData::new(module.file.clone(), module.line, language.clone())
                .with_visibility(Visibility::Public);
            data.metadata = module.metadata.clone();
            if let Some(doc) = &module.doc {
                data = data.with_doc(doc.clone());
            }
            self.store.put_node(NodeKind::Module, id.clone(), data).await?;
            produced.push(id.clone());

            let text = match &module.doc {
                Some(doc) => format!("module {}: {}", module.name, doc),
                None => format!("module {}", module.name),
            };
            self.embed_and_store(NodeKind::Module, id, text).await;
        }

        for function in &result.functions {
            let id = NodeId::function(
                function.module.clone(),
                function.name.clone(),
                function.arity,
            );
            let visibility = if function.public {
                Visibility::Public
            } else {
                Visibility::Private
            };
            let mut data = NodeData::new(function.file.clone(), function.line, language.clone())
                .with_visibility(visibility);
            data.metadata = function.metadata.clone();
            if let Some(doc) = &function.doc {
                data = data.with_doc(doc.clone());
            }
            self.store
                .put_node(NodeKind::Function, id.clone(), data)
                .await?;
            produced.push(id.clone());

            self.store
                .put_edge(
                    NodeId::module(function.module.clone()),
                    id.clone(),
                    EdgeKind::Defines,
                    None,
                    None,
                )
                .await?;

            let text = match &function.doc {
                Some(doc) => format!(
                    "function {}/{} in {}: {}",
                    function.name, function.arity, function.module, doc
                ),
                None => format!(
                    "function {}/{} in {}",
                    function.name, function.arity, function.module
                ),
            };
            self.embed_and_store(NodeKind::Function, id, text).await;
        }

        for call in &result.calls {
            let from = NodeId::function(
                call.from_module.clone(),
                call.from_function.clone(),
                call.from_arity,
            );
            let to = NodeId::function(call.to_module.clone(), call.to_function.clone(), call.to_arity);
            self.store
                .put_edge(from, to, EdgeKind::Calls, None, None)
                .await?;
        }

        for import in &result.imports {
            let from = NodeId::module(import.from_module.clone());
            let to = NodeId::module(import.to_module.clone());
            self.store
                .put_edge(from, to, EdgeKind::Imports, None, None)
                .await?;
        }

        Ok(produced)
    }

    /// Generates and stores an embedding for a node. A provider failure
    /// is a soft error (§4.C): the node stays in the graph, just without
    /// a vector.
    async fn embed_and_store(&self, kind: NodeKind, id: NodeId, text: String) {
        match self.provider.embed(&text).await {
            Ok(vector) => {
                self.vector_index.upsert(id.clone(), vector.clone());
                if let Err(err) = self.store.put_embedding(kind, id, vector, text).await {
                    tracing::warn!(error = %err, "failed to store embedding");
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "embedding provider failed, node stored without a vector");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codegraph_graph::InMemoryGraphStore;
    use codegraph_vector::HashingEmbeddingProvider;
    use std::fs;
    use tempfile::tempdir;

    fn pipeline() -> (IngestionPipeline, Arc<dyn GraphStore>) {
        let provider: Arc<dyn EmbeddingProvider> = Arc::new(HashingEmbeddingProvider::new(8));
        let store: Arc<dyn GraphStore> = Arc::new(InMemoryGraphStore::new(8));
        let tracker = Arc::new(FileTracker::new());
        let index = Arc::new(VectorIndex::new());
        let pipeline = IngestionPipeline::new(
            Arc::clone(&store),
            tracker,
            Arc::clone(&provider),
            index,
        );
        (pipeline, store)
    }

    #[tokio::test]
    async fn analyzing_a_module_with_a_call_produces_expected_graph() {
        let (pipeline, store) = pipeline();
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("a.rs"),
            "mod a { pub fn f(x: i32) { b::g(x, x); } }",
        )
        .unwrap();

        let report = pipeline
            .analyze_paths(
                &[dir.path().to_path_buf()],
                &AnalyzeOptions::default(),
                None,
            )
            .await
            .unwrap();

        assert_eq!(report.analyzed, 1);
        assert!(report.errors.is_empty());
        let stats = store.stats().await.unwrap();
        assert!(stats.nodes >= 1);
    }

    #[tokio::test]
    async fn unchanged_file_is_skipped_on_second_pass() {
        let (pipeline, _store) = pipeline();
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.rs"), "fn f() {}").unwrap();

        pipeline
            .analyze_paths(
                &[dir.path().to_path_buf()],
                &AnalyzeOptions::default(),
                None,
            )
            .await
            .unwrap();

        let second = pipeline
            .analyze_paths(
                &[dir.path().to_path_buf()],
                &AnalyzeOptions::default(),
                None,
            )
            .await
            .unwrap();

        assert_eq!(second.analyzed, 0);
        assert_eq!(second.skipped, 1);
    }
}
