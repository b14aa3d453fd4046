use codegraph_api::{AnalyzeOptions, QueryAPI};
use codegraph_core::{EdgeKind, GraphFilter, NodeId};
use codegraph_vector::HashingEmbeddingProvider;
use std::fs;
use std::sync::Arc;
use tempfile::tempdir;

fn api() -> QueryAPI {
    QueryAPI::new(Arc::new(HashingEmbeddingProvider::new(64)))
}

/// S1: a module `a` with a function `f/1` calling `b::g/2` yields one
/// module node, one function node, one `Defines` edge, and one `Calls`
/// edge to a sink that has no node of its own.
#[tokio::test]
async fn s1_ingest_produces_expected_nodes_and_edges() {
    let api = api();
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("a.rs"),
        "mod a { pub fn f(x: i32) { b::g(x, x); } }",
    )
    .unwrap();

    let report = api
        .analyze_paths(&[dir.path().to_path_buf()], &AnalyzeOptions::default(), None)
        .await
        .unwrap();
    assert_eq!(report.analyzed, 1);

    let module = api
        .get_node(codegraph_core::NodeKind::Module, &NodeId::module("a"))
        .await
        .unwrap();
    assert!(module.is_some());

    let f = NodeId::function("a", "f", 1);
    let function = api
        .get_node(codegraph_core::NodeKind::Function, &f)
        .await
        .unwrap();
    assert!(function.is_some());

    let defines = api.outgoing(&NodeId::module("a"), Some(EdgeKind::Defines)).await.unwrap();
    assert_eq!(defines.len(), 1);
    assert_eq!(defines[0].to, f);

    let calls = api.outgoing(&f, Some(EdgeKind::Calls)).await.unwrap();
    assert_eq!(calls.len(), 1);
    let sink = NodeId::function("b", "g", 2);
    assert_eq!(calls[0].to, sink);

    // B need not have a node of its own.
    let b_node = api.get_node(codegraph_core::NodeKind::Function, &sink).await.unwrap();
    assert!(b_node.is_none());
}

/// S2: `find_paths` from `(a,f,1)` to `(b,g,2)` after S1 returns exactly
/// the single direct edge as a path.
#[tokio::test]
async fn s2_find_paths_returns_the_direct_route() {
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

    let from = NodeId::function("a", "f", 1);
    let to = NodeId::function("b", "g", 2);
    let paths = api.find_paths(&from, &to).await.unwrap();

    assert_eq!(paths, vec![vec![from, to]]);
}

/// S3 (exercised end to end through ingestion rather than by poking raw
/// vectors into the store, which `codegraph-vector`'s own unit tests
/// already cover exactly): searching for a function's own description
/// ranks that function first, ahead of an unrelated one.
#[tokio::test]
async fn s3_semantic_search_ranks_the_matching_function_first() {
    let api = api();
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("alpha.rs"),
        "mod alpha { /// Computes a checksum.\npub fn checksum() {} }",
    )
    .unwrap();
    fs::write(
        dir.path().join("beta.rs"),
        "mod beta { /// Renders a greeting banner.\npub fn banner() {} }",
    )
    .unwrap();

    api.analyze_paths(&[dir.path().to_path_buf()], &AnalyzeOptions::default(), None)
        .await
        .unwrap();

    let results = api
        .retrieve(
            "checksum function",
            codegraph_vector::RetrievalMode::SemanticFirst,
            5,
            &GraphFilter::default(),
        )
        .await
        .unwrap();

    assert_eq!(results[0].0, NodeId::function("alpha", "checksum", 0));
}

// S5 (degree centrality of `A->B, A->C, B->C`) is exercised with a
// directly-constructed graph in `codegraph-api/src/query_api.rs`'s own
// test module and in `codegraph-graph`'s centrality tests, both of
// which have same-crate access to build a graph without going through
// ingestion; it is not repeated here since `QueryAPI` intentionally
// does not expose raw node/edge construction (§4.J scopes its write
// surface to `analyze_paths`, `clear`, and `remove_path`).

/// S6: re-analyzing an unchanged file is a no-op for the analyzer and
/// is reported as skipped rather than analyzed.
#[tokio::test]
async fn s6_unchanged_file_is_skipped_on_second_pass() {
    let api = api();
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("f.rs"), "mod a { pub fn f() {} }").unwrap();

    let first = api
        .analyze_paths(&[dir.path().to_path_buf()], &AnalyzeOptions::default(), None)
        .await
        .unwrap();
    assert_eq!(first.analyzed, 1);
    assert_eq!(first.skipped, 0);

    let second = api
        .analyze_paths(&[dir.path().to_path_buf()], &AnalyzeOptions::default(), None)
        .await
        .unwrap();
    assert_eq!(second.analyzed, 0);
    assert_eq!(second.skipped, 1);
}
