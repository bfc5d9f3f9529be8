//! Contract tests for the in-memory vector store.

use std::sync::Arc;

use ragline::stores::{DistanceMetric, InMemoryVectorStore, PointPayload, VectorStore};
use ragline::types::RagError;

const DIM: usize = 3;

async fn store_with_collection() -> InMemoryVectorStore {
    let store = InMemoryVectorStore::new();
    store
        .ensure_collection("docs", DIM, DistanceMetric::Cosine)
        .await
        .unwrap();
    store
}

fn payloads(texts: &[(&str, &str)]) -> Vec<PointPayload> {
    texts
        .iter()
        .map(|(text, source)| PointPayload::new(*text, *source))
        .collect()
}

#[tokio::test]
async fn upsert_overwrites_matching_ids() {
    let store = store_with_collection().await;

    store
        .upsert(
            "docs",
            vec!["p1".into(), "p2".into()],
            vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]],
            payloads(&[("first", "a.txt"), ("second", "a.txt")]),
        )
        .await
        .unwrap();
    assert_eq!(store.count("docs").await.unwrap(), 2);

    // Same ids again: overwrite, not duplicate.
    store
        .upsert(
            "docs",
            vec!["p1".into(), "p2".into()],
            vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]],
            payloads(&[("first-v2", "a.txt"), ("second-v2", "a.txt")]),
        )
        .await
        .unwrap();
    assert_eq!(store.count("docs").await.unwrap(), 2);

    let result = store.search("docs", &[1.0, 0.0, 0.0], 10).await.unwrap();
    assert!(result.contexts.contains(&"first-v2".to_string()));
    assert!(!result.contexts.contains(&"first".to_string()));
}

#[tokio::test]
async fn length_mismatch_writes_nothing() {
    let store = store_with_collection().await;

    let err = store
        .upsert(
            "docs",
            vec!["p1".into(), "p2".into()],
            vec![vec![1.0, 0.0, 0.0]],
            payloads(&[("only", "a.txt")]),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RagError::LengthMismatch {
            ids: 2,
            vectors: 1,
            payloads: 1
        }
    ));
    assert_eq!(store.count("docs").await.unwrap(), 0, "no partial write");
}

#[tokio::test]
async fn dimension_mismatch_rejects_whole_batch() {
    let store = store_with_collection().await;

    // One good vector, one with the wrong dimension: nothing lands.
    let err = store
        .upsert(
            "docs",
            vec!["good".into(), "bad".into()],
            vec![vec![1.0, 0.0, 0.0], vec![1.0, 0.0]],
            payloads(&[("good", "a.txt"), ("bad", "a.txt")]),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::DimensionMismatch { declared: DIM, actual: 2 }));
    assert_eq!(store.count("docs").await.unwrap(), 0);
}

#[tokio::test]
async fn top_k_beyond_collection_size_returns_everything() {
    let store = store_with_collection().await;
    store
        .upsert(
            "docs",
            vec!["p1".into(), "p2".into()],
            vec![vec![1.0, 0.0, 0.0], vec![0.9, 0.1, 0.0]],
            payloads(&[("one", "a.txt"), ("two", "b.txt")]),
        )
        .await
        .unwrap();

    let result = store.search("docs", &[1.0, 0.0, 0.0], 50).await.unwrap();
    assert_eq!(result.contexts.len(), 2);
    assert_eq!(result.sources.len(), 2);
}

#[tokio::test]
async fn search_ranks_by_similarity_and_dedups_sources() {
    let store = store_with_collection().await;
    store
        .upsert(
            "docs",
            vec!["far".into(), "near".into(), "mid".into()],
            vec![
                vec![0.0, 1.0, 0.0],
                vec![1.0, 0.0, 0.0],
                vec![0.7, 0.7, 0.0],
            ],
            payloads(&[("far text", "b.txt"), ("near text", "a.txt"), ("mid text", "a.txt")]),
        )
        .await
        .unwrap();

    let result = store.search("docs", &[1.0, 0.0, 0.0], 3).await.unwrap();
    assert_eq!(
        result.contexts,
        vec!["near text", "mid text", "far text"],
        "contexts must be in descending similarity order"
    );
    assert_eq!(
        result.sources,
        vec!["a.txt", "b.txt"],
        "sources deduplicate keeping first-rank occurrence"
    );
}

#[tokio::test]
async fn search_empty_collection_is_not_an_error() {
    let store = store_with_collection().await;
    let result = store.search("docs", &[1.0, 0.0, 0.0], 5).await.unwrap();
    assert!(result.is_empty());
    assert!(result.sources.is_empty());
}

#[tokio::test]
async fn concurrent_upserts_to_distinct_ids_do_not_interfere() {
    let store = Arc::new(store_with_collection().await);

    let writer = |prefix: &'static str, source: &'static str, basis: usize| {
        let store = Arc::clone(&store);
        async move {
            for i in 0..50 {
                let mut vector = vec![0.0; DIM];
                vector[basis] = 1.0 + i as f32 / 100.0;
                store
                    .upsert(
                        "docs",
                        vec![format!("{prefix}-{i}")],
                        vec![vector],
                        vec![PointPayload::new(format!("{prefix} text {i}"), source)],
                    )
                    .await
                    .unwrap();
            }
        }
    };

    tokio::join!(writer("a", "doc-a.txt", 0), writer("b", "doc-b.txt", 1));

    assert_eq!(store.count("docs").await.unwrap(), 100);
    let result = store.search("docs", &[1.0, 1.0, 0.0], 200).await.unwrap();
    assert_eq!(result.contexts.len(), 100);
    assert_eq!(result.sources.len(), 2);
    // Payload text stayed attached to its own source's points.
    for i in 0..50 {
        assert!(result.contexts.contains(&format!("a text {i}")));
        assert!(result.contexts.contains(&format!("b text {i}")));
    }
}

#[tokio::test]
async fn delete_collection_then_recreate_starts_empty() {
    let store = store_with_collection().await;
    store
        .upsert(
            "docs",
            vec!["p1".into()],
            vec![vec![1.0, 0.0, 0.0]],
            payloads(&[("text", "a.txt")]),
        )
        .await
        .unwrap();

    store.delete_collection("docs").await.unwrap();
    store.delete_collection("docs").await.unwrap();

    store
        .ensure_collection("docs", DIM, DistanceMetric::Cosine)
        .await
        .unwrap();
    assert_eq!(store.count("docs").await.unwrap(), 0);
}

#[tokio::test]
async fn operations_on_missing_collections_fail_fast() {
    let store = InMemoryVectorStore::new();
    assert!(matches!(
        store.count("missing").await.unwrap_err(),
        RagError::UnknownCollection(_)
    ));
    assert!(matches!(
        store
            .upsert("missing", vec![], vec![], vec![])
            .await
            .unwrap_err(),
        RagError::UnknownCollection(_)
    ));
}
