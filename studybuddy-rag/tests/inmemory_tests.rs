//! Tests for in-memory vector store search ordering and document lifecycle.

use std::path::PathBuf;

use chrono::Utc;
use proptest::prelude::*;
use studybuddy_rag::document::{ChunkMetadata, DocumentMetadata, VectorRecord};
use studybuddy_rag::error::RagError;
use studybuddy_rag::inmemory::InMemoryVectorStore;
use studybuddy_rag::vectorstore::VectorStore;

fn metadata(filename: &str) -> DocumentMetadata {
    DocumentMetadata {
        filename: filename.to_string(),
        uploaded_at: Utc::now(),
        num_chunks: 0,
        num_pages: 1,
        source_path: PathBuf::from(format!("uploads/{filename}")),
    }
}

fn record(document_id: &str, chunk_index: usize, embedding: Vec<f32>) -> VectorRecord {
    VectorRecord {
        id: VectorRecord::record_id(document_id, chunk_index),
        document_id: document_id.to_string(),
        embedding,
        text: format!("chunk {chunk_index} of {document_id}"),
        chunk_index,
        metadata: ChunkMetadata { filename: format!("{document_id}.pdf"), page: 0, total_pages: 1 },
    }
}

/// Generate a non-zero L2-normalized embedding of the given dimension.
fn arb_normalized_embedding(dim: usize) -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-1.0f32..1.0f32, dim).prop_filter_map(
        "non-zero embedding",
        |mut v| {
            let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm < 1e-8 {
                return None;
            }
            for val in &mut v {
                *val /= norm;
            }
            Some(v)
        },
    )
}

/// *For any* set of records stored in an InMemoryVectorStore, searching with a
/// query embedding returns results ordered by descending cosine similarity, and
/// exactly `min(top_k, stored)` of them.
mod prop_inmemory_search_ordering {
    use super::*;

    const DIM: usize = 16;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn results_ordered_descending_and_sized_by_top_k(
            embeddings in proptest::collection::vec(arb_normalized_embedding(DIM), 1..20),
            query in arb_normalized_embedding(DIM),
            top_k in 1usize..25,
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let stored = embeddings.len();
            let results = rt.block_on(async {
                let store = InMemoryVectorStore::new(DIM);
                let records = embeddings
                    .into_iter()
                    .enumerate()
                    .map(|(i, e)| record("doc_1", i, e))
                    .collect();
                store.insert_document("doc_1", metadata("doc_1.pdf"), records).await.unwrap();
                store.find_similar(&query, top_k, None).await.unwrap()
            });

            prop_assert_eq!(results.len(), top_k.min(stored));

            for window in results.windows(2) {
                prop_assert!(
                    window[0].similarity >= window[1].similarity,
                    "results not in descending order: {} < {}",
                    window[0].similarity,
                    window[1].similarity,
                );
            }
            for result in &results {
                prop_assert!(result.similarity <= 1.0 + 1e-5 && result.similarity >= -1.0 - 1e-5);
            }
        }
    }
}

#[tokio::test]
async fn empty_store_returns_no_results() {
    let store = InMemoryVectorStore::new(4);
    let results = store.find_similar(&[1.0, 0.0, 0.0, 0.0], 5, None).await.unwrap();
    assert!(results.is_empty());
    assert_eq!(store.stats().await.unwrap().total_vectors, 0);
}

#[tokio::test]
async fn ties_keep_insertion_order() {
    let store = InMemoryVectorStore::new(2);
    let records = (0..4).map(|i| record("doc", i, vec![1.0, 0.0])).collect();
    store.insert_document("doc", metadata("doc.pdf"), records).await.unwrap();

    let results = store.find_similar(&[1.0, 0.0], 4, None).await.unwrap();
    let indices: Vec<usize> = results.iter().map(|r| r.chunk_index).collect();
    assert_eq!(indices, vec![0, 1, 2, 3]);
}

#[tokio::test]
async fn filter_restricts_results_to_one_document() {
    let store = InMemoryVectorStore::new(2);
    store
        .insert_document("a", metadata("a.pdf"), vec![record("a", 0, vec![1.0, 0.0])])
        .await
        .unwrap();
    store
        .insert_document("b", metadata("b.pdf"), vec![record("b", 0, vec![0.9, 0.1])])
        .await
        .unwrap();

    let results = store.find_similar(&[1.0, 0.0], 5, Some("b")).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].document_id, "b");
}

#[tokio::test]
async fn filter_on_unknown_document_is_not_found() {
    let store = InMemoryVectorStore::new(2);
    let err = store.find_similar(&[1.0, 0.0], 5, Some("ghost")).await.unwrap_err();
    assert!(matches!(err, RagError::NotFound(id) if id == "ghost"));
}

#[tokio::test]
async fn zero_vectors_and_wrong_query_length_are_skipped_not_fatal() {
    let store = InMemoryVectorStore::new(2);
    let records = vec![record("doc", 0, vec![0.0, 0.0]), record("doc", 1, vec![0.0, 1.0])];
    store.insert_document("doc", metadata("doc.pdf"), records).await.unwrap();

    let results = store.find_similar(&[0.0, 1.0], 5, None).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].chunk_index, 1);

    let results = store.find_similar(&[0.0, 1.0, 0.0], 5, None).await.unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn malformed_embeddings_are_rejected_on_insert() {
    let store = InMemoryVectorStore::new(3);
    let err = store
        .insert_document("doc", metadata("doc.pdf"), vec![record("doc", 0, vec![1.0, 0.0])])
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::DimensionMismatch { expected: 3, actual: 2 }));
    assert!(store.get_document("doc").await.unwrap().is_none());
}

#[tokio::test]
async fn add_vectors_requires_registered_document() {
    let store = InMemoryVectorStore::new(2);
    let err = store.add_vectors(vec![record("late", 0, vec![1.0, 0.0])]).await.unwrap_err();
    assert!(matches!(err, RagError::NotFound(_)));

    store.add_document("late", metadata("late.pdf")).await.unwrap();
    let added = store.add_vectors(vec![record("late", 0, vec![1.0, 0.0])]).await.unwrap();
    assert_eq!(added, 1);
    assert_eq!(store.get_document_vectors("late").await.unwrap().len(), 1);
}

#[tokio::test]
async fn add_document_upserts_entry() {
    let store = InMemoryVectorStore::new(2);
    store.add_document("doc", metadata("first.pdf")).await.unwrap();
    store.add_document("doc", metadata("second.pdf")).await.unwrap();

    let stats = store.stats().await.unwrap();
    assert_eq!(stats.total_documents, 1);
    let document = store.get_document("doc").await.unwrap().unwrap();
    assert_eq!(document.metadata.filename, "second.pdf");
}

#[tokio::test]
async fn delete_removes_document_and_all_its_vectors() {
    let store = InMemoryVectorStore::new(2);
    store
        .insert_document(
            "keep",
            metadata("keep.pdf"),
            vec![record("keep", 0, vec![1.0, 0.0]), record("keep", 1, vec![0.5, 0.5])],
        )
        .await
        .unwrap();
    store
        .insert_document(
            "drop",
            metadata("drop.pdf"),
            vec![record("drop", 0, vec![1.0, 0.0]), record("drop", 1, vec![0.0, 1.0])],
        )
        .await
        .unwrap();
    let before = store.stats().await.unwrap();

    let removed = store.delete_document("drop").await.unwrap();
    assert_eq!(removed.id, "drop");

    let after = store.stats().await.unwrap();
    assert_eq!(after.total_documents, before.total_documents - 1);
    assert_eq!(after.total_vectors, 2);

    for query in [[1.0, 0.0], [0.0, 1.0], [0.7, 0.7]] {
        let results = store.find_similar(&query, 10, None).await.unwrap();
        assert!(results.iter().all(|r| r.document_id != "drop"));
    }
    assert!(store.get_document_vectors("drop").await.unwrap().is_empty());
}

#[tokio::test]
async fn deleting_unknown_document_is_not_found_and_harmless() {
    let store = InMemoryVectorStore::new(2);
    store
        .insert_document("doc", metadata("doc.pdf"), vec![record("doc", 0, vec![1.0, 0.0])])
        .await
        .unwrap();

    let err = store.delete_document("ghost").await.unwrap_err();
    assert!(matches!(err, RagError::NotFound(_)));
    assert_eq!(store.stats().await.unwrap().total_documents, 1);
}

#[tokio::test]
async fn list_documents_returns_every_registered_document() {
    let store = InMemoryVectorStore::new(2);
    for id in ["one", "two", "three"] {
        store.add_document(id, metadata(&format!("{id}.pdf"))).await.unwrap();
    }
    let documents = store.list_documents().await.unwrap();
    assert_eq!(documents.len(), 3);
}

#[tokio::test]
async fn reinserting_a_document_replaces_its_vectors() {
    let store = InMemoryVectorStore::new(2);
    store
        .insert_document(
            "doc",
            metadata("doc.pdf"),
            vec![record("doc", 0, vec![1.0, 0.0]), record("doc", 1, vec![0.0, 1.0])],
        )
        .await
        .unwrap();
    store
        .insert_document("doc", metadata("doc-v2.pdf"), vec![record("doc", 0, vec![0.6, 0.8])])
        .await
        .unwrap();

    let vectors = store.get_document_vectors("doc").await.unwrap();
    assert_eq!(vectors.len(), 1);
    assert_eq!(vectors[0].embedding, vec![0.6, 0.8]);

    let document = store.get_document("doc").await.unwrap().unwrap();
    assert_eq!(document.metadata.filename, "doc-v2.pdf");
    assert_eq!(store.stats().await.unwrap().total_documents, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn readers_never_see_a_half_inserted_or_half_deleted_document() {
    use std::sync::Arc;

    const CHUNKS: usize = 8;
    const ROUNDS: usize = 200;

    let store = Arc::new(InMemoryVectorStore::new(2));
    store
        .insert_document("anchor", metadata("anchor.pdf"), vec![record("anchor", 0, vec![0.0, 1.0])])
        .await
        .unwrap();

    let writer = tokio::spawn({
        let store = Arc::clone(&store);
        async move {
            for _ in 0..ROUNDS {
                let mut churn = metadata("churn.pdf");
                churn.num_chunks = CHUNKS;
                let records = (0..CHUNKS).map(|i| record("churn", i, vec![1.0, 0.0])).collect();
                store.insert_document("churn", churn, records).await.unwrap();
                tokio::task::yield_now().await;
                store.delete_document("churn").await.unwrap();
                tokio::task::yield_now().await;
            }
        }
    });

    let readers: Vec<_> = (0..3)
        .map(|_| {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                for _ in 0..ROUNDS {
                    let results = store.find_similar(&[1.0, 0.0], 100, None).await.unwrap();
                    let churn_hits = results.iter().filter(|r| r.document_id == "churn").count();
                    assert!(churn_hits == 0 || churn_hits == CHUNKS, "saw {churn_hits} churn vectors");
                    for result in results.iter().filter(|r| r.document_id == "anchor") {
                        assert!(store.get_document(&result.document_id).await.unwrap().is_some());
                    }

                    let vectors = store.get_document_vectors("churn").await.unwrap();
                    assert!(vectors.is_empty() || vectors.len() == CHUNKS);

                    let stats = store.stats().await.unwrap();
                    match stats.total_documents {
                        1 => assert_eq!(stats.total_vectors, 1),
                        2 => assert_eq!(stats.total_vectors, 1 + CHUNKS),
                        n => panic!("unexpected document count {n}"),
                    }
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();

    writer.await.unwrap();
    for reader in readers {
        reader.await.unwrap();
    }
    assert!(store.get_document("churn").await.unwrap().is_none());
    assert!(store.get_document_vectors("churn").await.unwrap().is_empty());
}
