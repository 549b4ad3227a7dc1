//! Property tests for the hash embedder and cosine similarity.

use proptest::prelude::*;
use studybuddy_rag::embedding::{EmbeddingProvider, HashEmbeddingProvider};
use studybuddy_rag::error::RagError;
use studybuddy_rag::vectorstore::cosine_similarity;

const DIM: usize = 768;

fn norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn hash_embeddings_are_unit_length(text in "[a-zA-Z0-9 .,]{1,200}") {
        let embedding = HashEmbeddingProvider::new(DIM).embed_sync(&text);
        prop_assert_eq!(embedding.len(), DIM);
        prop_assert!((norm(&embedding) - 1.0).abs() < 1e-4, "norm was {}", norm(&embedding));
    }

    #[test]
    fn hash_embeddings_are_deterministic(text in ".{0,200}") {
        let provider = HashEmbeddingProvider::new(64);
        prop_assert_eq!(provider.embed_sync(&text), provider.embed_sync(&text));
    }

    #[test]
    fn cosine_is_bounded(
        (a, b) in (1usize..64).prop_flat_map(|n| (
            proptest::collection::vec(-10.0f32..10.0, n),
            proptest::collection::vec(-10.0f32..10.0, n),
        ))
    ) {
        prop_assume!(norm(&a) > 1e-3 && norm(&b) > 1e-3);
        let sim = cosine_similarity(&a, &b).unwrap();
        prop_assert!((-1.0 - 1e-5..=1.0 + 1e-5).contains(&sim), "similarity {} out of range", sim);
    }

    #[test]
    fn cosine_with_self_is_one(v in proptest::collection::vec(-10.0f32..10.0, 1..64)) {
        prop_assume!(norm(&v) > 1e-3);
        let sim = cosine_similarity(&v, &v).unwrap();
        prop_assert!((sim - 1.0).abs() < 1e-4);
    }

    #[test]
    fn cosine_rejects_unequal_lengths(
        a in proptest::collection::vec(-1.0f32..1.0, 1..32),
        extra in 1usize..8,
    ) {
        let b = vec![0.5f32; a.len() + extra];
        let is_mismatch = matches!(
            cosine_similarity(&a, &b),
            Err(RagError::DimensionMismatch { .. })
        );
        prop_assert!(is_mismatch);
    }
}

#[tokio::test]
async fn async_embed_matches_sync_embed() {
    let provider = HashEmbeddingProvider::new(DIM);
    let embedded = provider.embed("Arrays are zero indexed.").await.unwrap();
    assert_eq!(embedded, provider.embed_sync("Arrays are zero indexed."));
    assert_eq!(provider.dimensions(), DIM);
}

#[test]
fn different_texts_yield_different_vectors() {
    let provider = HashEmbeddingProvider::new(DIM);
    assert_ne!(provider.embed_sync("sine"), provider.embed_sync("cosine"));
}

#[test]
fn text_hashing_to_zero_still_gets_a_unit_vector() {
    let provider = HashEmbeddingProvider::new(DIM);
    for text in ["\0", "\0\0"] {
        let v = provider.embed_sync(text);
        assert!((norm(&v) - 1.0).abs() < 1e-4, "norm of {text:?} embedding was {}", norm(&v));
    }
    assert_eq!(norm(&provider.embed_sync("")), 0.0);
}
