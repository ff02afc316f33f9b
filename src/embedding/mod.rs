//! Deterministic text embeddings (§2 component 6, §6.4 `generate-embeddings`).
//!
//! The pack's dependency stack carries no sentence-embedding crate (the
//! original pipeline called out to `sentence-transformers`' `all-MiniLM-L6-v2`
//! over HTTP); rather than fabricate a binding to a model that isn't part of
//! this corpus's ecosystem, entities are embedded with a fixed-dimension
//! feature-hashing vectorizer — every significant token is hashed into a
//! bucket with a sign derived from a second hash, bucket values are
//! accumulated, and the result is L2-normalized. This is a real, well-known
//! technique (the "hashing trick"), and it is honest about not being a
//! learned semantic embedding: `connection_strength`'s `semantic_score`
//! factor already falls back to the keyword/Jaccard score whenever no
//! embeddings are supplied, so a pipeline run with `embeddings_enabled =
//! false` loses nothing by skipping this module entirely.

use crate::shared::utils::significant_tokens;
use sha2::{Digest, Sha256};

/// Fixed output dimensionality for every embedding this module produces.
pub const EMBEDDING_DIM: usize = 256;

/// Identifier persisted alongside `embedding`/`embedding_dim` on graph nodes
/// (§6.4) so downstream consumers know how a vector was produced.
pub const EMBEDDING_MODEL: &str = "feature-hash-256";

fn bucket_and_sign(token: &str) -> (usize, f32) {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    let digest = hasher.finalize();
    let bucket = u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]]) as usize
        % EMBEDDING_DIM;
    let sign = if digest[4] & 1 == 0 { 1.0 } else { -1.0 };
    (bucket, sign)
}

/// Embed free text into a fixed-dimension, L2-normalized vector. Empty or
/// token-free input returns an all-zero vector rather than panicking or
/// dividing by zero.
pub fn embed(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; EMBEDDING_DIM];
    for token in significant_tokens(text) {
        let (bucket, sign) = bucket_and_sign(&token);
        vector[bucket] += sign;
    }

    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in &mut vector {
            *v /= norm;
        }
    }
    vector
}

/// Embed several texts independently, preserving input order. A thin batch
/// wrapper over `embed`, matching the `generate-embeddings` CLI's
/// batch-encode-then-store usage (§6.4).
pub fn embed_batch(texts: &[&str]) -> Vec<Vec<f32>> {
    texts.iter().map(|t| embed(t)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embed_is_deterministic() {
        let a = embed("resource-based view of the firm");
        let b = embed("resource-based view of the firm");
        assert_eq!(a, b);
    }

    #[test]
    fn embed_is_unit_length_for_nonempty_text() {
        let v = embed("dynamic capabilities and firm performance");
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[test]
    fn empty_text_embeds_to_zero_vector() {
        let v = embed("");
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn distinct_texts_usually_differ() {
        let a = embed("transaction cost economics");
        let b = embed("upper echelons theory");
        assert_ne!(a, b);
    }

    #[test]
    fn batch_preserves_order() {
        let batch = embed_batch(&["agency theory", "institutional theory"]);
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0], embed("agency theory"));
        assert_eq!(batch[1], embed("institutional theory"));
    }
}
