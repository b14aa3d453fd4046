use async_trait::async_trait;
use codegraph_core::{EmbeddingProvider, Result};
use sha2::{Digest, Sha256};

/// A deterministic, hash-based bag-of-words embedding provider (§4.C).
/// It carries no model weights and makes no network calls: every token
/// in the input is hashed into a dimension and a sign, so the same text
/// always yields the same unit vector and two providers built with the
/// same dimension are always compatible. Good enough to exercise
/// retrieval end to end without an external embedding service; swapping
/// in a real model means implementing `EmbeddingProvider` again, not
/// changing anything that calls it.
pub struct HashingEmbeddingProvider {
    dimension: usize,
}

impl HashingEmbeddingProvider {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0f32; self.dimension];

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let digest = Sha256::digest(token.to_lowercase().as_bytes());
            let idx = u32::from_le_bytes(digest[0..4].try_into().unwrap()) as usize % self.dimension;
            let sign = if digest[4] & 1 == 0 { 1.0 } else { -1.0 };
            vector[idx] += sign;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in vector.iter_mut() {
                *v /= norm;
            }
        }
        Ok(vector)
    }

    fn model_identity(&self) -> String {
        format!("hashing-bow-v1/{}", self.dimension)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_text_yields_same_vector() {
        let provider = HashingEmbeddingProvider::new(64);
        let a = provider.embed("fn parse_module").await.unwrap();
        let b = provider.embed("fn parse_module").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn vector_is_unit_length() {
        let provider = HashingEmbeddingProvider::new(32);
        let v = provider.embed("hello world from codegraph").await.unwrap();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn empty_text_yields_zero_vector() {
        let provider = HashingEmbeddingProvider::new(16);
        let v = provider.embed("").await.unwrap();
        assert!(v.iter().all(|&x| x == 0.0));
    }
}
