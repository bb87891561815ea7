//! Offline feature-hashing embedder
//!
//! Lowercased word unigrams and bigrams are hashed with SHA-256 into a fixed
//! number of signed buckets. Term counts are dampened with `1 + ln(tf)` and the
//! vector is L2-normalized, so cosine similarity reflects shared vocabulary.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use unicode_segmentation::UnicodeSegmentation;

use crate::error::{Error, Result};

use super::embedding::EmbeddingProvider;

/// Default number of buckets
pub const DEFAULT_HASH_DIMENSIONS: usize = 384;

/// Deterministic embedder that needs no model or network
pub struct HashEmbedder {
    dimensions: usize,
    model: String,
}

impl HashEmbedder {
    /// Create an embedder with `dimensions` buckets
    pub fn new(dimensions: usize) -> Result<Self> {
        if dimensions == 0 {
            return Err(Error::Config("Hashing dimensions must be > 0".to_string()));
        }
        Ok(Self {
            dimensions,
            model: format!("feature-hash-{}", dimensions),
        })
    }

    /// Embed synchronously
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let words: Vec<String> = text.unicode_words().map(|w| w.to_lowercase()).collect();

        let mut counts: HashMap<String, u32> = HashMap::new();
        for word in &words {
            *counts.entry(word.clone()).or_default() += 1;
        }
        for pair in words.windows(2) {
            *counts.entry(format!("{} {}", pair[0], pair[1])).or_default() += 1;
        }

        let mut vector = vec![0.0f32; self.dimensions];
        for (feature, tf) in counts {
            let digest = Sha256::digest(feature.as_bytes());
            let mut bucket_bytes = [0u8; 8];
            bucket_bytes.copy_from_slice(&digest[..8]);
            let bucket = (u64::from_le_bytes(bucket_bytes) % self.dimensions as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign * (1.0 + (tf as f32).ln());
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_HASH_DIMENSIONS,
            model: format!("feature-hash-{}", DEFAULT_HASH_DIMENSIONS),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_text(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "hashing"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn test_deterministic_and_normalized() {
        let embedder = HashEmbedder::default();
        let a = embedder.embed_text("Photosynthesis converts light into chemical energy");
        let b = embedder.embed_text("Photosynthesis converts light into chemical energy");
        assert_eq!(a, b);
        assert_eq!(a.len(), DEFAULT_HASH_DIMENSIONS);
        assert!((cosine(&a, &a) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_related_text_scores_higher() {
        let embedder = HashEmbedder::default();
        let query = embedder.embed_text("what is supervised learning");
        let related = embedder.embed_text("Supervised learning uses labeled training data.");
        let unrelated = embedder.embed_text("The French revolution began in 1789.");
        assert!(cosine(&query, &related) > cosine(&query, &unrelated));
    }

    #[test]
    fn test_case_insensitive() {
        let embedder = HashEmbedder::default();
        assert_eq!(embedder.embed_text("Neural Networks"), embedder.embed_text("neural networks"));
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let embedder = HashEmbedder::new(16).unwrap();
        assert!(embedder.embed_text("  ").iter().all(|v| *v == 0.0));
        assert!(HashEmbedder::new(0).is_err());
    }

    #[tokio::test]
    async fn test_batch_matches_single() {
        let embedder = HashEmbedder::default();
        let texts = vec!["alpha beta".to_string(), "gamma".to_string()];
        let batch = embedder.embed_batch(&texts).await.unwrap();
        assert_eq!(batch[1], embedder.embed("gamma").await.unwrap());
        assert_eq!(embedder.model(), "feature-hash-384");
    }
}
