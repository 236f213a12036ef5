//! Embedding functions.
//!
//! The vector index never computes embeddings itself; it is handed an
//! [`EmbeddingFunction`] at construction. [`HashingEmbedder`] is always
//! available and needs no model files. `FastEmbedder` runs ONNX models via
//! fastembed and requires the `local-embeddings` feature.

use crate::types::{RagError, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Turns text into fixed-length vectors.
#[async_trait]
pub trait EmbeddingFunction: Send + Sync {
    /// Embed one text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts, preserving order.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    /// Length of every vector this function produces.
    fn dimensions(&self) -> usize;

    /// Identifier of the underlying model.
    fn model_name(&self) -> &str;
}

/// Which embedding backend to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingProvider {
    /// [`HashingEmbedder`].
    Hashing,
    /// fastembed ONNX model.
    FastEmbed,
}

impl std::str::FromStr for EmbeddingProvider {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "hashing" | "hash" => Ok(EmbeddingProvider::Hashing),
            "fastembed" | "local" => Ok(EmbeddingProvider::FastEmbed),
            other => Err(RagError::Configuration(format!(
                "Unknown embedding provider: {other}"
            ))),
        }
    }
}

/// Build the configured embedding function.
pub fn create_embedder(
    provider: EmbeddingProvider,
    model: &str,
    dimensions: usize,
) -> Result<Arc<dyn EmbeddingFunction>> {
    match provider {
        EmbeddingProvider::Hashing => Ok(Arc::new(HashingEmbedder::new(dimensions)?)),
        #[cfg(feature = "local-embeddings")]
        EmbeddingProvider::FastEmbed => Ok(Arc::new(FastEmbedder::new(model)?)),
        #[cfg(not(feature = "local-embeddings"))]
        EmbeddingProvider::FastEmbed => Err(RagError::Configuration(format!(
            "Embedding model '{model}' needs the `local-embeddings` feature"
        ))),
    }
}

// ============= Hashing Embedder =============

/// Deterministic bag-of-words embedding via signed feature hashing.
///
/// Lowercased alphanumeric words are hashed into `dimensions` buckets with a
/// ±1 sign taken from the hash, and the result is L2-normalised. Texts that
/// share words land close together under cosine distance. Text without any
/// word maps to the zero vector.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    /// Create an embedder producing `dimensions`-long vectors.
    pub fn new(dimensions: usize) -> Result<Self> {
        if dimensions == 0 {
            return Err(RagError::Configuration(
                "embedding dimensions must be greater than 0".to_string(),
            ));
        }
        Ok(Self { dimensions })
    }

    fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];

        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let hash = fnv1a(word.to_lowercase().as_bytes());
            let bucket = (hash % self.dimensions as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }
}

#[async_trait]
impl EmbeddingFunction for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_sync(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        "hashing"
    }
}

/// 64-bit FNV-1a. Stable across builds, so persisted vectors stay comparable.
fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes
        .iter()
        .fold(OFFSET, |hash, b| (hash ^ u64::from(*b)).wrapping_mul(PRIME))
}

// ============= fastembed =============

#[cfg(feature = "local-embeddings")]
pub use local::FastEmbedder;

#[cfg(feature = "local-embeddings")]
mod local {
    use super::*;
    use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
    use parking_lot::Mutex;

    /// Embeddings from a local fastembed ONNX model.
    ///
    /// Inference runs on the blocking thread pool.
    pub struct FastEmbedder {
        model: Arc<Mutex<TextEmbedding>>,
        model_name: String,
        dimensions: usize,
    }

    impl FastEmbedder {
        /// Load a model by its hub name, e.g. `BAAI/bge-small-en-v1.5`.
        ///
        /// Downloads model files on first use.
        pub fn new(model_name: &str) -> Result<Self> {
            let model = resolve_model(model_name)?;
            let mut embedding = TextEmbedding::try_new(
                InitOptions::new(model).with_show_download_progress(true),
            )
            .map_err(|e| RagError::Embedding(e.to_string()))?;

            // fastembed does not expose the width up front
            let probe = embedding
                .embed(vec!["dimension probe"], None)
                .map_err(|e| RagError::Embedding(e.to_string()))?;
            let dimensions = probe.first().map(Vec::len).unwrap_or_default();

            Ok(Self {
                model: Arc::new(Mutex::new(embedding)),
                model_name: model_name.to_string(),
                dimensions,
            })
        }

        async fn run(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
            let model = self.model.clone();
            tokio::task::spawn_blocking(move || model.lock().embed(texts, None))
                .await
                .map_err(|e| RagError::Embedding(e.to_string()))?
                .map_err(|e| RagError::Embedding(e.to_string()))
        }
    }

    #[async_trait]
    impl EmbeddingFunction for FastEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.run(vec![text.to_string()])
                .await?
                .pop()
                .ok_or_else(|| RagError::Embedding("model returned no embedding".to_string()))
        }

        async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            self.run(texts.iter().map(|t| t.to_string()).collect()).await
        }

        fn dimensions(&self) -> usize {
            self.dimensions
        }

        fn model_name(&self) -> &str {
            &self.model_name
        }
    }

    fn resolve_model(name: &str) -> Result<EmbeddingModel> {
        match name {
            "BAAI/bge-small-en-v1.5" | "bge-small-en-v1.5" => Ok(EmbeddingModel::BGESmallENV15),
            "BAAI/bge-base-en-v1.5" | "bge-base-en-v1.5" => Ok(EmbeddingModel::BGEBaseENV15),
            "sentence-transformers/all-MiniLM-L6-v2" | "all-MiniLM-L6-v2" => {
                Ok(EmbeddingModel::AllMiniLML6V2)
            }
            "intfloat/multilingual-e5-large" | "multilingual-e5-large" => {
                Ok(EmbeddingModel::MultilingualE5Large)
            }
            other => Err(RagError::Configuration(format!(
                "Unsupported fastembed model: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[tokio::test]
    async fn test_hashing_is_deterministic_and_normalised() {
        let embedder = HashingEmbedder::new(64).unwrap();
        let a = embedder.embed("Refund policy for returns").await.unwrap();
        let b = embedder.embed("refund POLICY for returns").await.unwrap();

        assert_eq!(a.len(), 64);
        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_shared_words_are_closer() {
        let embedder = HashingEmbedder::new(256).unwrap();
        let query = embedder.embed("refund policy").await.unwrap();
        let related = embedder.embed("our refund policy allows returns").await.unwrap();
        let unrelated = embedder.embed("quarterly sales meeting agenda").await.unwrap();

        assert!(cosine(&query, &related) > cosine(&query, &unrelated));
    }

    #[tokio::test]
    async fn test_empty_text_is_zero_vector() {
        let embedder = HashingEmbedder::new(8).unwrap();
        let v = embedder.embed("  ... ").await.unwrap();
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[tokio::test]
    async fn test_batch_matches_single() {
        let embedder = HashingEmbedder::new(32).unwrap();
        let batch = embedder.embed_batch(&["one", "two"]).await.unwrap();
        assert_eq!(batch[1], embedder.embed("two").await.unwrap());
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        assert!(matches!(HashingEmbedder::new(0), Err(RagError::Configuration(_))));
    }

    #[test]
    fn test_provider_parse() {
        assert_eq!("hashing".parse::<EmbeddingProvider>().unwrap(), EmbeddingProvider::Hashing);
        assert_eq!("FastEmbed".parse::<EmbeddingProvider>().unwrap(), EmbeddingProvider::FastEmbed);
        assert!("openai".parse::<EmbeddingProvider>().is_err());
    }

    #[cfg(not(feature = "local-embeddings"))]
    #[test]
    fn test_fastembed_requires_feature() {
        let result = create_embedder(EmbeddingProvider::FastEmbed, "BAAI/bge-small-en-v1.5", 384);
        assert!(matches!(result, Err(RagError::Configuration(_))));
    }
}
