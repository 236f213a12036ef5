//! Mock embedding functions for testing.
//!
//! These embedders give tests full control over vector geometry and failure
//! behaviour without loading a model.

use async_trait::async_trait;
use docrag::rag::EmbeddingFunction;
use docrag::types::{RagError, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio_util::sync::CancellationToken;

/// Constant on the extra axis so no text embeds to the zero vector.
const BIAS: f32 = 0.1;

/// One axis per keyword, set to 1.0 when the text contains the keyword
/// (case-insensitive), plus a small constant bias axis.
///
/// Under cosine distance, texts with the same keyword set score ~1.0 and
/// texts with disjoint keyword sets score near 0.
#[derive(Clone)]
pub struct KeywordEmbedder {
    keywords: Vec<String>,
}

impl KeywordEmbedder {
    pub fn new(keywords: &[&str]) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        let text = text.to_lowercase();
        let mut vector: Vec<f32> = self
            .keywords
            .iter()
            .map(|k| if text.contains(k.as_str()) { 1.0 } else { 0.0 })
            .collect();
        vector.push(BIAS);
        vector
    }
}

#[async_trait]
impl EmbeddingFunction for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.vector(text))
    }

    fn dimensions(&self) -> usize {
        self.keywords.len() + 1
    }

    fn model_name(&self) -> &str {
        "keyword-mock"
    }
}

/// Always fails to embed.
pub struct FailingEmbedder;

#[async_trait]
impl EmbeddingFunction for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(RagError::Embedding("mock embedding failure".to_string()))
    }

    fn dimensions(&self) -> usize {
        4
    }

    fn model_name(&self) -> &str {
        "failing-mock"
    }
}

/// Embeds like [`KeywordEmbedder`] until batch number `cancel_on` (1-based),
/// which cancels `token` and then never completes.
pub struct CancellingEmbedder {
    inner: KeywordEmbedder,
    token: CancellationToken,
    cancel_on: usize,
    calls: AtomicUsize,
}

impl CancellingEmbedder {
    pub fn new(keywords: &[&str], token: CancellationToken, cancel_on: usize) -> Self {
        Self {
            inner: KeywordEmbedder::new(keywords),
            token,
            cancel_on,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl EmbeddingFunction for CancellingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.inner.embed(text).await
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call >= self.cancel_on {
            self.token.cancel();
            std::future::pending::<()>().await;
        }
        self.inner.embed_batch(texts).await
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn model_name(&self) -> &str {
        "cancelling-mock"
    }
}
