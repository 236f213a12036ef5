//! RAG pipeline orchestration.
//!
//! [`RagManager`] ties the pieces together:
//!
//! ```text
//! path ──► DocumentLoader ──► TextChunker ──► VectorIndex.add
//! text ──► VectorIndex.query ──► relevance filter ──► ranked results
//! ```
//!
//! Single-document and query operations return errors to the caller.
//! Directory ingestion logs per-document failures and carries on.

use crate::db::docrag_vector::EmbeddedVectorIndex;
use crate::db::vectorstore::VectorIndex;
use crate::rag::chunker::TextChunker;
use crate::rag::embeddings::create_embedder;
use crate::rag::loader::DocumentLoader;
use crate::types::{
    Metadata, ProcessedDocument, QueryResponse, QueryResult, RagError, RagStatistics, Result,
};
use crate::utils::toml_config::DocragConfig;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

const DEFAULT_MAX_CONCURRENT_DOCUMENTS: usize = 4;
/// Candidates requested by [`RagManager::query_default`] unless configured.
pub const DEFAULT_N_RESULTS: usize = 5;
/// Threshold applied by [`RagManager::query_default`] unless configured.
pub const DEFAULT_MIN_RELEVANCE_SCORE: f32 = 0.5;

/// Runs document ingestion and retrieval against one vector index.
pub struct RagManager {
    index: Arc<dyn VectorIndex>,
    chunker: TextChunker,
    loader: DocumentLoader,
    max_concurrent_documents: usize,
    n_results: usize,
    min_relevance_score: f32,
}

impl RagManager {
    /// Assemble a manager from its parts.
    pub fn new(index: Arc<dyn VectorIndex>, chunker: TextChunker, loader: DocumentLoader) -> Self {
        Self {
            index,
            chunker,
            loader,
            max_concurrent_documents: DEFAULT_MAX_CONCURRENT_DOCUMENTS,
            n_results: DEFAULT_N_RESULTS,
            min_relevance_score: DEFAULT_MIN_RELEVANCE_SCORE,
        }
    }

    /// Defaults used by [`query_default`](Self::query_default).
    pub fn with_query_defaults(mut self, n_results: usize, min_relevance_score: f32) -> Self {
        self.n_results = n_results;
        self.min_relevance_score = min_relevance_score;
        self
    }

    /// Limit how many documents directory ingestion processes at once.
    pub fn with_max_concurrent_documents(mut self, max: usize) -> Self {
        self.max_concurrent_documents = max.max(1);
        self
    }

    /// Build the embedder, index and chunker described by `config`.
    pub async fn from_config(config: &DocragConfig) -> Result<Self> {
        let metric = config
            .store
            .distance_metric()
            .map_err(|e| RagError::Configuration(e.to_string()))?;
        let provider = config
            .embedding
            .embedding_provider()
            .map_err(|e| RagError::Configuration(e.to_string()))?;
        let embedder = create_embedder(
            provider,
            &config.embedding.model,
            config.embedding.dimensions,
        )?;

        let index = EmbeddedVectorIndex::open(
            config.store.vector_config(),
            &config.store.collection,
            Metadata::from_pairs([("description", config.store.description.as_str())]),
            metric,
            embedder,
        )
        .await?;

        let chunker = TextChunker::new(config.rag.chunk_size, config.rag.chunk_overlap)?
            .with_separator(config.rag.separator.clone());

        Ok(Self::new(Arc::new(index), chunker, DocumentLoader::new())
            .with_max_concurrent_documents(config.rag.max_concurrent_documents)
            .with_query_defaults(config.rag.n_results, config.rag.min_relevance_score))
    }

    /// The underlying index.
    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    /// The chunker in use.
    pub fn chunker(&self) -> &TextChunker {
        &self.chunker
    }

    /// The loader in use.
    pub fn loader(&self) -> &DocumentLoader {
        &self.loader
    }

    /// Load, chunk and index one document.
    ///
    /// Every chunk gets a fresh UUID. All chunks go to the index in a single
    /// `add` call; if that call fails nothing is rolled back on this side.
    pub async fn process_document(&self, path: &Path) -> Result<ProcessedDocument> {
        let processed = self
            .process_document_with_cancel(path, &CancellationToken::new())
            .await?;
        self.index.flush().await?;
        Ok(processed)
    }

    #[instrument(skip(self, cancel), fields(path = %path.display()))]
    async fn process_document_with_cancel(
        &self,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<ProcessedDocument> {
        if cancel.is_cancelled() {
            return Err(RagError::Cancelled);
        }

        let document = self.loader.load(path).await?;
        let chunks = self.chunker.chunk(&document.content, &document.metadata);
        let chunk_ids: Vec<String> = chunks.iter().map(|_| Uuid::new_v4().to_string()).collect();

        if !chunks.is_empty() {
            let (texts, metadatas): (Vec<String>, Vec<Metadata>) =
                chunks.into_iter().map(|c| (c.text, c.metadata)).unzip();

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RagError::Cancelled),
                added = self.index.add(texts, metadatas, chunk_ids.clone()) => added?,
            }
        }

        info!(chunks = chunk_ids.len(), "Indexed document");
        Ok(ProcessedDocument {
            num_chunks: chunk_ids.len(),
            document,
            chunk_ids,
        })
    }

    /// Index every supported document under `dir`.
    ///
    /// Documents that fail to load or index are logged and skipped. Results
    /// are in discovery (path) order. The index is flushed once, after the
    /// last document.
    ///
    /// # Errors
    ///
    /// [`RagError::InvalidDirectory`] if `dir` is missing or not a directory.
    pub async fn process_directory(
        &self,
        dir: &Path,
        recursive: bool,
    ) -> Result<Vec<ProcessedDocument>> {
        self.process_directory_with_cancel(dir, recursive, CancellationToken::new())
            .await
    }

    /// [`process_directory`](Self::process_directory) that stops when `cancel` fires.
    ///
    /// After cancellation no further documents are started, in-flight index
    /// calls are abandoned and [`RagError::Cancelled`] is returned. Documents
    /// indexed before that point stay in the index and are flushed.
    #[instrument(skip(self, cancel), fields(dir = %dir.display()))]
    pub async fn process_directory_with_cancel(
        &self,
        dir: &Path,
        recursive: bool,
        cancel: CancellationToken,
    ) -> Result<Vec<ProcessedDocument>> {
        let files = self.loader.discover(dir, recursive)?;
        debug!(files = files.len(), "Discovered documents");

        let outcomes: Vec<_> = stream::iter(files.iter())
            .map(|path| {
                let cancel = &cancel;
                async move { (path, self.process_document_with_cancel(path, cancel).await) }
            })
            .buffered(self.max_concurrent_documents)
            .collect()
            .await;

        self.index.flush().await?;
        if cancel.is_cancelled() {
            warn!("Directory processing cancelled");
            return Err(RagError::Cancelled);
        }

        let mut processed = Vec::with_capacity(outcomes.len());
        for (path, outcome) in outcomes {
            match outcome {
                Ok(result) => processed.push(result),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to process document, skipping")
                }
            }
        }

        info!(
            found = files.len(),
            processed = processed.len(),
            "Processed directory"
        );
        Ok(processed)
    }

    /// Retrieve chunks relevant to `text`.
    ///
    /// Requests `n_results` candidates from the index, drops those whose
    /// relevance is below `min_relevance_score`, and ranks the rest by their
    /// position in the index's answer. Ranks are assigned before filtering,
    /// so they can skip numbers; fewer than `n_results` results may come back.
    #[instrument(skip(self), fields(query = %text))]
    pub async fn query(
        &self,
        text: &str,
        n_results: usize,
        min_relevance_score: f32,
    ) -> Result<QueryResponse> {
        if n_results == 0 {
            return Err(RagError::InvalidInput(
                "n_results must be greater than 0".to_string(),
            ));
        }
        if min_relevance_score.is_nan() {
            return Err(RagError::InvalidInput(
                "min_relevance_score must be a number".to_string(),
            ));
        }

        let hits = self.index.query(text, n_results).await?.into_hits(0);
        let candidates = hits.len();

        let results: Vec<QueryResult> = hits
            .into_iter()
            .enumerate()
            .filter_map(|(i, hit)| {
                let relevance_score = self.index.relevance(hit.distance);
                (relevance_score >= min_relevance_score).then(|| QueryResult {
                    content: hit.document,
                    metadata: hit.metadata,
                    relevance_score,
                    rank: i + 1,
                })
            })
            .collect();

        debug!(candidates, kept = results.len(), "Query served");
        Ok(QueryResponse {
            query: text.to_string(),
            total_results: results.len(),
            results,
            timestamp: Utc::now().to_rfc3339(),
        })
    }

    /// [`query`](Self::query) with the configured candidate count and threshold.
    pub async fn query_default(&self, text: &str) -> Result<QueryResponse> {
        self.query(text, self.n_results, self.min_relevance_score)
            .await
    }

    /// Replace a chunk's text and metadata. Returns `false` for an unknown id.
    pub async fn update_chunk(&self, id: &str, text: &str, metadata: Metadata) -> Result<bool> {
        let updated = self.index.update(id, text, metadata).await?;
        self.index.flush().await?;
        Ok(updated)
    }

    /// Remove chunks by id, returning how many existed.
    pub async fn delete_chunks(&self, ids: &[String]) -> Result<usize> {
        let removed = self.index.delete(ids).await?;
        self.index.flush().await?;
        info!(requested = ids.len(), removed, "Deleted chunks");
        Ok(removed)
    }

    /// Index size plus loader and chunker configuration.
    pub async fn statistics(&self) -> Result<RagStatistics> {
        let stats = self.index.stats().await?;
        Ok(RagStatistics {
            total_documents: stats.count,
            collection_name: stats.name,
            collection_metadata: stats.metadata,
            supported_file_types: self.loader.supported_file_types(),
            chunk_size: self.chunker.chunk_size(),
            chunk_overlap: self.chunker.chunk_overlap(),
        })
    }
}
