//! Embedded vector index backed by `docrag-vector`.
//!
//! Texts are embedded with the injected [`EmbeddingFunction`] and stored in a
//! single named collection. The collection is created on first open and
//! reused afterwards.
//!
//! Mutations stay in memory until [`VectorIndex::flush`], so a batch of adds
//! costs one snapshot write instead of one per call.
//!
//! # Example
//!
//! ```rust,ignore
//! let embedder = Arc::new(HashingEmbedder::new(384)?);
//! let index = EmbeddedVectorIndex::open(
//!     Config::persistent("./data/docrag"),
//!     "document_store",
//!     Metadata::from_pairs([("description", "Main document storage for RAG system")]),
//!     DistanceMetric::Cosine,
//!     embedder,
//! )
//! .await?;
//! index.add(texts, metadatas, ids).await?;
//! index.flush().await?;
//! let bundle = index.query("refund policy", 5).await?;
//! ```

use crate::rag::embeddings::EmbeddingFunction;
use crate::types::{Metadata, RagError, Result};
use async_trait::async_trait;
use docrag_vector::{Config, DistanceMetric, Record, VectorDb};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use super::vectorstore::{CollectionStats, IndexRecord, QueryBundle, VectorIndex};

// ============================================================================
// Embedded Index Implementation
// ============================================================================

/// [`VectorIndex`] over an in-process [`VectorDb`] collection.
pub struct EmbeddedVectorIndex {
    /// The underlying vector database (cheap to clone, shared internally)
    db: VectorDb,
    collection: String,
    metric: DistanceMetric,
    embedder: Arc<dyn EmbeddingFunction>,
    /// Serialises mutations and snapshot writes. Holds whether there are
    /// mutations not yet on disk.
    unflushed: Mutex<bool>,
}

impl EmbeddedVectorIndex {
    /// Open the database described by `config` and get or create `collection`.
    ///
    /// Write-through is turned off; call [`VectorIndex::flush`] to persist.
    ///
    /// # Errors
    ///
    /// [`RagError::Index`] if the database cannot be loaded or an existing
    /// collection has a different dimensionality than the embedder.
    pub async fn open(
        config: Config,
        collection: &str,
        metadata: Metadata,
        metric: DistanceMetric,
        embedder: Arc<dyn EmbeddingFunction>,
    ) -> Result<Self> {
        let persistent = config.data_path.is_some();
        let db = VectorDb::open(config.with_persist_on_write(false)).await?;
        Self::with_db(db, collection, metadata, metric, embedder)
            .await
            .inspect(|_| info!(collection, persistent, "Opened vector index"))
    }

    /// Use an already opened database.
    pub async fn with_db(
        db: VectorDb,
        collection: &str,
        metadata: Metadata,
        metric: DistanceMetric,
        embedder: Arc<dyn EmbeddingFunction>,
    ) -> Result<Self> {
        let col = db
            .get_or_create_collection(collection, embedder.dimensions(), metric, metadata)
            .await?;

        Ok(Self {
            db,
            collection: collection.to_string(),
            // An existing collection keeps the metric it was created with
            metric: col.metric(),
            embedder,
            unflushed: Mutex::new(false),
        })
    }

    /// In-memory index, mostly useful for tests.
    pub async fn in_memory(collection: &str, embedder: Arc<dyn EmbeddingFunction>) -> Result<Self> {
        Self::open(
            Config::memory(),
            collection,
            Metadata::new(),
            DistanceMetric::Cosine,
            embedder,
        )
        .await
    }

    /// The underlying database handle.
    pub fn db(&self) -> &VectorDb {
        &self.db
    }

    /// The embedding function used for records and queries.
    pub fn embedder(&self) -> &Arc<dyn EmbeddingFunction> {
        &self.embedder
    }
}

#[async_trait]
impl VectorIndex for EmbeddedVectorIndex {
    #[instrument(skip_all, fields(collection = %self.collection, count = ids.len()))]
    async fn add(
        &self,
        texts: Vec<String>,
        metadatas: Vec<Metadata>,
        ids: Vec<String>,
    ) -> Result<()> {
        if texts.len() != metadatas.len() || texts.len() != ids.len() {
            return Err(RagError::InvalidInput(format!(
                "add() needs equal-length lists: {} texts, {} metadatas, {} ids",
                texts.len(),
                metadatas.len(),
                ids.len()
            )));
        }
        if ids.is_empty() {
            return Ok(());
        }

        let embeddings = {
            let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
            self.embedder.embed_batch(&refs).await?
        };
        if embeddings.len() != texts.len() {
            return Err(RagError::Embedding(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                embeddings.len()
            )));
        }

        let records: Vec<Record> = ids
            .into_iter()
            .zip(texts)
            .zip(metadatas)
            .zip(embeddings)
            .map(|(((id, document), metadata), embedding)| Record {
                id,
                document,
                metadata,
                embedding,
            })
            .collect();

        let mut unflushed = self.unflushed.lock().await;
        let count = self.db.add(&self.collection, records).await?;
        *unflushed = true;
        debug!(count, "Added records");
        Ok(())
    }

    #[instrument(skip(self, text), fields(collection = %self.collection))]
    async fn query(&self, text: &str, n_results: usize) -> Result<QueryBundle> {
        let embedding = self.embedder.embed(text).await?;
        let hits = self.db.query(&self.collection, &embedding, n_results).await?;

        let mut ids = Vec::with_capacity(hits.len());
        let mut documents = Vec::with_capacity(hits.len());
        let mut metadatas = Vec::with_capacity(hits.len());
        let mut distances = Vec::with_capacity(hits.len());
        for hit in hits {
            ids.push(hit.id);
            documents.push(hit.document);
            metadatas.push(hit.metadata);
            distances.push(hit.distance);
        }

        Ok(QueryBundle {
            ids: vec![ids],
            documents: vec![documents],
            metadatas: vec![metadatas],
            distances: vec![distances],
        })
    }

    #[instrument(skip(self, text, metadata), fields(collection = %self.collection))]
    async fn update(&self, id: &str, text: &str, metadata: Metadata) -> Result<bool> {
        let embedding = self.embedder.embed(text).await?;
        let mut unflushed = self.unflushed.lock().await;
        let updated = self
            .db
            .update(&self.collection, id, text.to_string(), metadata, embedding)
            .await?;
        *unflushed |= updated;
        Ok(updated)
    }

    #[instrument(skip_all, fields(collection = %self.collection, requested = ids.len()))]
    async fn delete(&self, ids: &[String]) -> Result<usize> {
        let mut unflushed = self.unflushed.lock().await;
        let removed = self.db.delete(&self.collection, ids).await?;
        *unflushed |= removed > 0;
        Ok(removed)
    }

    async fn stats(&self) -> Result<CollectionStats> {
        let stats = self.db.collection_stats(&self.collection)?;
        Ok(CollectionStats {
            count: stats.count,
            name: stats.name,
            metadata: stats.metadata,
        })
    }

    async fn get(&self, id: &str) -> Result<Option<IndexRecord>> {
        Ok(self.db.get(&self.collection, id)?.map(|r| IndexRecord {
            id: r.id,
            text: r.document,
            metadata: r.metadata,
            embedding: r.embedding,
        }))
    }

    #[instrument(skip(self), fields(collection = %self.collection))]
    async fn flush(&self) -> Result<()> {
        let mut unflushed = self.unflushed.lock().await;
        if !*unflushed {
            return Ok(());
        }
        self.db.persist_collection(&self.collection).await?;
        *unflushed = false;
        debug!("Flushed collection");
        Ok(())
    }

    fn relevance(&self, distance: f32) -> f32 {
        self.metric.relevance(distance)
    }
}
