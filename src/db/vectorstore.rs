//! Vector Index Abstraction Layer
//!
//! The RAG pipeline talks to its similarity index only through the
//! [`VectorIndex`] trait. An index owns its embedding function: callers hand
//! it text, never vectors.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    VectorIndex Trait                      │
//! ├──────────────────────────────────────────────────────────┤
//! │   add   │  query  │  update  │  delete  │  stats  │ get  │
//! └──────────────────────────────────────────────────────────┘
//!                          ▲
//!                          │
//!              ┌───────────┴───────────┐
//!              │  EmbeddedVectorIndex  │
//!              │ docrag-vector + embed │
//!              └───────────────────────┘
//! ```

use crate::types::{Metadata, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// ============================================================================
// Vector Index Trait
// ============================================================================

/// A collection of embedded text records addressed by caller-supplied ids.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Embed `texts` and store them under `ids`.
    ///
    /// The three lists must have equal length. Ids must not already exist in
    /// the collection; a batch with any duplicate is rejected as a whole.
    async fn add(&self, texts: Vec<String>, metadatas: Vec<Metadata>, ids: Vec<String>)
        -> Result<()>;

    /// Return the `n_results` records nearest to `text`, closest first.
    async fn query(&self, text: &str, n_results: usize) -> Result<QueryBundle>;

    /// Replace the text (re-embedding it) and metadata of an existing record.
    ///
    /// Returns `false` if no record has this id.
    async fn update(&self, id: &str, text: &str, metadata: Metadata) -> Result<bool>;

    /// Remove records by id. Unknown ids are ignored.
    ///
    /// Returns the number of records removed.
    async fn delete(&self, ids: &[String]) -> Result<usize>;

    /// Collection size and configuration.
    async fn stats(&self) -> Result<CollectionStats>;

    /// Fetch a single record.
    async fn get(&self, id: &str) -> Result<Option<IndexRecord>>;

    /// Make earlier mutations durable.
    ///
    /// Implementations may keep writes in memory until this is called. Stores
    /// without durable state have nothing to do.
    async fn flush(&self) -> Result<()> {
        Ok(())
    }

    /// Convert a distance from [`QueryBundle::distances`] into a similarity
    /// score where higher means more relevant.
    fn relevance(&self, distance: f32) -> f32;
}

// ============================================================================
// Common Types
// ============================================================================

/// Raw query output, grouped per logical query.
///
/// Each outer vector has one entry per query issued; the inner vectors are
/// parallel and ordered by ascending distance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryBundle {
    /// Record ids.
    pub ids: Vec<Vec<String>>,
    /// Record texts.
    pub documents: Vec<Vec<String>>,
    /// Record metadata.
    pub metadatas: Vec<Vec<Metadata>>,
    /// Distances to the query, lower is closer.
    pub distances: Vec<Vec<f32>>,
}

/// One hit out of a [`QueryBundle`] group.
#[derive(Debug, Clone, PartialEq)]
pub struct BundleHit {
    /// Record id.
    pub id: String,
    /// Record text.
    pub document: String,
    /// Record metadata.
    pub metadata: Metadata,
    /// Distance to the query.
    pub distance: f32,
}

impl QueryBundle {
    /// Number of query groups.
    pub fn num_queries(&self) -> usize {
        self.ids.len()
    }

    /// Take the hits of query group `index`, in index order.
    ///
    /// Returns an empty list for an out-of-range group.
    pub fn into_hits(self, index: usize) -> Vec<BundleHit> {
        fn group<T>(groups: Vec<Vec<T>>, index: usize) -> Vec<T> {
            groups.into_iter().nth(index).unwrap_or_default()
        }

        let ids = group(self.ids, index);
        let documents = group(self.documents, index);
        let metadatas = group(self.metadatas, index);
        let distances = group(self.distances, index);

        ids.into_iter()
            .zip(documents)
            .zip(metadatas)
            .zip(distances)
            .map(|(((id, document), metadata), distance)| BundleHit {
                id,
                document,
                metadata,
                distance,
            })
            .collect()
    }
}

/// A stored record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRecord {
    /// Record id.
    pub id: String,
    /// Stored text.
    pub text: String,
    /// Stored metadata.
    pub metadata: Metadata,
    /// Embedding of `text`.
    pub embedding: Vec<f32>,
}

/// Statistics about an index collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionStats {
    /// Number of records.
    pub count: usize,
    /// Collection name.
    pub name: String,
    /// Collection-level metadata.
    pub metadata: Metadata,
}
