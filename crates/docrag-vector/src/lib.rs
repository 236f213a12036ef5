//! # docrag-vector
//!
//! A pure-Rust embedded vector store for document chunks. Each collection
//! holds records (id, text, metadata, embedding) and answers exact
//! nearest-neighbour queries.
//!
//! ## Features
//!
//! - **Exact search**: every record is scored, results are deterministic and
//!   deletions take effect immediately
//! - **Thread-Safe**: collections are shared behind `Arc` and guarded per collection
//! - **Persistence**: optional JSON snapshots, written atomically
//! - **Multiple Distance Metrics**: Cosine, Euclidean (L2), Dot Product
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use docrag_vector::{Config, DistanceMetric, Record, VectorDb, VectorMetadata};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), docrag_vector::Error> {
//!     let db = VectorDb::open(Config::memory()).await?;
//!     db.get_or_create_collection("documents", 384, DistanceMetric::Cosine, VectorMetadata::new())
//!         .await?;
//!
//!     db.add("documents", vec![Record {
//!         id: "chunk-1".into(),
//!         document: "hello".into(),
//!         metadata: VectorMetadata::new(),
//!         embedding: vec![0.1f32; 384],
//!     }])
//!     .await?;
//!
//!     let hits = db.query("documents", &vec![0.1f32; 384], 5).await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod collection;
pub mod config;
pub mod distance;
pub mod error;
pub mod persistence;
pub mod types;

// Re-exports for convenience
pub use collection::Collection;
pub use config::Config;
pub use distance::DistanceMetric;
pub use error::{Error, Result};
pub use types::{MetadataValue, Record, RecordId, SearchHit, VectorMetadata};

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// The main vector database instance.
///
/// `VectorDb` manages multiple collections, each holding records of one
/// dimensionality. Cloning is cheap and every clone sees the same collections.
///
/// # Thread Safety
///
/// The collection registry is an `scc::HashMap`, safe to touch across
/// `.await` points. Record access is guarded per collection.
#[derive(Clone)]
pub struct VectorDb {
    inner: Arc<VectorDbInner>,
}

struct VectorDbInner {
    config: Config,
    collections: scc::HashMap<String, Arc<Collection>>,
}

impl VectorDb {
    /// Open or create a vector database with the given configuration.
    ///
    /// Persistent databases load every collection listed in
    /// `collections.json`. Collections that fail to load are skipped with a warning.
    #[instrument(skip(config), fields(persistent = config.data_path.is_some()))]
    pub async fn open(config: Config) -> Result<Self> {
        info!("Opening vector database");

        let db = Self {
            inner: Arc::new(VectorDbInner {
                config: config.clone(),
                collections: scc::HashMap::new(),
            }),
        };

        if let Some(ref path) = config.data_path {
            db.load_collections(path).await?;
        }

        Ok(db)
    }

    /// The configuration this database was opened with.
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Create a new collection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CollectionExists`] if the name is taken.
    #[instrument(skip(self, metadata))]
    pub async fn create_collection(
        &self,
        name: &str,
        dimensions: usize,
        metric: DistanceMetric,
        metadata: VectorMetadata,
    ) -> Result<Arc<Collection>> {
        info!(name, dimensions, %metric, "Creating collection");

        if self.inner.collections.contains(name) {
            return Err(Error::CollectionExists(name.to_string()));
        }

        let collection = Arc::new(Collection::new(
            name.to_string(),
            dimensions,
            metric,
            metadata,
        )?);

        // Insert returns Err if another task won the race
        if self
            .inner
            .collections
            .insert(name.to_string(), collection.clone())
            .is_err()
        {
            return Err(Error::CollectionExists(name.to_string()));
        }

        if let Some(ref path) = self.inner.config.data_path {
            persistence::save_collection(path, &collection).await?;
            persistence::save_catalog(path, &self.list_collections()).await?;
        }

        Ok(collection)
    }

    /// Return the named collection, creating it if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if an existing collection was
    /// created with different dimensions.
    pub async fn get_or_create_collection(
        &self,
        name: &str,
        dimensions: usize,
        metric: DistanceMetric,
        metadata: VectorMetadata,
    ) -> Result<Arc<Collection>> {
        if let Ok(existing) = self.get_collection(name) {
            if existing.dimensions() != dimensions {
                return Err(Error::DimensionMismatch {
                    expected: existing.dimensions(),
                    actual: dimensions,
                });
            }
            if existing.metric() != metric {
                warn!(
                    name,
                    stored = %existing.metric(),
                    requested = %metric,
                    "Collection exists with a different metric, keeping the stored one"
                );
            }
            return Ok(existing);
        }

        match self
            .create_collection(name, dimensions, metric, metadata)
            .await
        {
            Err(Error::CollectionExists(_)) => self.get_collection(name),
            other => other,
        }
    }

    /// List all collection names, sorted.
    pub fn list_collections(&self) -> Vec<String> {
        let mut names = Vec::new();
        self.inner.collections.scan(|k, _| {
            names.push(k.clone());
        });
        names.sort();
        names
    }

    /// Get a handle to a collection.
    pub fn get_collection(&self, name: &str) -> Result<Arc<Collection>> {
        self.inner
            .collections
            .read(name, |_, v| v.clone())
            .ok_or_else(|| Error::CollectionNotFound(name.to_string()))
    }

    /// Add a batch of records. All-or-nothing, see [`Collection::add`].
    #[instrument(skip(self, records), fields(count = records.len()))]
    pub async fn add(&self, collection: &str, records: Vec<Record>) -> Result<usize> {
        let col = self.get_collection(collection)?;
        let count = col.add(records)?;
        debug!(count, "Added records");
        self.write_through(&col).await?;
        Ok(count)
    }

    /// Replace an existing record. Returns `false` if the id is not stored.
    #[instrument(skip(self, document, metadata, embedding))]
    pub async fn update(
        &self,
        collection: &str,
        id: &str,
        document: String,
        metadata: VectorMetadata,
        embedding: Vec<f32>,
    ) -> Result<bool> {
        let col = self.get_collection(collection)?;
        let updated = col.update(id, document, metadata, embedding)?;
        if updated {
            self.write_through(&col).await?;
        }
        Ok(updated)
    }

    /// Delete records by id, returning how many were removed.
    #[instrument(skip(self, ids), fields(requested = ids.len()))]
    pub async fn delete<S: AsRef<str> + Sync>(&self, collection: &str, ids: &[S]) -> Result<usize> {
        let col = self.get_collection(collection)?;
        let count = col.delete(ids);
        debug!(count, "Deleted records");
        if count > 0 {
            self.write_through(&col).await?;
        }
        Ok(count)
    }

    /// Find the `limit` nearest records to `embedding`, closest first.
    #[instrument(skip(self, embedding), fields(dim = embedding.len()))]
    pub async fn query(
        &self,
        collection: &str,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchHit>> {
        let col = self.get_collection(collection)?;
        let hits = col.query(embedding, limit)?;
        debug!(count = hits.len(), "Query completed");
        Ok(hits)
    }

    /// Get a record by id.
    pub fn get(&self, collection: &str, id: &str) -> Result<Option<Record>> {
        Ok(self.get_collection(collection)?.get(id))
    }

    /// Get the number of records in a collection.
    pub fn count(&self, collection: &str) -> Result<usize> {
        Ok(self.get_collection(collection)?.len())
    }

    /// Get collection statistics.
    pub fn collection_stats(&self, collection: &str) -> Result<CollectionStats> {
        Ok(self.get_collection(collection)?.stats())
    }

    /// Write one collection to disk. No-op for in-memory databases.
    ///
    /// Needed after mutations when write-through is off, see
    /// [`Config::with_persist_on_write`].
    #[instrument(skip(self))]
    pub async fn persist_collection(&self, name: &str) -> Result<()> {
        let Some(ref path) = self.inner.config.data_path else {
            debug!("Skipping persist for in-memory database");
            return Ok(());
        };
        let col = self.get_collection(name)?;
        persistence::save_collection(path, &col).await
    }

    async fn write_through(&self, collection: &Collection) -> Result<()> {
        if !self.inner.config.writes_through() {
            return Ok(());
        }
        if let Some(ref path) = self.inner.config.data_path {
            persistence::save_collection(path, collection).await?;
        }
        Ok(())
    }

    async fn load_collections(&self, path: &Path) -> Result<()> {
        if !tokio::fs::try_exists(path).await? {
            tokio::fs::create_dir_all(path).await?;
            return Ok(());
        }

        for name in persistence::load_catalog(path).await? {
            match persistence::load_collection(path, &name).await {
                Ok(collection) => {
                    let _ = self
                        .inner
                        .collections
                        .insert(name.clone(), Arc::new(collection));
                }
                Err(e) => {
                    warn!(name, error = %e, "Failed to load collection, skipping");
                }
            }
        }

        Ok(())
    }
}

/// Statistics about a collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionStats {
    /// Name of the collection.
    pub name: String,
    /// Number of records in the collection.
    pub count: usize,
    /// Dimensionality of embeddings.
    pub dimensions: usize,
    /// Distance metric used.
    pub metric: DistanceMetric,
    /// Collection-level metadata.
    pub metadata: VectorMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(id: &str, embedding: [f32; 3]) -> Record {
        Record {
            id: id.to_string(),
            document: format!("text of {id}"),
            metadata: VectorMetadata::from_pairs([("source", id)]),
            embedding: embedding.to_vec(),
        }
    }

    #[tokio::test]
    async fn test_create_and_query() {
        let db = VectorDb::open(Config::memory()).await.unwrap();
        db.create_collection("test", 3, DistanceMetric::Cosine, VectorMetadata::new())
            .await
            .unwrap();

        db.add(
            "test",
            vec![
                record("vec1", [1.0, 0.0, 0.0]),
                record("vec2", [0.0, 1.0, 0.0]),
                record("vec3", [0.9, 0.1, 0.0]),
            ],
        )
        .await
        .unwrap();

        let hits = db.query("test", &[1.0, 0.0, 0.0], 10).await.unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].id, "vec1");
        assert_eq!(hits[2].id, "vec2");
    }

    #[tokio::test]
    async fn test_collection_registry() {
        let db = VectorDb::open(Config::memory()).await.unwrap();
        assert!(matches!(
            db.get_collection("test"),
            Err(Error::CollectionNotFound(_))
        ));

        db.create_collection("test", 8, DistanceMetric::Euclidean, VectorMetadata::new())
            .await
            .unwrap();
        db.create_collection("alpha", 8, DistanceMetric::Cosine, VectorMetadata::new())
            .await
            .unwrap();
        assert_eq!(db.list_collections(), vec!["alpha".to_string(), "test".to_string()]);
        assert_eq!(db.get_collection("test").unwrap().metric(), DistanceMetric::Euclidean);
        assert!(matches!(
            db.add("missing", vec![record("a", [1.0, 0.0, 0.0])]).await,
            Err(Error::CollectionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_collection_error() {
        let db = VectorDb::open(Config::memory()).await.unwrap();
        db.create_collection("test", 8, DistanceMetric::Cosine, VectorMetadata::new())
            .await
            .unwrap();

        let result = db
            .create_collection("test", 8, DistanceMetric::Cosine, VectorMetadata::new())
            .await;
        assert!(matches!(result, Err(Error::CollectionExists(_))));
    }

    #[tokio::test]
    async fn test_get_or_create_reuses_and_checks_dimensions() {
        let db = VectorDb::open(Config::memory()).await.unwrap();
        let first = db
            .get_or_create_collection("docs", 3, DistanceMetric::Cosine, VectorMetadata::new())
            .await
            .unwrap();
        first.add(vec![record("a", [1.0, 0.0, 0.0])]).unwrap();

        let again = db
            .get_or_create_collection("docs", 3, DistanceMetric::Cosine, VectorMetadata::new())
            .await
            .unwrap();
        assert_eq!(again.len(), 1);

        let wrong = db
            .get_or_create_collection("docs", 4, DistanceMetric::Cosine, VectorMetadata::new())
            .await;
        assert!(matches!(
            wrong,
            Err(Error::DimensionMismatch { expected: 3, actual: 4 })
        ));
    }

    #[tokio::test]
    async fn test_persistent_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::persistent(temp_dir.path());

        {
            let db = VectorDb::open(config.clone()).await.unwrap();
            db.create_collection(
                "docs",
                3,
                DistanceMetric::Cosine,
                VectorMetadata::from_pairs([("description", "persisted")]),
            )
            .await
            .unwrap();
            db.add("docs", vec![record("a", [1.0, 0.0, 0.0]), record("b", [0.0, 1.0, 0.0])])
                .await
                .unwrap();
            assert_eq!(db.delete("docs", &["b"]).await.unwrap(), 1);
        }

        let db = VectorDb::open(config).await.unwrap();
        let stats = db.collection_stats("docs").unwrap();
        assert_eq!(stats.count, 1);
        assert_eq!(stats.metadata.get_string("description"), Some("persisted"));
        assert!(db.get("docs", "a").unwrap().is_some());
        assert!(db.get("docs", "b").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_deferred_writes_land_on_persist_collection() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::persistent(temp_dir.path()).with_persist_on_write(false);

        let db = VectorDb::open(config.clone()).await.unwrap();
        db.create_collection("docs", 3, DistanceMetric::Cosine, VectorMetadata::new())
            .await
            .unwrap();
        db.add("docs", vec![record("a", [1.0, 0.0, 0.0])]).await.unwrap();
        db.add("docs", vec![record("b", [0.0, 1.0, 0.0])]).await.unwrap();

        let before = VectorDb::open(config.clone()).await.unwrap();
        assert_eq!(before.count("docs").unwrap(), 0);

        db.persist_collection("docs").await.unwrap();
        let after = VectorDb::open(config).await.unwrap();
        assert_eq!(after.count("docs").unwrap(), 2);
        assert!(after.get("docs", "b").unwrap().is_some());
    }

    #[tokio::test]
    async fn test_update_through_db() {
        let db = VectorDb::open(Config::memory()).await.unwrap();
        db.create_collection("docs", 3, DistanceMetric::Cosine, VectorMetadata::new())
            .await
            .unwrap();
        db.add("docs", vec![record("a", [1.0, 0.0, 0.0])]).await.unwrap();

        let updated = db
            .update("docs", "a", "new".into(), VectorMetadata::new(), vec![0.0, 0.0, 1.0])
            .await
            .unwrap();
        assert!(updated);
        assert_eq!(db.get("docs", "a").unwrap().unwrap().document, "new");

        let missing = db
            .update("docs", "b", "x".into(), VectorMetadata::new(), vec![0.0, 0.0, 1.0])
            .await
            .unwrap();
        assert!(!missing);
        assert_eq!(db.count("docs").unwrap(), 1);
    }
}
