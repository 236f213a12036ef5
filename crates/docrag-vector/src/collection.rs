//! Record collection.
//!
//! A collection is a named container of records sharing one dimensionality
//! and one distance metric. Search is exact: every live record is scored, so
//! results are deterministic and deletions take effect immediately.

use crate::distance::DistanceMetric;
use crate::error::{Error, Result};
use crate::types::{Record, RecordId, SearchHit, VectorMetadata};
use crate::CollectionStats;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use tracing::trace;

/// A stored record plus its insertion sequence number, used to break
/// distance ties in insertion order.
#[derive(Debug, Clone)]
struct StoredRecord {
    seq: u64,
    document: String,
    metadata: VectorMetadata,
    embedding: Vec<f32>,
}

#[derive(Debug, Default)]
struct State {
    records: HashMap<RecordId, StoredRecord>,
    next_seq: u64,
}

/// A named collection of records.
pub struct Collection {
    name: String,
    dimensions: usize,
    metric: DistanceMetric,
    metadata: VectorMetadata,
    created_at: DateTime<Utc>,
    state: RwLock<State>,
}

impl Collection {
    /// Create a new, empty collection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if `dimensions` is zero.
    pub fn new(
        name: String,
        dimensions: usize,
        metric: DistanceMetric,
        metadata: VectorMetadata,
    ) -> Result<Self> {
        if dimensions == 0 {
            return Err(Error::Configuration(format!(
                "Collection '{name}' must have at least one dimension"
            )));
        }

        Ok(Self {
            name,
            dimensions,
            metric,
            metadata,
            created_at: Utc::now(),
            state: RwLock::new(State::default()),
        })
    }

    pub(crate) fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Get the collection name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the vector dimensions.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Get the distance metric.
    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Get the collection-level metadata.
    pub fn metadata(&self) -> &VectorMetadata {
        &self.metadata
    }

    /// Creation time of the collection.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Get the number of records in the collection.
    pub fn len(&self) -> usize {
        self.state.read().records.len()
    }

    /// Check if the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check if a record exists.
    pub fn contains(&self, id: &str) -> bool {
        self.state.read().records.contains_key(id)
    }

    /// Add a batch of records.
    ///
    /// The whole batch is validated before anything is written: one bad
    /// record (wrong dimensions, non-finite values, an id that is already
    /// stored or repeats inside the batch) rejects the batch.
    pub fn add(&self, records: Vec<Record>) -> Result<usize> {
        for record in &records {
            self.validate_vector(&record.embedding)?;
        }

        let mut state = self.state.write();

        let mut seen = HashSet::with_capacity(records.len());
        for record in &records {
            if state.records.contains_key(&record.id) || !seen.insert(record.id.as_str()) {
                return Err(Error::DuplicateId(record.id.clone()));
            }
        }

        let count = records.len();
        for record in records {
            let seq = state.next_seq;
            state.next_seq += 1;
            trace!(id = %record.id, seq, "Adding record");
            state.records.insert(
                record.id,
                StoredRecord {
                    seq,
                    document: record.document,
                    metadata: record.metadata,
                    embedding: record.embedding,
                },
            );
        }

        Ok(count)
    }

    /// Replace text, metadata and embedding of an existing record.
    ///
    /// Returns `false` without error when the id is not stored.
    pub fn update(
        &self,
        id: &str,
        document: String,
        metadata: VectorMetadata,
        embedding: Vec<f32>,
    ) -> Result<bool> {
        self.validate_vector(&embedding)?;

        let mut state = self.state.write();
        match state.records.get_mut(id) {
            Some(stored) => {
                stored.document = document;
                stored.metadata = metadata;
                stored.embedding = embedding;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Delete records by id. Missing ids are ignored.
    ///
    /// Returns the number of records actually removed.
    pub fn delete<S: AsRef<str>>(&self, ids: &[S]) -> usize {
        let mut state = self.state.write();
        let mut removed = 0;
        for id in ids {
            let id: &str = id.as_ref();
            if state.records.remove(id).is_some() {
                trace!(id, "Deleted record");
                removed += 1;
            }
        }
        removed
    }

    /// Find the `limit` records closest to `query`, closest first.
    pub fn query(&self, query: &[f32], limit: usize) -> Result<Vec<SearchHit>> {
        self.validate_vector(query)?;

        let state = self.state.read();
        let mut scored: Vec<(f32, u64, &RecordId, &StoredRecord)> = state
            .records
            .iter()
            .map(|(id, stored)| {
                (
                    self.metric.distance(query, &stored.embedding),
                    stored.seq,
                    id,
                    stored,
                )
            })
            .collect();

        scored.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        scored.truncate(limit);

        Ok(scored
            .into_iter()
            .map(|(distance, _, id, stored)| SearchHit {
                id: id.clone(),
                document: stored.document.clone(),
                metadata: stored.metadata.clone(),
                distance,
            })
            .collect())
    }

    /// Get a record by id.
    pub fn get(&self, id: &str) -> Option<Record> {
        let state = self.state.read();
        state.records.get(id).map(|stored| Record {
            id: id.to_string(),
            document: stored.document.clone(),
            metadata: stored.metadata.clone(),
            embedding: stored.embedding.clone(),
        })
    }

    /// Get collection statistics.
    pub fn stats(&self) -> CollectionStats {
        CollectionStats {
            name: self.name.clone(),
            count: self.len(),
            dimensions: self.dimensions,
            metric: self.metric,
            metadata: self.metadata.clone(),
        }
    }

    /// Export all records in insertion order.
    pub fn export_all(&self) -> Vec<Record> {
        let state = self.state.read();
        let mut stored: Vec<(&RecordId, &StoredRecord)> = state.records.iter().collect();
        stored.sort_by_key(|(_, s)| s.seq);
        stored
            .into_iter()
            .map(|(id, s)| Record {
                id: id.clone(),
                document: s.document.clone(),
                metadata: s.metadata.clone(),
                embedding: s.embedding.clone(),
            })
            .collect()
    }

    fn validate_vector(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimensions {
            return Err(Error::DimensionMismatch {
                expected: self.dimensions,
                actual: vector.len(),
            });
        }
        if vector.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidVector(
                "Vector contains NaN or Inf".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collection() -> Collection {
        Collection::new(
            "test".to_string(),
            3,
            DistanceMetric::Cosine,
            VectorMetadata::from_pairs([("description", "unit test")]),
        )
        .unwrap()
    }

    fn record(id: &str, text: &str, embedding: [f32; 3]) -> Record {
        Record {
            id: id.to_string(),
            document: text.to_string(),
            metadata: VectorMetadata::from_pairs([("source", id)]),
            embedding: embedding.to_vec(),
        }
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        let result = Collection::new(
            "bad".to_string(),
            0,
            DistanceMetric::Cosine,
            VectorMetadata::new(),
        );
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_add_and_query_orders_by_distance() {
        let col = collection();
        col.add(vec![
            record("a", "alpha", [0.0, 1.0, 0.0]),
            record("b", "beta", [1.0, 0.0, 0.0]),
            record("c", "gamma", [0.9, 0.1, 0.0]),
        ])
        .unwrap();

        let hits = col.query(&[1.0, 0.0, 0.0], 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "b");
        assert_eq!(hits[1].id, "c");
        assert!(hits[0].distance <= hits[1].distance);
        assert_eq!(hits[0].document, "beta");
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let col = collection();
        col.add(vec![
            record("first", "x", [1.0, 0.0, 0.0]),
            record("second", "y", [1.0, 0.0, 0.0]),
        ])
        .unwrap();

        let hits = col.query(&[1.0, 0.0, 0.0], 10).unwrap();
        let ids: Vec<_> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second"]);
    }

    #[test]
    fn test_duplicate_id_rejects_whole_batch() {
        let col = collection();
        col.add(vec![record("a", "alpha", [1.0, 0.0, 0.0])]).unwrap();

        let result = col.add(vec![
            record("b", "beta", [0.0, 1.0, 0.0]),
            record("a", "again", [0.0, 0.0, 1.0]),
        ]);
        assert!(matches!(result, Err(Error::DuplicateId(id)) if id == "a"));
        assert_eq!(col.len(), 1);
        assert!(!col.contains("b"));
    }

    #[test]
    fn test_duplicate_within_batch() {
        let col = collection();
        let result = col.add(vec![
            record("a", "one", [1.0, 0.0, 0.0]),
            record("a", "two", [0.0, 1.0, 0.0]),
        ]);
        assert!(matches!(result, Err(Error::DuplicateId(_))));
        assert!(col.is_empty());
    }

    #[test]
    fn test_dimension_mismatch_and_nan() {
        let col = collection();
        let short = Record {
            embedding: vec![1.0, 0.0],
            ..record("a", "alpha", [1.0, 0.0, 0.0])
        };
        assert!(matches!(
            col.add(vec![short]),
            Err(Error::DimensionMismatch { expected: 3, actual: 2 })
        ));

        let nan = record("b", "beta", [f32::NAN, 0.0, 0.0]);
        assert!(matches!(col.add(vec![nan]), Err(Error::InvalidVector(_))));
    }

    #[test]
    fn test_update_existing_and_missing() {
        let col = collection();
        col.add(vec![record("a", "alpha", [1.0, 0.0, 0.0])]).unwrap();

        let updated = col
            .update(
                "a",
                "alpha v2".to_string(),
                VectorMetadata::from_pairs([("rev", 2i64)]),
                vec![0.0, 1.0, 0.0],
            )
            .unwrap();
        assert!(updated);

        let stored = col.get("a").unwrap();
        assert_eq!(stored.document, "alpha v2");
        assert_eq!(stored.metadata.get_int("rev"), Some(2));
        assert_eq!(stored.embedding, vec![0.0, 1.0, 0.0]);

        let missing = col
            .update("zzz", String::new(), VectorMetadata::new(), vec![1.0, 0.0, 0.0])
            .unwrap();
        assert!(!missing);
        assert_eq!(col.len(), 1);
    }

    #[test]
    fn test_delete_ignores_missing() {
        let col = collection();
        col.add(vec![
            record("a", "alpha", [1.0, 0.0, 0.0]),
            record("b", "beta", [0.0, 1.0, 0.0]),
        ])
        .unwrap();

        assert_eq!(col.delete(&["a", "nope"]), 1);
        assert_eq!(col.len(), 1);
        let hits = col.query(&[1.0, 0.0, 0.0], 10).unwrap();
        assert!(hits.iter().all(|h| h.id != "a"));
    }

    #[test]
    fn test_stats_and_export_order() {
        let col = collection();
        col.add(vec![
            record("z", "last name first", [1.0, 0.0, 0.0]),
            record("a", "second", [0.0, 1.0, 0.0]),
        ])
        .unwrap();

        let stats = col.stats();
        assert_eq!(stats.name, "test");
        assert_eq!(stats.count, 2);
        assert_eq!(stats.dimensions, 3);
        assert_eq!(stats.metadata.get_string("description"), Some("unit test"));

        let exported: Vec<_> = col.export_all().into_iter().map(|r| r.id).collect();
        assert_eq!(exported, vec!["z".to_string(), "a".to_string()]);
    }
}
