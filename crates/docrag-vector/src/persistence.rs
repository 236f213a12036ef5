//! Persistence layer for docrag-vector.
//!
//! Each collection lives in its own directory under the database root:
//!
//! - `{base_path}/{name}/collection.json` - name, dimensions, metric, metadata
//! - `{base_path}/{name}/records.json` - all records in insertion order
//!
//! Files are written to a temporary sibling and renamed into place, so a
//! crash mid-write leaves the previous snapshot intact.

use crate::collection::Collection;
use crate::distance::DistanceMetric;
use crate::error::{Error, Result};
use crate::types::{Record, VectorMetadata};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

const MANIFEST_FILE: &str = "collection.json";
const RECORDS_FILE: &str = "records.json";

/// Collection header stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CollectionManifest {
    name: String,
    dimensions: usize,
    metric: DistanceMetric,
    #[serde(default)]
    metadata: VectorMetadata,
    created_at: DateTime<Utc>,
}

/// Save a collection to disk.
pub async fn save_collection(base_path: &Path, collection: &Collection) -> Result<()> {
    let collection_path = base_path.join(collection.name());
    tokio::fs::create_dir_all(&collection_path).await?;

    let manifest = CollectionManifest {
        name: collection.name().to_string(),
        dimensions: collection.dimensions(),
        metric: collection.metric(),
        metadata: collection.metadata().clone(),
        created_at: collection.created_at(),
    };
    let manifest_json = serde_json::to_vec_pretty(&manifest)
        .map_err(|e| Error::Persistence(format!("Failed to serialize manifest: {}", e)))?;
    write_atomic(&collection_path.join(MANIFEST_FILE), &manifest_json).await?;

    let records = collection.export_all();
    let records_json = serde_json::to_vec(&records)
        .map_err(|e| Error::Persistence(format!("Failed to serialize records: {}", e)))?;
    write_atomic(&collection_path.join(RECORDS_FILE), &records_json).await?;

    debug!(name = collection.name(), count = records.len(), "Saved collection");
    Ok(())
}

/// Load a collection from disk.
pub async fn load_collection(base_path: &Path, name: &str) -> Result<Collection> {
    let collection_path = base_path.join(name);
    let manifest_path = collection_path.join(MANIFEST_FILE);

    if !tokio::fs::try_exists(&manifest_path).await? {
        return Err(Error::CollectionNotFound(name.to_string()));
    }

    let manifest_json = tokio::fs::read(&manifest_path).await?;
    let manifest: CollectionManifest = serde_json::from_slice(&manifest_json)
        .map_err(|e| Error::Persistence(format!("Failed to parse {}: {}", MANIFEST_FILE, e)))?;

    let collection = Collection::new(
        manifest.name,
        manifest.dimensions,
        manifest.metric,
        manifest.metadata,
    )?
    .with_created_at(manifest.created_at);

    let records_path = collection_path.join(RECORDS_FILE);
    if tokio::fs::try_exists(&records_path).await? {
        let records_json = tokio::fs::read(&records_path).await?;
        let records: Vec<Record> = serde_json::from_slice(&records_json)
            .map_err(|e| Error::Persistence(format!("Failed to parse {}: {}", RECORDS_FILE, e)))?;
        let count = collection.add(records)?;
        debug!(name, count, "Loaded records");
    }

    info!(name, dimensions = collection.dimensions(), "Loaded collection");
    Ok(collection)
}

/// Write the list of collection names.
pub async fn save_catalog(base_path: &Path, names: &[String]) -> Result<()> {
    tokio::fs::create_dir_all(base_path).await?;
    let data = serde_json::to_vec_pretty(names)
        .map_err(|e| Error::Persistence(format!("Failed to serialize collections: {}", e)))?;
    write_atomic(&base_path.join("collections.json"), &data).await
}

/// Read the list of collection names. A missing catalog means no collections.
pub async fn load_catalog(base_path: &Path) -> Result<Vec<String>> {
    let catalog_path = base_path.join("collections.json");
    if !tokio::fs::try_exists(&catalog_path).await? {
        return Ok(Vec::new());
    }
    let data = tokio::fs::read(&catalog_path).await?;
    serde_json::from_slice(&data)
        .map_err(|e| Error::Persistence(format!("Failed to parse collections.json: {}", e)))
}

async fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let tmp_path = path.with_extension("json.tmp");
    let mut file = tokio::fs::File::create(&tmp_path).await?;
    file.write_all(data).await?;
    file.flush().await?;
    file.sync_all().await?;
    drop(file);
    tokio::fs::rename(&tmp_path, path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_save_load_collection() {
        let temp_dir = TempDir::new().unwrap();
        let base_path = temp_dir.path();

        let collection = Collection::new(
            "docs".to_string(),
            3,
            DistanceMetric::Cosine,
            VectorMetadata::from_pairs([("description", "saved")]),
        )
        .unwrap();
        collection
            .add(vec![
                Record {
                    id: "b".to_string(),
                    document: "second id first".to_string(),
                    metadata: VectorMetadata::from_pairs([("chunk_index", 0i64)]),
                    embedding: vec![1.0, 0.0, 0.0],
                },
                Record {
                    id: "a".to_string(),
                    document: "first id second".to_string(),
                    metadata: VectorMetadata::new(),
                    embedding: vec![1.0, 0.0, 0.0],
                },
            ])
            .unwrap();

        save_collection(base_path, &collection).await.unwrap();
        let loaded = load_collection(base_path, "docs").await.unwrap();

        assert_eq!(loaded.name(), "docs");
        assert_eq!(loaded.dimensions(), 3);
        assert_eq!(loaded.metric(), DistanceMetric::Cosine);
        assert_eq!(loaded.metadata().get_string("description"), Some("saved"));
        assert_eq!(loaded.created_at(), collection.created_at());
        assert_eq!(loaded.len(), 2);

        // Insertion order survives the round trip, so ties still resolve the same way.
        let hits = loaded.query(&[1.0, 0.0, 0.0], 2).unwrap();
        assert_eq!(hits[0].id, "b");
        assert_eq!(hits[1].id, "a");
        assert_eq!(loaded.get("b").unwrap().metadata.get_int("chunk_index"), Some(0));
    }

    #[tokio::test]
    async fn test_load_missing_collection() {
        let temp_dir = TempDir::new().unwrap();
        let result = load_collection(temp_dir.path(), "ghost").await;
        assert!(matches!(result, Err(Error::CollectionNotFound(_))));
    }

    #[tokio::test]
    async fn test_catalog_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        assert!(load_catalog(temp_dir.path()).await.unwrap().is_empty());

        let names = vec!["a".to_string(), "b".to_string()];
        save_catalog(temp_dir.path(), &names).await.unwrap();
        assert_eq!(load_catalog(temp_dir.path()).await.unwrap(), names);
    }
}
