//! Shared helpers for integration tests.

#![allow(dead_code)]

pub mod mocks;

use docrag::db::EmbeddedVectorIndex;
use docrag::rag::{DocumentLoader, EmbeddingFunction, RagManager, TextChunker};
use std::path::Path;
use std::sync::Arc;

/// Manager over an in-memory index using `embedder`.
pub async fn manager_with(embedder: Arc<dyn EmbeddingFunction>) -> RagManager {
    let index = EmbeddedVectorIndex::in_memory("document_store", embedder)
        .await
        .expect("in-memory index");
    RagManager::new(
        Arc::new(index),
        TextChunker::new(512, 50).expect("valid chunker"),
        DocumentLoader::new(),
    )
}

/// Write `content` to `dir/name`, creating parent directories.
pub fn write_file(dir: &Path, name: &str, content: impl AsRef<[u8]>) -> std::path::PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent dir");
    }
    std::fs::write(&path, content).expect("write test file");
    path
}
