//! # docrag
//!
//! Document ingestion and similarity retrieval for RAG pipelines.
//!
//! ## Overview
//!
//! docrag loads documents (plain text, Markdown, PDF, DOCX), splits them into
//! overlapping chunks at natural text boundaries, embeds and stores the chunks
//! in an embedded vector index, and answers similarity queries with ranked,
//! relevance-filtered results.
//!
//! It can be used in two ways:
//!
//! 1. **As a CLI** - Run the `docrag` binary
//! 2. **As a library** - Drive [`RagManager`] from your own Rust project
//!
//! ## Quick Start (Library Usage)
//!
//! ```rust,ignore
//! use docrag::{DocragConfig, RagManager};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> docrag::Result<()> {
//!     let manager = RagManager::from_config(&DocragConfig::default()).await?;
//!
//!     let processed = manager.process_directory(Path::new("./docs"), true).await?;
//!     println!("indexed {} documents", processed.len());
//!
//!     let response = manager.query("What is the refund policy?", 5, 0.5).await?;
//!     for result in response.results {
//!         println!("#{} {:.3} {}", result.rank, result.relevance_score, result.content);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ### Custom Index
//!
//! ```rust,ignore
//! use docrag::db::EmbeddedVectorIndex;
//! use docrag::rag::{DocumentLoader, HashingEmbedder, RagManager, TextChunker};
//! use std::sync::Arc;
//!
//! let embedder = Arc::new(HashingEmbedder::new(384)?);
//! let index = EmbeddedVectorIndex::in_memory("scratch", embedder).await?;
//! let manager = RagManager::new(Arc::new(index), TextChunker::new(256, 32)?, DocumentLoader::new());
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `local-embeddings` | fastembed ONNX embedding models |
//!
//! ## Modules
//!
//! - [`rag`] - Loader, chunker, embeddings and the pipeline manager
//! - [`db`] - Vector index abstraction and the embedded implementation
//! - [`types`] - Shared value types and error handling
//! - [`utils`] - TOML configuration
//! - [`cli`] - Command-line parsing and output

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

/// Command-line interface.
pub mod cli;
/// Vector index abstraction and implementation.
pub mod db;
/// Retrieval Augmented Generation (RAG) components.
pub mod rag;
/// Core types (documents, chunks, results, errors).
pub mod types;
/// Configuration utilities.
pub mod utils;

// Re-export commonly used types
pub use db::{EmbeddedVectorIndex, VectorIndex};
pub use rag::{DocumentLoader, EmbeddingFunction, RagManager, TextChunker};
pub use types::{
    Chunk, Document, Metadata, ProcessedDocument, QueryResponse, QueryResult, RagError,
    RagStatistics, Result,
};
pub use utils::toml_config::DocragConfig;
