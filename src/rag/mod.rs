//! Retrieval Augmented Generation (RAG) Pipeline
//!
//! # Module Structure
//!
//! - [`rag::loader`](crate::rag::loader) - Text extraction for txt, md, pdf and docx
//! - [`rag::chunker`](crate::rag::chunker) - Overlapping chunks cut at natural boundaries
//! - [`rag::embeddings`](crate::rag::embeddings) - Embedding functions (hashing, fastembed)
//! - [`rag::manager`](crate::rag::manager) - Ingestion and retrieval orchestration
//!
//! # RAG Pipeline
//!
//! 1. **Loading** - A file is read and its text extracted with file metadata
//! 2. **Chunking** - The text is split into overlapping chunks
//! 3. **Storage** - Chunks are embedded and stored in the vector index
//! 4. **Retrieval** - A query is embedded, nearest chunks are filtered and ranked
//!
//! # Example
//!
//! ```ignore
//! use docrag::rag::RagManager;
//! use docrag::utils::toml_config::DocragConfig;
//!
//! let manager = RagManager::from_config(&DocragConfig::default()).await?;
//! manager.process_directory(Path::new("./docs"), true).await?;
//! let response = manager.query("refund policy", 5, 0.5).await?;
//! ```

pub mod chunker;
pub mod embeddings;
pub mod loader;
pub mod manager;

pub use chunker::TextChunker;
pub use embeddings::{EmbeddingFunction, EmbeddingProvider, HashingEmbedder};
pub use loader::{DocumentFormat, DocumentLoader};
pub use manager::RagManager;
