//! Vector index abstraction and its embedded implementation.

// Vector index abstraction layer
pub mod vectorstore;

// Embedded implementation over docrag-vector
pub mod docrag_vector;

// Re-exports
pub use docrag_vector::EmbeddedVectorIndex;
pub use vectorstore::{BundleHit, CollectionStats, IndexRecord, QueryBundle, VectorIndex};
