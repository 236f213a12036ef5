use docrag_vector::VectorMetadata;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Open string-keyed metadata carried from documents to chunks to index records.
///
/// Keys are not a stable schema. Every chunk receives its own clone, so
/// mutating one chunk's metadata never affects another.
pub type Metadata = VectorMetadata;

pub use docrag_vector::MetadataValue;

// ============= Pipeline Value Types =============

/// A loaded source document: extracted text plus filesystem metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Extracted text content.
    pub content: String,
    /// `filename`, `file_type`, `file_size`, `created_at`, `modified_at`, plus
    /// anything callers add.
    pub metadata: Metadata,
}

impl Document {
    /// Create a document from text and metadata.
    pub fn new(content: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            content: content.into(),
            metadata,
        }
    }
}

/// A fragment of a document produced by the chunker.
///
/// `start_idx` and `end_idx` are character offsets into the source content,
/// with `start_idx < end_idx`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// The chunk text, `content[start_idx..end_idx]` in characters.
    pub text: String,
    /// Copy of the document metadata plus `chunk_index`, `start_idx`, `end_idx`.
    pub metadata: Metadata,
    /// Inclusive start offset in characters.
    pub start_idx: usize,
    /// Exclusive end offset in characters.
    pub end_idx: usize,
}

impl Chunk {
    /// Number of characters covered by this chunk.
    pub fn len(&self) -> usize {
        self.end_idx - self.start_idx
    }

    /// Whether the chunk covers no characters. Never true for chunker output.
    pub fn is_empty(&self) -> bool {
        self.start_idx == self.end_idx
    }
}

/// Outcome of indexing one document.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessedDocument {
    /// The loaded document.
    pub document: Document,
    /// Number of chunks written to the index.
    pub num_chunks: usize,
    /// Ids assigned to those chunks, in chunk order.
    pub chunk_ids: Vec<String>,
}

/// One ranked retrieval hit.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    /// Chunk text.
    pub content: String,
    /// Chunk metadata.
    pub metadata: Metadata,
    /// Similarity to the query, higher is more relevant.
    pub relevance_score: f32,
    /// 1-based position in the index's native ordering, assigned before filtering.
    pub rank: usize,
}

/// Response to a retrieval query.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    /// The query text, echoed.
    pub query: String,
    /// Results that passed the relevance threshold.
    pub results: Vec<QueryResult>,
    /// `results.len()`.
    pub total_results: usize,
    /// RFC 3339 timestamp of when the query was served.
    pub timestamp: String,
}

/// Snapshot of index size and pipeline configuration.
#[derive(Debug, Clone, Serialize)]
pub struct RagStatistics {
    /// Number of chunk records in the collection.
    pub total_documents: usize,
    /// Collection name.
    pub collection_name: String,
    /// Collection-level metadata.
    pub collection_metadata: Metadata,
    /// Dotted lowercase extensions the loader accepts, sorted.
    pub supported_file_types: Vec<String>,
    /// Configured maximum characters per chunk.
    pub chunk_size: usize,
    /// Configured characters shared between consecutive chunks.
    pub chunk_overlap: usize,
}

// ============= Error Types =============

/// Errors produced by the docrag pipeline.
#[derive(Debug, thiserror::Error)]
pub enum RagError {
    /// The path does not exist.
    #[error("Path not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The file extension is not one of the supported formats.
    #[error("Unsupported file format '{extension}': {}", .path.display())]
    UnsupportedFormat {
        /// Offending file.
        path: PathBuf,
        /// Extension as found on disk (empty if none).
        extension: String,
    },

    /// Format-specific extraction failed.
    #[error("Failed to load {}: {source}", .path.display())]
    Load {
        /// File being loaded.
        path: PathBuf,
        /// Underlying cause.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A batch root is missing or not a directory.
    #[error("Invalid directory: {}", .0.display())]
    InvalidDirectory(PathBuf),

    /// The vector index rejected an operation.
    #[error("Index error: {0}")]
    Index(String),

    /// The embedding function failed.
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Invalid pipeline configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid argument to an operation.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The operation was cancelled by the caller.
    #[error("Operation cancelled")]
    Cancelled,
}

impl RagError {
    /// Wrap an extraction failure for `path`.
    pub fn load<E>(path: impl Into<PathBuf>, source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        RagError::Load {
            path: path.into(),
            source: source.into(),
        }
    }
}

impl From<docrag_vector::Error> for RagError {
    fn from(err: docrag_vector::Error) -> Self {
        RagError::Index(err.to_string())
    }
}

/// Result alias for docrag operations.
pub type Result<T> = std::result::Result<T, RagError>;
