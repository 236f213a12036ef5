//! TOML-based configuration for docrag
//!
//! Settings live in `docrag.toml`. Every field has a default, so an empty or
//! missing file still gives a working setup that keeps its index under
//! `./data/docrag`. A handful of `DOCRAG_*` environment variables override
//! the file (a `.env` file is loaded by the binary before parsing).

use docrag_vector::DistanceMetric;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::rag::embeddings::EmbeddingProvider;

/// Default configuration file name.
pub const CONFIG_FILE: &str = "docrag.toml";

/// Root configuration structure loaded from docrag.toml
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocragConfig {
    /// Chunking and retrieval settings
    #[serde(default)]
    pub rag: RagConfig,

    /// Vector store settings
    #[serde(default)]
    pub store: StoreConfig,

    /// Embedding model settings
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

// ============= RAG Configuration =============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    #[serde(default = "default_separator")]
    pub separator: String,

    /// Candidates requested from the index per query
    #[serde(default = "default_n_results")]
    pub n_results: usize,

    /// Results scoring below this similarity are dropped
    #[serde(default = "default_min_relevance_score")]
    pub min_relevance_score: f32,

    /// Documents processed at once during directory ingestion
    #[serde(default = "default_max_concurrent_documents")]
    pub max_concurrent_documents: usize,
}

fn default_chunk_size() -> usize {
    512
}

fn default_chunk_overlap() -> usize {
    50
}

fn default_separator() -> String {
    "\n".to_string()
}

fn default_n_results() -> usize {
    5
}

fn default_min_relevance_score() -> f32 {
    0.5
}

fn default_max_concurrent_documents() -> usize {
    4
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            separator: default_separator(),
            n_results: default_n_results(),
            min_relevance_score: default_min_relevance_score(),
            max_concurrent_documents: default_max_concurrent_documents(),
        }
    }
}

// ============= Store Configuration =============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Data directory; an empty string keeps everything in memory
    #[serde(default = "default_store_path")]
    pub path: String,

    #[serde(default = "default_collection")]
    pub collection: String,

    /// Stored as the collection's `description` metadata on creation
    #[serde(default = "default_description")]
    pub description: String,

    /// `cosine`, `euclidean` or `dot_product`
    #[serde(default = "default_metric")]
    pub metric: String,
}

fn default_store_path() -> String {
    "./data/docrag".to_string()
}

fn default_collection() -> String {
    "document_store".to_string()
}

fn default_description() -> String {
    "Main document storage for RAG system".to_string()
}

fn default_metric() -> String {
    "cosine".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            collection: default_collection(),
            description: default_description(),
            metric: default_metric(),
        }
    }
}

impl StoreConfig {
    /// Vector database configuration for this store.
    pub fn vector_config(&self) -> docrag_vector::Config {
        if self.path.trim().is_empty() {
            docrag_vector::Config::memory()
        } else {
            docrag_vector::Config::persistent(&self.path)
        }
    }

    /// Parsed distance metric.
    pub fn distance_metric(&self) -> Result<DistanceMetric, ConfigError> {
        self.metric.parse().map_err(ConfigError::ValidationError)
    }
}

// ============= Embedding Configuration =============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// `hashing` or `fastembed`
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model name for the fastembed provider
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Vector width for the hashing provider
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,
}

fn default_provider() -> String {
    "hashing".to_string()
}

fn default_embedding_model() -> String {
    "BAAI/bge-small-en-v1.5".to_string()
}

fn default_dimensions() -> usize {
    384
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_embedding_model(),
            dimensions: default_dimensions(),
        }
    }
}

impl EmbeddingConfig {
    /// Parsed provider.
    pub fn embedding_provider(&self) -> Result<EmbeddingProvider, ConfigError> {
        self.provider
            .parse()
            .map_err(|e: crate::types::RagError| ConfigError::ValidationError(e.to_string()))
    }
}

// ============= Logging Configuration =============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ============= Configuration Loading & Validation =============

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file does not exist
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    /// The configuration file exists but could not be read
    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    /// The file is not valid TOML or does not match the schema
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// A value is out of range or inconsistent with another value
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// An override variable (name, value) could not be parsed
    #[error("Environment variable '{0}' has invalid value '{1}'")]
    InvalidEnvVar(String, String),
}

impl DocragConfig {
    /// Load, apply environment overrides, and validate a config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let mut config: DocragConfig = toml::from_str(&content)?;
        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Load `explicit` if given (it must exist), else `docrag.toml` in the
    /// working directory if present, else defaults.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        let default_path = Path::new(CONFIG_FILE);
        if default_path.exists() {
            return Self::load(default_path);
        }

        let mut config = Self::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `DOCRAG_*` overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply `DOCRAG_*` overrides using `lookup` to read variables.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("DOCRAG_STORE_PATH") {
            self.store.path = path;
        }
        if let Some(collection) = lookup("DOCRAG_COLLECTION") {
            self.store.collection = collection;
        }
        if let Some(size) = lookup("DOCRAG_CHUNK_SIZE") {
            self.rag.chunk_size = parse_env("DOCRAG_CHUNK_SIZE", &size)?;
        }
        if let Some(overlap) = lookup("DOCRAG_CHUNK_OVERLAP") {
            self.rag.chunk_overlap = parse_env("DOCRAG_CHUNK_OVERLAP", &overlap)?;
        }
        if let Some(provider) = lookup("DOCRAG_EMBEDDING_PROVIDER") {
            self.embedding.provider = provider;
        }
        if let Some(level) = lookup("DOCRAG_LOG_LEVEL") {
            self.logging.level = level;
        }
        Ok(())
    }

    /// Validate the configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rag.chunk_size == 0 {
            return Err(ConfigError::ValidationError(
                "rag.chunk_size must be greater than 0".to_string(),
            ));
        }
        if self.rag.chunk_overlap >= self.rag.chunk_size {
            return Err(ConfigError::ValidationError(format!(
                "rag.chunk_overlap ({}) must be smaller than rag.chunk_size ({})",
                self.rag.chunk_overlap, self.rag.chunk_size
            )));
        }
        if !(-1.0..=1.0).contains(&self.rag.min_relevance_score) {
            return Err(ConfigError::ValidationError(format!(
                "rag.min_relevance_score ({}) must be within [-1, 1]",
                self.rag.min_relevance_score
            )));
        }
        if self.rag.n_results == 0 {
            return Err(ConfigError::ValidationError(
                "rag.n_results must be greater than 0".to_string(),
            ));
        }
        if self.rag.max_concurrent_documents == 0 {
            return Err(ConfigError::ValidationError(
                "rag.max_concurrent_documents must be greater than 0".to_string(),
            ));
        }
        if self.store.collection.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "store.collection must not be empty".to_string(),
            ));
        }
        self.store.distance_metric()?;
        self.embedding.embedding_provider()?;
        if self.embedding.dimensions == 0 {
            return Err(ConfigError::ValidationError(
                "embedding.dimensions must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Commented starter configuration written by `docrag init`.
    pub fn template() -> &'static str {
        r#"# docrag configuration

[rag]
# Maximum characters per chunk
chunk_size = 512
# Characters shared between consecutive chunks (must be < chunk_size)
chunk_overlap = 50
separator = "\n"
# Candidates requested per query, before relevance filtering
n_results = 5
# Similarity threshold in [-1, 1]
min_relevance_score = 0.5
# Documents ingested concurrently
max_concurrent_documents = 4

[store]
# Data directory, "" keeps the index in memory
path = "./data/docrag"
collection = "document_store"
description = "Main document storage for RAG system"
# cosine | euclidean | dot_product
metric = "cosine"

[embedding]
# hashing (built in) | fastembed (needs the local-embeddings feature)
provider = "hashing"
model = "BAAI/bge-small-en-v1.5"
# Vector width for the hashing provider
dimensions = 384

[logging]
# Overridden by RUST_LOG
level = "info"
json = false
"#
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnvVar(key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = DocragConfig::default();
        assert_eq!(config.rag.chunk_size, 512);
        assert_eq!(config.rag.chunk_overlap, 50);
        assert_eq!(config.rag.n_results, 5);
        assert!((config.rag.min_relevance_score - 0.5).abs() < f32::EPSILON);
        assert_eq!(config.store.collection, "document_store");
        assert_eq!(config.store.description, "Main document storage for RAG system");
        assert_eq!(config.embedding.provider, "hashing");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: DocragConfig = toml::from_str(
            r#"
[rag]
chunk_size = 300

[store]
path = ""
"#,
        )
        .unwrap();

        assert_eq!(config.rag.chunk_size, 300);
        assert_eq!(config.rag.chunk_overlap, 50);
        assert_eq!(config.store.collection, "document_store");
        assert!(config.store.vector_config().data_path.is_none());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_template_parses_to_defaults() {
        let config: DocragConfig = toml::from_str(DocragConfig::template()).unwrap();
        assert_eq!(config, DocragConfig::default());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = DocragConfig::default();
        config.rag.chunk_overlap = config.rag.chunk_size;
        assert!(matches!(config.validate(), Err(ConfigError::ValidationError(_))));

        let mut config = DocragConfig::default();
        config.rag.chunk_size = 0;
        assert!(config.validate().is_err());

        let mut config = DocragConfig::default();
        config.rag.min_relevance_score = 1.5;
        assert!(config.validate().is_err());

        let mut config = DocragConfig::default();
        config.rag.max_concurrent_documents = 0;
        assert!(config.validate().is_err());

        let mut config = DocragConfig::default();
        config.store.metric = "manhattan".to_string();
        assert!(config.validate().is_err());

        let mut config = DocragConfig::default();
        config.embedding.provider = "openai".to_string();
        assert!(config.validate().is_err());

        let mut config = DocragConfig::default();
        config.embedding.dimensions = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("DOCRAG_STORE_PATH", "/tmp/elsewhere"),
            ("DOCRAG_COLLECTION", "notes"),
            ("DOCRAG_CHUNK_SIZE", "1000"),
            ("DOCRAG_CHUNK_OVERLAP", "100"),
            ("DOCRAG_LOG_LEVEL", "debug"),
        ]);

        let mut config = DocragConfig::default();
        config
            .apply_overrides_from(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.store.path, "/tmp/elsewhere");
        assert_eq!(config.store.collection, "notes");
        assert_eq!(config.rag.chunk_size, 1000);
        assert_eq!(config.rag.chunk_overlap, 100);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_env_override_invalid_number() {
        let mut config = DocragConfig::default();
        let result = config.apply_overrides_from(|key| {
            (key == "DOCRAG_CHUNK_SIZE").then(|| "big".to_string())
        });
        assert!(matches!(result, Err(ConfigError::InvalidEnvVar(k, _)) if k == "DOCRAG_CHUNK_SIZE"));
    }

    #[test]
    fn test_load_missing_file() {
        let result = DocragConfig::load("/no/such/docrag.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_config_error_messages() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("docrag.toml");
        std::fs::write(&path, "[rag\nchunk_size = 1").unwrap();
        let parse = DocragConfig::load(&path).unwrap_err();
        assert!(matches!(parse, ConfigError::ParseError(_)));
        assert!(parse.to_string().starts_with("Failed to parse TOML: "));

        let env = ConfigError::InvalidEnvVar("DOCRAG_CHUNK_SIZE".into(), "big".into());
        assert_eq!(
            env.to_string(),
            "Environment variable 'DOCRAG_CHUNK_SIZE' has invalid value 'big'"
        );
        assert_eq!(
            ConfigError::FileNotFound(PathBuf::from("missing.toml")).to_string(),
            "Configuration file not found: missing.toml"
        );
    }
}
