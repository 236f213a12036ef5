//! Configuration for docrag-vector.

use std::path::PathBuf;

/// Configuration for the vector database.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to store data on disk. If None, data is kept in memory only.
    pub data_path: Option<PathBuf>,

    /// Write a collection back to disk after every successful mutation.
    ///
    /// Ignored for in-memory databases.
    pub persist_on_write: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_path: None,
            persist_on_write: false,
        }
    }
}

impl Config {
    /// Create an in-memory configuration.
    ///
    /// Data will not be persisted and will be lost when the process exits.
    pub fn memory() -> Self {
        Self::default()
    }

    /// Create a persistent configuration.
    ///
    /// Data will be stored at the specified path and loaded on open.
    pub fn persistent<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            data_path: Some(path.into()),
            persist_on_write: true,
            ..Self::default()
        }
    }

    /// Enable or disable write-through persistence.
    ///
    /// With write-through off, mutations stay in memory until
    /// [`VectorDb::persist_collection`](crate::VectorDb::persist_collection) is called.
    pub fn with_persist_on_write(mut self, enabled: bool) -> Self {
        self.persist_on_write = enabled;
        self
    }

    /// Whether mutations should be flushed to disk immediately.
    pub fn writes_through(&self) -> bool {
        self.data_path.is_some() && self.persist_on_write
    }
}
