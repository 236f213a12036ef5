//! Init command implementation
//!
//! Writes a commented starter `docrag.toml`.

use super::output::Output;
use crate::utils::toml_config::{DocragConfig, CONFIG_FILE};
use std::fs;
use std::path::PathBuf;

/// Result of the init operation
#[derive(Debug, PartialEq)]
pub enum InitResult {
    /// Configuration written
    Success,
    /// docrag.toml already exists and `force` was not set
    AlreadyExists,
    /// An error occurred during initialization
    Error(String),
}

/// Configuration for the init command
pub struct InitConfig {
    /// Directory to initialize
    pub path: PathBuf,
    /// Overwrite an existing docrag.toml
    pub force: bool,
}

/// Run the init command
pub fn run(config: InitConfig, output: &Output) -> InitResult {
    output.header("Initializing docrag");

    let config_path = config.path.join(CONFIG_FILE);
    if config_path.exists() && !config.force {
        output.warning(&format!("{} already exists!", CONFIG_FILE));
        output.hint("Use --force to overwrite it");
        return InitResult::AlreadyExists;
    }

    if let Err(e) = fs::create_dir_all(&config.path) {
        output.error(&format!("Failed to create {}: {}", config.path.display(), e));
        return InitResult::Error(e.to_string());
    }

    if let Err(e) = fs::write(&config_path, DocragConfig::template()) {
        output.error(&format!("Failed to write {}: {}", CONFIG_FILE, e));
        return InitResult::Error(e.to_string());
    }
    output.created("config", &config_path.display().to_string());

    output.header("Next Steps");
    output.info("Index some documents:");
    output.command("docrag ingest ./docs");
    output.info("Ask a question:");
    output.command("docrag query \"refund policy\"");
    output.hint("Build with --features local-embeddings to use fastembed models");

    InitResult::Success
}
