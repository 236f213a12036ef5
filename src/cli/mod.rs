//! CLI module for docrag
//!
//! Command-line parsing for the `docrag` binary. Uses clap for argument
//! parsing and owo-colors for terminal output.

pub mod init;
pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// docrag - document retrieval for RAG pipelines
///
/// Loads documents, chunks them, indexes the chunks in an embedded vector
/// store and answers similarity queries against it.
#[derive(Parser, Debug)]
#[command(
    name = "docrag",
    version,
    about = "docrag - document ingestion and retrieval for RAG",
    long_about = "Loads txt, md, pdf and docx files, splits them into overlapping chunks,\n\
                  embeds and indexes the chunks, and serves ranked similarity queries.\n\n\
                  Configuration is read from docrag.toml (see 'docrag init').",
    after_help = "EXAMPLES:\n    \
                  docrag init                        # Write a starter docrag.toml\n    \
                  docrag ingest ./docs               # Index every supported file under ./docs\n    \
                  docrag query \"refund policy\" -n 5  # Top matches above the threshold\n    \
                  docrag stats --json                # Index statistics as JSON"
)]
pub struct Cli {
    /// Path to the configuration file (defaults to ./docrag.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Write a starter docrag.toml
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite an existing docrag.toml
        #[arg(short, long)]
        force: bool,
    },

    /// Index a file or every supported file in a directory
    Ingest {
        /// File or directory to ingest
        path: PathBuf,

        /// Only ingest the top level of a directory
        #[arg(long)]
        no_recursive: bool,
    },

    /// Retrieve chunks relevant to a query
    Query {
        /// Query text
        text: String,

        /// Number of candidates to request (defaults to rag.n_results)
        #[arg(short = 'n', long)]
        n_results: Option<usize>,

        /// Minimum relevance score (defaults to rag.min_relevance_score)
        #[arg(short = 's', long)]
        min_score: Option<f32>,

        /// Print the response as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show index statistics
    Stats {
        /// Print statistics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete chunks by id
    Delete {
        /// Chunk ids
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
