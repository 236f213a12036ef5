//! Colored output helpers for CLI
//!
//! Human-readable rendering of ingestion, query and statistics results.

use crate::types::{ProcessedDocument, QueryResponse, RagStatistics};
use owo_colors::OwoColorize;

/// Longest excerpt shown per query result.
const EXCERPT_CHARS: usize = 240;

/// Output style configuration
pub struct Output {
    /// Whether to use colored output
    pub colored: bool,
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

impl Output {
    /// Create a new output helper with colors enabled
    pub fn new() -> Self {
        Self { colored: true }
    }

    /// Create a new output helper with colors disabled
    pub fn no_color() -> Self {
        Self { colored: false }
    }

    /// Print a success message with a checkmark
    pub fn success(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "✓".green().bold(), message.green());
        } else {
            println!("  [OK] {}", message);
        }
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "•".blue(), message);
        } else {
            println!("  [INFO] {}", message);
        }
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "⚠".yellow().bold(), message.yellow());
        } else {
            println!("  [WARN] {}", message);
        }
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        if self.colored {
            eprintln!("  {} {}", "✗".red().bold(), message.red());
        } else {
            eprintln!("  [ERROR] {}", message);
        }
    }

    /// Print a file creation message
    pub fn created(&self, file_type: &str, path: &str) {
        if self.colored {
            println!(
                "  {} {} {}",
                "✓".green().bold(),
                file_type.dimmed(),
                path.bright_white()
            );
        } else {
            println!("  [CREATED] {} {}", file_type, path);
        }
    }

    /// Print a header for a section
    pub fn header(&self, title: &str) {
        if self.colored {
            println!("\n  {}", title.bright_white().bold().underline());
        } else {
            println!("\n  === {} ===", title);
        }
    }

    /// Print a key-value pair
    pub fn kv(&self, key: &str, value: &str) {
        if self.colored {
            println!("    {}: {}", key.dimmed(), value.bright_white());
        } else {
            println!("    {}: {}", key, value);
        }
    }

    /// Print a hint/tip message
    pub fn hint(&self, message: &str) {
        if self.colored {
            println!("\n  {} {}", "›".dimmed(), message.dimmed().italic());
        } else {
            println!("\n  [TIP] {}", message);
        }
    }

    /// Print a command suggestion
    pub fn command(&self, cmd: &str) {
        if self.colored {
            println!("     {}", format!("$ {}", cmd).bright_cyan());
        } else {
            println!("     $ {}", cmd);
        }
    }

    /// Summarise ingested documents
    pub fn ingested(&self, documents: &[ProcessedDocument]) {
        self.header("Ingested");
        for doc in documents {
            let name = doc
                .document
                .metadata
                .get_string("filename")
                .unwrap_or("<unnamed>");
            self.success(&format!("{} ({} chunks)", name, doc.num_chunks));
        }
        let chunks: usize = documents.iter().map(|d| d.num_chunks).sum();
        self.info(&format!(
            "{} documents, {} chunks",
            documents.len(),
            chunks
        ));
    }

    /// Print ranked query results
    pub fn query_response(&self, response: &QueryResponse) {
        self.header(&format!("Results for \"{}\"", response.query));
        if response.results.is_empty() {
            self.warning("No results above the relevance threshold");
            return;
        }

        for result in &response.results {
            let source = result
                .metadata
                .get_string("filename")
                .unwrap_or("<unknown>");
            let title = format!(
                "#{} {} (score {:.3})",
                result.rank, source, result.relevance_score
            );
            if self.colored {
                println!("\n  {}", title.cyan().bold());
            } else {
                println!("\n  {}", title);
            }
            println!("    {}", excerpt(&result.content, EXCERPT_CHARS));
        }
    }

    /// Print index statistics
    pub fn statistics(&self, stats: &RagStatistics) {
        self.header("Index");
        self.kv("collection", &stats.collection_name);
        if let Some(description) = stats.collection_metadata.get_string("description") {
            self.kv("description", description);
        }
        self.kv("chunks", &stats.total_documents.to_string());
        self.kv("chunk size", &stats.chunk_size.to_string());
        self.kv("chunk overlap", &stats.chunk_overlap.to_string());
        self.kv("file types", &stats.supported_file_types.join(", "));
    }
}

/// Single-line preview of `text`, cut at `max` characters.
fn excerpt(text: &str, max: usize) -> String {
    let flat: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max {
        return flat;
    }
    let cut: String = flat.chars().take(max).collect();
    format!("{}…", cut.trim_end())
}
