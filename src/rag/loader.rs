//! Document loading.
//!
//! Reads `.txt`, `.md`, `.pdf` and `.docx` files into a [`Document`] holding the
//! extracted text and filesystem metadata. Dispatch is by file extension into
//! [`DocumentFormat`], one extraction routine per variant.

use crate::types::{Document, Metadata, RagError, Result};
use chrono::{DateTime, Utc};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, instrument, warn};
use walkdir::WalkDir;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A supported input format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentFormat {
    /// Plain UTF-8 text.
    Text,
    /// PDF, text extracted page by page.
    Pdf,
    /// Word document (Office Open XML).
    Docx,
    /// Markdown, kept as raw text.
    Markdown,
}

impl DocumentFormat {
    /// All formats, in extension order.
    pub const ALL: [DocumentFormat; 4] = [
        DocumentFormat::Docx,
        DocumentFormat::Markdown,
        DocumentFormat::Pdf,
        DocumentFormat::Text,
    ];

    /// Map a file extension (with or without the leading dot, any case) to a format.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "txt" => Some(DocumentFormat::Text),
            "pdf" => Some(DocumentFormat::Pdf),
            "docx" => Some(DocumentFormat::Docx),
            "md" => Some(DocumentFormat::Markdown),
            _ => None,
        }
    }

    /// Determine the format of a path from its extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Dotted lowercase extension, e.g. `.pdf`.
    pub fn extension(&self) -> &'static str {
        match self {
            DocumentFormat::Text => ".txt",
            DocumentFormat::Pdf => ".pdf",
            DocumentFormat::Docx => ".docx",
            DocumentFormat::Markdown => ".md",
        }
    }

    /// Extract text from the raw file bytes.
    fn extract(&self, bytes: Vec<u8>) -> std::result::Result<String, BoxError> {
        match self {
            // Markdown is not rendered; headings and emphasis stay in the text.
            DocumentFormat::Text | DocumentFormat::Markdown => Ok(String::from_utf8(bytes)?),
            DocumentFormat::Pdf => extract_pdf_text(&bytes),
            DocumentFormat::Docx => extract_docx_text(&bytes),
        }
    }
}

/// Loads documents from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentLoader;

impl DocumentLoader {
    /// Create a new loader.
    pub fn new() -> Self {
        Self
    }

    /// Supported extensions in dotted lowercase form, sorted.
    pub fn supported_file_types(&self) -> Vec<String> {
        DocumentFormat::ALL
            .iter()
            .map(|f| f.extension().to_string())
            .collect()
    }

    /// Whether the path has a supported extension.
    pub fn is_supported(&self, path: &Path) -> bool {
        DocumentFormat::from_path(path).is_some()
    }

    /// Load a single document.
    ///
    /// # Errors
    ///
    /// - [`RagError::NotFound`] if the path does not exist
    /// - [`RagError::UnsupportedFormat`] if the extension is not supported
    /// - [`RagError::Load`] if reading or extraction fails
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn load(&self, path: &Path) -> Result<Document> {
        if !tokio::fs::try_exists(path)
            .await
            .map_err(|e| RagError::load(path, e))?
        {
            return Err(RagError::NotFound(path.to_path_buf()));
        }

        let format = DocumentFormat::from_path(path).ok_or_else(|| RagError::UnsupportedFormat {
            path: path.to_path_buf(),
            extension: path
                .extension()
                .map(|ext| format!(".{}", ext.to_string_lossy()))
                .unwrap_or_default(),
        })?;

        let fs_meta = tokio::fs::metadata(path)
            .await
            .map_err(|e| RagError::load(path, e))?;
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| RagError::load(path, e))?;

        // PDF and docx parsing is CPU bound
        let content = tokio::task::spawn_blocking(move || format.extract(bytes))
            .await
            .map_err(|e| RagError::load(path, e))?
            .map_err(|e| RagError::Load {
                path: path.to_path_buf(),
                source: e,
            })?;

        let metadata = file_metadata(path, format, &fs_meta);
        debug!(chars = content.chars().count(), ?format, "Loaded document");

        Ok(Document { content, metadata })
    }

    /// List supported files under `dir`, sorted by path.
    ///
    /// Unreadable directory entries are logged and skipped.
    ///
    /// # Errors
    ///
    /// [`RagError::InvalidDirectory`] if `dir` is missing or not a directory.
    pub fn discover(&self, dir: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
        if !dir.is_dir() {
            return Err(RagError::InvalidDirectory(dir.to_path_buf()));
        }

        let max_depth = if recursive { usize::MAX } else { 1 };
        let mut files = Vec::new();
        for entry in WalkDir::new(dir)
            .max_depth(max_depth)
            .sort_by_file_name()
        {
            match entry {
                Ok(entry) if entry.file_type().is_file() && self.is_supported(entry.path()) => {
                    files.push(entry.into_path());
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Skipping unreadable directory entry"),
            }
        }

        Ok(files)
    }

    /// Load every supported document under `dir`.
    ///
    /// A file that fails to load is logged and skipped; the result holds
    /// only successfully loaded documents, in path order.
    #[instrument(skip(self), fields(dir = %dir.display()))]
    pub async fn process_directory(&self, dir: &Path, recursive: bool) -> Result<Vec<Document>> {
        let files = self.discover(dir, recursive)?;
        let mut documents = Vec::with_capacity(files.len());

        for file in &files {
            match self.load(file).await {
                Ok(doc) => documents.push(doc),
                Err(e) => warn!(path = %file.display(), error = %e, "Failed to load document, skipping"),
            }
        }

        debug!(found = files.len(), loaded = documents.len(), "Processed directory");
        Ok(documents)
    }
}

fn file_metadata(path: &Path, format: DocumentFormat, fs_meta: &std::fs::Metadata) -> Metadata {
    let modified = fs_meta.modified().ok();
    // Not every filesystem records creation time
    let created = fs_meta.created().ok().or(modified);

    let mut metadata = Metadata::new();
    metadata.insert(
        "filename",
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
    );
    metadata.insert("file_type", format.extension());
    metadata.insert("file_size", fs_meta.len());
    if let Some(created) = created {
        metadata.insert("created_at", rfc3339(created));
    }
    if let Some(modified) = modified {
        metadata.insert("modified_at", rfc3339(modified));
    }
    metadata
}

fn rfc3339(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).to_rfc3339()
}

/// Page-ordered text, pages joined by single newlines.
fn extract_pdf_text(bytes: &[u8]) -> std::result::Result<String, BoxError> {
    let doc = lopdf::Document::load_mem(bytes)?;
    let pages = doc
        .get_pages()
        .keys()
        .map(|page_number| {
            // extract_text ends every text object with a newline
            let page = doc.extract_text(&[*page_number])?;
            Ok(page.trim_end_matches('\n').to_string())
        })
        .collect::<std::result::Result<Vec<_>, lopdf::Error>>()?;
    Ok(pages.join("\n"))
}

/// Paragraph text from `word/document.xml`, paragraphs joined by newlines.
fn extract_docx_text(bytes: &[u8]) -> std::result::Result<String, BoxError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")?
        .read_to_string(&mut xml)?;

    let mut reader = Reader::from_str(&xml);
    reader.config_mut().trim_text(false);

    let mut text = String::new();
    let mut in_text_run = false;
    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == b"w:t" => in_text_run = true,
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_text_run = false,
                b"w:p" => text.push('\n'),
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:tab" => text.push('\t'),
                b"w:br" | b"w:cr" => text.push('\n'),
                _ => {}
            },
            Event::Text(t) if in_text_run => text.push_str(&t.unescape()?),
            Event::Eof => break,
            _ => {}
        }
    }

    let trimmed = text.trim_end_matches('\n').len();
    text.truncate(trimmed);
    Ok(text)
}
