use legal_rag_common::{RagError, Result};
use std::path::Path;
use tracing::{debug, info, warn};

const PDF_MAGIC: &[u8] = b"%PDF-";
// Readers accept the header anywhere in the first kilobyte.
const PDF_HEADER_WINDOW: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Text,
    Markdown,
}

impl DocumentFormat {
    /// Detect the format from a file name's extension.
    pub fn from_name(name: &str) -> Option<Self> {
        let ext = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "pdf" => Some(DocumentFormat::Pdf),
            "txt" => Some(DocumentFormat::Text),
            "md" | "markdown" => Some(DocumentFormat::Markdown),
            _ => None,
        }
    }

    pub fn is_paged(&self) -> bool {
        matches!(self, DocumentFormat::Pdf)
    }
}

/// Extracted text of one source file, one entry per page.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub source: String,
    pub format: DocumentFormat,
    pub pages: Vec<String>,
}

impl LoadedDocument {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn has_text(&self) -> bool {
        self.pages.iter().any(|page| !page.trim().is_empty())
    }
}

#[derive(Debug, Default, Clone)]
pub struct DocumentProcessor;

impl DocumentProcessor {
    pub fn new() -> Self {
        Self
    }

    pub async fn load_path(&self, path: &Path) -> Result<LoadedDocument> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| RagError::load(&name, e))?;

        self.load_bytes(&name, bytes).await
    }

    /// Extract text from an uploaded file's bytes.
    pub async fn load_bytes(&self, name: &str, bytes: Vec<u8>) -> Result<LoadedDocument> {
        let format = DocumentFormat::from_name(name)
            .ok_or_else(|| RagError::load(name, "unsupported file type"))?;

        debug!("Loading '{}' ({} bytes, {:?})", name, bytes.len(), format);

        let pages = match format {
            DocumentFormat::Pdf => extract_pdf_pages(name, bytes).await?,
            DocumentFormat::Text | DocumentFormat::Markdown => {
                let content = String::from_utf8(bytes)
                    .map_err(|e| RagError::load(name, format!("invalid UTF-8: {}", e)))?;
                vec![content.replace("\r\n", "\n")]
            }
        };

        let document = LoadedDocument {
            source: name.to_string(),
            format,
            pages,
        };

        if !document.has_text() {
            warn!("No extractable text in '{}'", name);
            return Err(RagError::load(name, "document contains no extractable text"));
        }

        info!("Loaded '{}' with {} page(s)", name, document.page_count());
        Ok(document)
    }
}

async fn extract_pdf_pages(name: &str, bytes: Vec<u8>) -> Result<Vec<String>> {
    if !has_pdf_header(&bytes) {
        return Err(RagError::load(name, "not a valid PDF file"));
    }

    // The parser is synchronous and panics on some malformed input; a panic
    // on the blocking pool comes back as a JoinError.
    let extracted =
        tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem_by_pages(&bytes))
            .await
            .map_err(|e| RagError::load(name, format!("PDF parser aborted: {}", e)))?;

    extracted.map_err(|e| RagError::load(name, format!("PDF parse error: {}", e)))
}

fn has_pdf_header(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(PDF_HEADER_WINDOW)];
    window
        .windows(PDF_MAGIC.len())
        .any(|candidate| candidate == PDF_MAGIC)
}
