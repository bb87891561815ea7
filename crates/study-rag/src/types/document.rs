//! Document and chunk types with source tracking for citations

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Supported file types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// PDF document
    Pdf,
    /// Microsoft Word document (.docx)
    Docx,
    /// Microsoft PowerPoint presentation (.pptx)
    Pptx,
    /// Plain text file
    Txt,
}

impl FileType {
    /// Detect file type from extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "pptx" => Some(Self::Pptx),
            "txt" => Some(Self::Txt),
            _ => None,
        }
    }

    /// Detect file type from a filename
    pub fn from_filename(filename: &str) -> Option<Self> {
        std::path::Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Lowercase extension without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Pptx => "pptx",
            Self::Txt => "txt",
        }
    }

    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Pdf => "PDF",
            Self::Docx => "Word Document (.docx)",
            Self::Pptx => "PowerPoint (.pptx)",
            Self::Txt => "Text File",
        }
    }

    /// Whether page/slide markers appear in the extracted text
    pub fn has_pages(&self) -> bool {
        matches!(self, Self::Pdf | Self::Pptx)
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// A document that has been ingested
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique document ID
    pub id: Uuid,
    /// Original filename as uploaded by user
    pub filename: String,
    /// File type
    pub file_type: FileType,
    /// SHA-256 of the extracted text, used for deduplication
    pub content_hash: String,
    /// Total number of pages or slides (if applicable)
    pub total_pages: Option<u32>,
    /// Total number of chunks created
    pub total_chunks: u32,
    /// File size in bytes
    pub file_size: u64,
    /// Ingestion timestamp
    pub ingested_at: chrono::DateTime<chrono::Utc>,
    /// Where the raw upload was kept, when uploads are retained
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stored_uri: Option<String>,
    /// Number of prompt-injection matches removed from the text
    #[serde(default)]
    pub injections_removed: usize,
    /// Additional metadata
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Document {
    /// Create a new document
    pub fn new(filename: String, file_type: FileType, content_hash: String, file_size: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            filename,
            file_type,
            content_hash,
            total_pages: None,
            total_chunks: 0,
            file_size,
            ingested_at: chrono::Utc::now(),
            stored_uri: None,
            injections_removed: 0,
            metadata: HashMap::new(),
        }
    }
}

/// Source information for a chunk (used for citations)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkSource {
    /// Original filename as uploaded
    pub filename: String,
    /// File type
    pub file_type: FileType,
    /// Page or slide number (1-indexed)
    pub page_number: Option<u32>,
}

impl ChunkSource {
    /// Create source info
    pub fn new(filename: String, file_type: FileType, page_number: Option<u32>) -> Self {
        Self {
            filename,
            file_type,
            page_number,
        }
    }

    /// Format source for display
    pub fn format_citation(&self) -> String {
        match (self.page_number, self.file_type) {
            (Some(n), FileType::Pptx) => format!("{}, Slide {}", self.filename, n),
            (Some(n), _) => format!("{}, Page {}", self.filename, n),
            (None, _) => self.filename.clone(),
        }
    }
}

/// A chunk of sanitized text from a document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique chunk ID
    pub id: Uuid,
    /// Parent document ID
    pub document_id: Uuid,
    /// Text content
    pub content: String,
    /// Embedding vector; empty until the knowledge base embeds it
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub embedding: Vec<f32>,
    /// Source information for citations
    pub source: ChunkSource,
    /// Character position in the sanitized document text
    pub char_start: usize,
    pub char_end: usize,
    /// Chunk index within document
    pub chunk_index: u32,
    /// Number of chunks the document was split into
    #[serde(default)]
    pub total_chunks: u32,
    /// Additional metadata
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Chunk {
    /// Create a new chunk
    pub fn new(
        document_id: Uuid,
        content: String,
        source: ChunkSource,
        char_start: usize,
        char_end: usize,
        chunk_index: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id,
            content,
            embedding: Vec::new(),
            source,
            char_start,
            char_end,
            chunk_index,
            total_chunks: 0,
            metadata: HashMap::new(),
        }
    }

    /// Whether the chunk still needs an embedding
    pub fn needs_embedding(&self) -> bool {
        self.embedding.is_empty()
    }

    /// Metadata value used for exact-match filtering
    ///
    /// Known keys: `source`, `file_type`, `document_id`, `chunk_id`, `page`.
    /// Anything else is looked up in `metadata`.
    pub fn filter_value(&self, key: &str) -> Option<serde_json::Value> {
        match key {
            "source" | "filename" => Some(serde_json::json!(self.source.filename)),
            "file_type" => Some(serde_json::json!(self.source.file_type)),
            "document_id" => Some(serde_json::json!(self.document_id.to_string())),
            "chunk_id" => Some(serde_json::json!(self.chunk_index)),
            "page" | "page_number" => self.source.page_number.map(|p| serde_json::json!(p)),
            other => self.metadata.get(other).cloned(),
        }
    }

    /// Whether every filter entry matches this chunk exactly
    pub fn matches_filter(&self, filter: &HashMap<String, serde_json::Value>) -> bool {
        filter
            .iter()
            .all(|(key, expected)| self.filter_value(key).as_ref() == Some(expected))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_type_detection() {
        assert_eq!(FileType::from_filename("Notes.PDF"), Some(FileType::Pdf));
        assert_eq!(FileType::from_filename("slides.pptx"), Some(FileType::Pptx));
        assert_eq!(FileType::from_filename("archive.zip"), None);
        assert_eq!(FileType::from_filename("README"), None);
    }

    #[test]
    fn test_format_citation() {
        let source = ChunkSource::new("deck.pptx".into(), FileType::Pptx, Some(3));
        assert_eq!(source.format_citation(), "deck.pptx, Slide 3");
        let source = ChunkSource::new("notes.txt".into(), FileType::Txt, None);
        assert_eq!(source.format_citation(), "notes.txt");
    }

    #[test]
    fn test_matches_filter() {
        let doc_id = Uuid::new_v4();
        let mut chunk = Chunk::new(
            doc_id,
            "content".into(),
            ChunkSource::new("a.pdf".into(), FileType::Pdf, Some(2)),
            0,
            7,
            4,
        );
        chunk.metadata.insert("topic".into(), serde_json::json!("ml"));

        let mut filter = HashMap::new();
        filter.insert("source".to_string(), serde_json::json!("a.pdf"));
        filter.insert("page".to_string(), serde_json::json!(2));
        assert!(chunk.matches_filter(&filter));

        filter.insert("topic".to_string(), serde_json::json!("ml"));
        assert!(chunk.matches_filter(&filter));

        filter.insert("file_type".to_string(), serde_json::json!("txt"));
        assert!(!chunk.matches_filter(&filter));
    }
}
