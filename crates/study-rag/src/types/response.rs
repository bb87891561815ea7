//! Response types for the study assistant

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::document::{Chunk, Document, FileType};

/// Citation from a source document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    /// Chunk ID
    pub chunk_id: Uuid,
    /// Document ID
    pub document_id: Uuid,
    /// Source filename
    pub filename: String,
    /// File type
    pub file_type: FileType,
    /// Page or slide number (if applicable)
    pub page_number: Option<u32>,
    /// Chunk index within the document
    pub chunk_index: u32,
    /// Exact snippet from the source
    pub snippet: String,
    /// Snippet with highlighted query terms (<mark> tags)
    pub snippet_highlighted: String,
    /// Cosine similarity to the query
    pub similarity_score: f32,
}

impl Citation {
    /// Create a citation from a chunk and similarity score
    pub fn from_chunk(chunk: &Chunk, similarity_score: f32) -> Self {
        Self {
            chunk_id: chunk.id,
            document_id: chunk.document_id,
            filename: chunk.source.filename.clone(),
            file_type: chunk.source.file_type,
            page_number: chunk.source.page_number,
            chunk_index: chunk.chunk_index,
            snippet: chunk.content.clone(),
            snippet_highlighted: chunk.content.clone(),
            similarity_score,
        }
    }

    /// Format citation for display in text
    pub fn format_inline(&self) -> String {
        match (self.page_number, self.file_type) {
            (Some(n), FileType::Pptx) => format!("[Source: {}, Slide {}]", self.filename, n),
            (Some(n), _) => format!("[Source: {}, Page {}]", self.filename, n),
            (None, _) => format!("[Source: {}]", self.filename),
        }
    }

    /// Highlight query terms in the snippet
    pub fn highlight_terms(&mut self, terms: &[&str]) {
        let mut highlighted = self.snippet.clone();
        for term in terms {
            let re = regex::RegexBuilder::new(&regex::escape(term))
                .case_insensitive(true)
                .build();
            if let Ok(re) = re {
                highlighted = re
                    .replace_all(&highlighted, |caps: &regex::Captures| {
                        format!("<mark>{}</mark>", &caps[0])
                    })
                    .to_string();
            }
        }
        self.snippet_highlighted = highlighted;
    }
}

/// Answer to a question
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerResponse {
    /// Generated answer
    pub answer: String,
    /// Chunks used as context
    pub citations: Vec<Citation>,
    /// Markdown list of the distinct source files
    pub sources: String,
    /// Nothing cleared the similarity threshold; best matches were used anyway
    pub low_confidence: bool,
    /// Served from the answer cache
    pub cached: bool,
    /// Suggested follow-up questions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub followups: Vec<String>,
    /// Number of chunks retrieved
    pub chunks_retrieved: usize,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

/// Generated summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    pub sources: String,
    pub chunks_used: usize,
    pub processing_time_ms: u64,
}

/// Concept explanation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplainResponse {
    pub concept: String,
    pub explanation: String,
    pub sources: String,
    pub processing_time_ms: u64,
}

/// Multiple-choice question parsed from model output
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    /// Options keyed by letter (`A`..`D`)
    pub options: BTreeMap<String, String>,
    /// Correct letter
    pub answer: String,
    pub explanation: String,
}

/// Generated quiz
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizResponse {
    pub questions: Vec<QuizQuestion>,
    pub sources: String,
    pub processing_time_ms: u64,
}

/// One semantic search result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub chunk_id: Uuid,
    pub document_id: Uuid,
    pub filename: String,
    pub page_number: Option<u32>,
    pub chunk_index: u32,
    pub content: String,
    pub similarity_score: f32,
}

impl SearchHit {
    pub fn from_chunk(chunk: &Chunk, similarity_score: f32) -> Self {
        Self {
            chunk_id: chunk.id,
            document_id: chunk.document_id,
            filename: chunk.source.filename.clone(),
            page_number: chunk.source.page_number,
            chunk_index: chunk.chunk_index,
            content: chunk.content.clone(),
            similarity_score,
        }
    }
}

/// Semantic search response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub hits: Vec<SearchHit>,
    pub low_confidence: bool,
    pub processing_time_ms: u64,
}

/// Response from document ingestion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResponse {
    /// At least one file produced chunks
    pub success: bool,
    /// Per-file outcome
    pub files: Vec<FileIngestStatus>,
    /// Total chunks created across all documents
    pub total_chunks_created: u32,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
    /// Any errors encountered (partial success)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<IngestError>,
}

/// Summary of an ingested document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub id: Uuid,
    pub filename: String,
    pub file_type: FileType,
    pub total_pages: Option<u32>,
    pub total_chunks: u32,
    pub file_size: u64,
    pub injections_removed: usize,
    pub ingested_at: chrono::DateTime<chrono::Utc>,
}

impl From<&Document> for DocumentSummary {
    fn from(doc: &Document) -> Self {
        Self {
            id: doc.id,
            filename: doc.filename.clone(),
            file_type: doc.file_type,
            total_pages: doc.total_pages,
            total_chunks: doc.total_chunks,
            file_size: doc.file_size,
            injections_removed: doc.injections_removed,
            ingested_at: doc.ingested_at,
        }
    }
}

/// Error during ingestion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestError {
    /// Filename that failed
    pub filename: String,
    /// Error message
    pub error: String,
}

/// Status of a single file during ingestion
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileIngestStatus {
    /// New file successfully processed
    New {
        document: DocumentSummary,
        chunks_created: u32,
    },
    /// File was modified, old version replaced
    Updated {
        document: DocumentSummary,
        chunks_created: u32,
        old_chunks_deleted: usize,
    },
    /// File unchanged (same content hash and name)
    Unchanged {
        existing_document_id: Uuid,
        filename: String,
    },
    /// Same content exists under a different filename
    Duplicate {
        existing_document_id: Uuid,
        existing_filename: String,
        filename: String,
    },
    /// Processing failed
    Failed { filename: String, error: String },
}

impl FileIngestStatus {
    /// Get the uploaded filename from any status variant
    pub fn filename(&self) -> &str {
        match self {
            Self::New { document, .. } | Self::Updated { document, .. } => &document.filename,
            Self::Unchanged { filename, .. }
            | Self::Duplicate { filename, .. }
            | Self::Failed { filename, .. } => filename,
        }
    }

    /// Chunks created for this file
    pub fn chunks_created(&self) -> u32 {
        match self {
            Self::New { chunks_created, .. } | Self::Updated { chunks_created, .. } => {
                *chunks_created
            }
            _ => 0,
        }
    }

    /// Check if this was a successful processing
    pub fn is_success(&self) -> bool {
        matches!(self, Self::New { .. } | Self::Updated { .. })
    }

    /// Check if file was skipped (unchanged or duplicate)
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Unchanged { .. } | Self::Duplicate { .. })
    }
}

/// Vector collection statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionInfo {
    pub name: String,
    pub count: usize,
    pub embedding_model: String,
    pub dimensions: usize,
    pub persist_path: String,
    /// `initialized` or `empty`
    pub status: String,
}

/// Session status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: Uuid,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub initialized: bool,
    pub question_count: usize,
    pub history_length: usize,
}
