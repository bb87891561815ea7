//! Document ingestion: parsing, injection sanitizing and chunking

mod chunker;
mod parser;
mod processor;
pub mod sanitizer;

pub use chunker::{TextChunker, TextSpan, DEFAULT_SEPARATORS};
pub use parser::{hash_content, FileParser, PageContent, ParsedDocument};
pub use processor::{ExtractedFile, IngestPipeline};
pub use sanitizer::{sanitize, SanitizeReport};
