//! study-rag: study assistant over uploaded course materials
//!
//! Uploads (PDF, DOCX, PPTX, TXT) are parsed, scrubbed of prompt-injection
//! phrases, chunked and embedded into a persistent vector collection.
//! Sessions then ask Gemini questions grounded in the retrieved chunks, with
//! summaries, concept explanations and quizzes on top.

pub mod app;
pub mod cache;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod logging;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod session;
pub mod types;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

pub use app::StudyAssistant;
pub use config::RagConfig;
pub use error::{Error, Result};
pub use generation::AiAssistant;
pub use session::StudySession;
pub use types::{
    document::{Chunk, ChunkSource, Document, FileType},
    query::AskRequest,
    response::{AnswerResponse, Citation},
};
