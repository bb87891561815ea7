//! Core types for the study assistant

pub mod chat;
pub mod document;
pub mod query;
pub mod response;

pub use chat::{ChatEntry, ChatEntryKind, ChatHistory};
pub use document::{Chunk, ChunkSource, Document, FileType};
pub use query::{AskRequest, SearchRequest, SummaryRequest};
pub use response::{AnswerResponse, Citation, CollectionInfo, IngestResponse, QuizQuestion};
