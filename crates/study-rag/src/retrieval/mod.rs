//! Chunk storage and similarity retrieval

mod knowledge;
mod store;

pub use knowledge::{KnowledgeBase, SearchOutcome, RELEVANCE_THRESHOLD};
pub use store::{cosine_similarity, ScoredChunk, VectorStore};
