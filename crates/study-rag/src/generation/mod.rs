//! Answer generation: prompts, the Gemini assistant, quizzes and citations

pub mod assistant;
pub mod citation;
pub mod prompt;
pub mod quiz;

pub use assistant::{AiAssistant, DEFAULT_FOLLOWUPS};
pub use citation::{build_citations, inline_references};
pub use prompt::{PromptBuilder, HISTORY_WINDOW, NOT_ENOUGH_INFORMATION};
pub use quiz::parse_quiz_questions;
