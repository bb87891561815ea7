//! Request types for the HTTP API

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Maximum number of quiz questions per request
pub const MAX_QUIZ_QUESTIONS: usize = 20;

/// Create a study session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    /// Google API key; falls back to the server's configured key
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Initialize a session with an API key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeyRequest {
    pub api_key: String,
}

/// Ask a question about the uploaded materials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskRequest {
    /// The question to answer
    pub question: String,

    /// Number of chunks to retrieve (defaults to the configured k)
    #[serde(default)]
    pub k: Option<usize>,

    /// Also suggest follow-up questions
    #[serde(default)]
    pub followups: bool,
}

impl AskRequest {
    /// Create a new question
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            k: None,
            followups: false,
        }
    }

    /// Set the number of chunks to retrieve
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = Some(k);
        self
    }
}

/// Semantic search without generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,

    #[serde(default)]
    pub k: Option<usize>,

    /// Exact-match metadata filter (`source`, `file_type`, `page`, ...)
    #[serde(default)]
    pub filter: Option<HashMap<String, serde_json::Value>>,
}

/// Summarize the materials, optionally around a topic
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SummaryRequest {
    #[serde(default)]
    pub topic: Option<String>,
}

impl SummaryRequest {
    /// Topic with surrounding whitespace removed, `None` if blank
    pub fn topic(&self) -> Option<&str> {
        self.topic
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

/// Explain a concept from the materials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplainRequest {
    pub concept: String,
}

/// Generate multiple-choice questions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizRequest {
    #[serde(default = "default_num_questions")]
    pub num_questions: usize,
}

fn default_num_questions() -> usize {
    5
}

impl Default for QuizRequest {
    fn default() -> Self {
        Self {
            num_questions: default_num_questions(),
        }
    }
}

impl QuizRequest {
    /// Requested count clamped into `1..=MAX_QUIZ_QUESTIONS`
    pub fn count(&self) -> usize {
        self.num_questions.clamp(1, MAX_QUIZ_QUESTIONS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let ask: AskRequest = serde_json::from_str(r#"{"question":"What is ML?"}"#).unwrap();
        assert_eq!(ask.k, None);
        assert!(!ask.followups);

        let quiz: QuizRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(quiz.num_questions, 5);
        assert_eq!(QuizRequest { num_questions: 99 }.count(), MAX_QUIZ_QUESTIONS);

        let summary: SummaryRequest = serde_json::from_str(r#"{"topic":"   "}"#).unwrap();
        assert_eq!(summary.topic(), None);
    }
}
