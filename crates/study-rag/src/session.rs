//! Per-user study sessions
//!
//! A session holds its own Gemini assistant and chat history. Everything it
//! retrieves comes from the shared [`StudyAssistant`].

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::app::StudyAssistant;
use crate::config::LlmConfig;
use crate::error::{Error, Result};
use crate::generation::AiAssistant;
use crate::types::response::{ExplainResponse, QuizResponse, SessionInfo, SummaryResponse};
use crate::types::{AnswerResponse, ChatEntry, ChatEntryKind, ChatHistory};
use crate::utils::validate_api_key;

/// One user's study session
pub struct StudySession {
    id: Uuid,
    created_at: DateTime<Utc>,
    assistant: Option<AiAssistant>,
    history: ChatHistory,
}

impl StudySession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            assistant: None,
            history: ChatHistory::new(),
        }
    }

    /// Session with a ready assistant
    pub fn with_assistant(assistant: AiAssistant) -> Self {
        let mut session = Self::new();
        session.assistant = Some(assistant);
        session
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_initialized(&self) -> bool {
        self.assistant.is_some()
    }

    /// Attach a Gemini assistant for `api_key`
    ///
    /// Only the key format is checked here; a wrong key surfaces on the first
    /// generation call.
    pub fn initialize(&mut self, api_key: &str, config: &LlmConfig) -> Result<()> {
        let api_key = api_key.trim();
        if !validate_api_key(api_key) {
            return Err(Error::validation("Invalid API key"));
        }

        self.assistant = Some(AiAssistant::gemini(config, api_key)?);
        tracing::info!("Session {} initialized", self.id);
        Ok(())
    }

    fn assistant(&self) -> Result<&AiAssistant> {
        self.assistant.as_ref().ok_or(Error::SessionNotInitialized)
    }

    /// Answer a question using the recent history, then record both turns
    pub async fn ask(
        &mut self,
        app: &StudyAssistant,
        question: &str,
        k: Option<usize>,
        followups: bool,
    ) -> Result<AnswerResponse> {
        let ai = self.assistant()?;
        let response = app
            .answer_question(ai, question, self.history.entries(), k, followups)
            .await?;

        self.history.push(ChatEntryKind::Question, question.trim());
        self.history.push(ChatEntryKind::Answer, response.answer.clone());
        Ok(response)
    }

    /// Summarize the materials and record the summary
    pub async fn summarize(
        &mut self,
        app: &StudyAssistant,
        topic: Option<&str>,
    ) -> Result<SummaryResponse> {
        let ai = self.assistant()?;
        let response = app.summarize(ai, topic).await?;

        self.history.push(ChatEntryKind::Summary, response.summary.clone());
        Ok(response)
    }

    pub async fn explain(&self, app: &StudyAssistant, concept: &str) -> Result<ExplainResponse> {
        app.explain_concept(self.assistant()?, concept).await
    }

    pub async fn quiz(&self, app: &StudyAssistant, num_questions: usize) -> Result<QuizResponse> {
        app.create_quiz(self.assistant()?, num_questions).await
    }

    pub fn history(&self) -> &[ChatEntry] {
        self.history.entries()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
        tracing::info!("Cleared history for session {}", self.id);
    }

    /// `[YYYY-mm-dd HH:MM:SS] TYPE: content`, one line per entry
    pub fn export_history(&self) -> String {
        self.history.export()
    }

    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            id: self.id,
            created_at: self.created_at,
            initialized: self.is_initialized(),
            question_count: self.history.question_count(),
            history_length: self.history.len(),
        }
    }
}

impl Default for StudySession {
    fn default() -> Self {
        Self::new()
    }
}
