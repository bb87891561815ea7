//! Gemini-backed study assistant

use std::sync::Arc;

use crate::config::LlmConfig;
use crate::error::Result;
use crate::providers::{GeminiClient, GenerationOptions, LlmProvider};
use crate::types::{ChatEntry, Chunk, QuizQuestion};

use super::prompt::PromptBuilder;
use super::quiz::parse_quiz_questions;

/// Suggestions used when follow-up generation fails
pub const DEFAULT_FOLLOWUPS: [&str; 3] = [
    "What are the key concepts related to this topic?",
    "Can you provide more examples?",
    "How does this connect to other topics?",
];

const FOLLOWUP_OPTIONS: GenerationOptions = GenerationOptions {
    temperature: 0.3,
    max_output_tokens: 200,
};

const QUIZ_TEMPERATURE: f32 = 0.2;

/// Answers, summaries, explanations and quizzes from retrieved chunks
pub struct AiAssistant {
    llm: Arc<dyn LlmProvider>,
    options: GenerationOptions,
}

impl AiAssistant {
    /// Wrap any LLM provider
    pub fn new(llm: Arc<dyn LlmProvider>, temperature: f32, max_output_tokens: u32) -> Self {
        tracing::info!("Initialized AI assistant with model: {}", llm.model());
        Self {
            llm,
            options: GenerationOptions::new(temperature, max_output_tokens),
        }
    }

    /// Gemini assistant for `api_key` using the configured model settings
    pub fn gemini(config: &LlmConfig, api_key: &str) -> Result<Self> {
        let client = GeminiClient::new(config, api_key)?;
        Ok(Self::new(
            Arc::new(client),
            config.temperature,
            config.max_output_tokens,
        ))
    }

    pub fn model(&self) -> &str {
        self.llm.model()
    }

    /// Answer a question from context chunks and recent history
    pub async fn generate_answer(
        &self,
        question: &str,
        context: &[Chunk],
        history: &[ChatEntry],
    ) -> Result<String> {
        let prompt = PromptBuilder::build_answer_prompt(question, context, history);
        let answer = self.llm.generate(&prompt, &self.options).await?;

        tracing::info!(
            "Generated answer for question: {}...",
            question.chars().take(50).collect::<String>()
        );
        Ok(answer.trim().to_string())
    }

    /// Summarize chunks, optionally focused on a topic
    pub async fn generate_summary(&self, chunks: &[Chunk], topic: Option<&str>) -> Result<String> {
        let prompt = PromptBuilder::build_summary_prompt(chunks, topic);
        let summary = self.llm.generate(&prompt, &self.options).await?;

        tracing::info!("Generated summary (topic: {})", topic.unwrap_or("general"));
        Ok(summary.trim().to_string())
    }

    /// Up to three follow-up questions; falls back to [`DEFAULT_FOLLOWUPS`]
    pub async fn suggest_followup_questions(
        &self,
        question: &str,
        answer: &str,
        chunks: &[Chunk],
    ) -> Vec<String> {
        let prompt = PromptBuilder::build_followup_prompt(question, answer, chunks);
        match self.llm.generate(&prompt, &FOLLOWUP_OPTIONS).await {
            Ok(text) => clean_followups(&text),
            Err(e) => {
                tracing::error!("Error generating follow-up questions: {}", e);
                DEFAULT_FOLLOWUPS.iter().map(|q| q.to_string()).collect()
            }
        }
    }

    /// Detailed explanation of one concept
    pub async fn explain_concept(&self, concept: &str, chunks: &[Chunk]) -> Result<String> {
        let prompt = PromptBuilder::build_explain_prompt(concept, chunks);
        let explanation = self.llm.generate(&prompt, &self.options).await?;
        Ok(explanation.trim().to_string())
    }

    /// Multiple-choice questions over the chunks
    pub async fn create_quiz_questions(
        &self,
        chunks: &[Chunk],
        num_questions: usize,
    ) -> Result<Vec<QuizQuestion>> {
        let prompt = PromptBuilder::build_quiz_prompt(chunks, num_questions);
        let options = GenerationOptions::new(QUIZ_TEMPERATURE, self.options.max_output_tokens);
        let text = self.llm.generate(&prompt, &options).await?;

        let questions = parse_quiz_questions(text.trim());
        tracing::info!("Parsed {} quiz questions", questions.len());
        Ok(questions)
    }

    /// Whether the key can generate text at all
    pub async fn validate_api_key(&self) -> bool {
        let options = GenerationOptions::new(self.options.temperature, 10);
        match self.llm.generate("Hello", &options).await {
            Ok(text) => !text.trim().is_empty(),
            Err(e) => {
                tracing::error!("API key validation failed: {}", e);
                false
            }
        }
    }
}

/// First three lines, minus blanks and headings, with numbering stripped
fn clean_followups(text: &str) -> Vec<String> {
    text.trim()
        .split('\n')
        .take(3)
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| {
            line.trim_start_matches(|c: char| c.is_ascii_digit() && c != '0' || c == '.' || c == ' ')
                .to_string()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::testing::MockLlm;
    use crate::types::{ChatEntryKind, ChunkSource, FileType};
    use uuid::Uuid;

    fn assistant(llm: Arc<MockLlm>) -> AiAssistant {
        AiAssistant::new(llm, 0.1, 8192)
    }

    fn chunk(filename: &str, text: &str) -> Chunk {
        Chunk::new(
            Uuid::new_v4(),
            text.to_string(),
            ChunkSource::new(filename.to_string(), FileType::Txt, None),
            0,
            text.len(),
            0,
        )
    }

    #[tokio::test]
    async fn test_answer_trimmed_and_prompt_built() {
        let llm = Arc::new(MockLlm::replying("  Cells divide by mitosis.\n"));
        let ai = assistant(llm.clone());
        let history = vec![
            ChatEntry::new(ChatEntryKind::Question, "What is a cell?"),
            ChatEntry::new(ChatEntryKind::Answer, "The basic unit of life."),
        ];

        let answer = ai
            .generate_answer("How do cells divide?", &[chunk("bio.txt", "Mitosis.")], &history)
            .await
            .unwrap();
        assert_eq!(answer, "Cells divide by mitosis.");

        let prompts = llm.prompts.lock();
        let (prompt, options) = &prompts[0];
        assert!(prompt.contains("User: What is a cell?\nAssistant: The basic unit of life."));
        assert!(prompt.ends_with("Question: How do cells divide?\n\nAnswer:"));
        assert_eq!(*options, GenerationOptions::new(0.1, 8192));
    }

    #[tokio::test]
    async fn test_followups_cleaned() {
        let llm = Arc::new(MockLlm::replying(
            "1. What is meiosis?\n# Heading\n2. How long does mitosis take?\n3. Extra question",
        ));
        let ai = assistant(llm.clone());
        let followups = ai
            .suggest_followup_questions("q", "a", &[chunk("bio.txt", "x"), chunk("chem.txt", "y")])
            .await;
        assert_eq!(followups, vec!["What is meiosis?", "How long does mitosis take?"]);

        let prompts = llm.prompts.lock();
        let (prompt, options) = &prompts[0];
        assert!(prompt.contains("Available Topics in Materials:\nbio.txt, chem.txt"));
        assert_eq!(*options, FOLLOWUP_OPTIONS);
    }

    #[tokio::test]
    async fn test_followups_fall_back_on_error() {
        let llm = Arc::new(MockLlm::new(vec![Err(Error::llm("quota"))]));
        let followups = assistant(llm).suggest_followup_questions("q", "a", &[]).await;
        assert_eq!(followups, DEFAULT_FOLLOWUPS.to_vec());
    }

    #[tokio::test]
    async fn test_answer_error_propagates() {
        let llm = Arc::new(MockLlm::new(vec![Err(Error::llm("blocked"))]));
        let err = assistant(llm).generate_answer("q", &[], &[]).await.unwrap_err();
        assert!(err.is_upstream());
    }

    #[tokio::test]
    async fn test_quiz_uses_low_temperature() {
        let llm = Arc::new(MockLlm::replying(
            "Question: 2+2?\nA) 3\nB) 4\nC) 5\nD) 6\nCorrect Answer: B\nExplanation: Arithmetic.",
        ));
        let ai = assistant(llm.clone());
        let quiz = ai.create_quiz_questions(&[chunk("m.txt", "math")], 1).await.unwrap();
        assert_eq!(quiz.len(), 1);
        assert_eq!(quiz[0].answer, "B");
        assert_eq!(llm.prompts.lock()[0].1.temperature, QUIZ_TEMPERATURE);
        assert!(llm.prompts.lock()[0].0.contains("create 1 quiz questions"));
    }

    #[tokio::test]
    async fn test_validate_api_key() {
        let llm = Arc::new(MockLlm::replying("Hi"));
        assert!(assistant(llm.clone()).validate_api_key().await);
        let (prompt, options) = llm.prompts.lock()[0].clone();
        assert_eq!(prompt, "Hello");
        assert_eq!(options.max_output_tokens, 10);

        let llm = Arc::new(MockLlm::replying("   "));
        assert!(!assistant(llm).validate_api_key().await);
        let llm = Arc::new(MockLlm::new(vec![Err(Error::llm("bad key"))]));
        assert!(!assistant(llm).validate_api_key().await);
    }

    #[test]
    fn test_clean_followups_strips_numbering() {
        assert_eq!(clean_followups("1. A?\n  B?\n\n"), vec!["A?", "B?"]);
        assert_eq!(clean_followups("10. Ten?"), vec!["0. Ten?"]);
    }
}
