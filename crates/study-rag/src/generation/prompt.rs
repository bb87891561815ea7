//! Prompt templates for study answers, summaries, explanations and quizzes

use crate::types::{ChatEntry, Chunk};

/// Entries of chat history included in a prompt
pub const HISTORY_WINDOW: usize = 10;

/// Answer given when the materials do not cover a question
pub const NOT_ENOUGH_INFORMATION: &str =
    "I don't have enough information in the provided materials to answer this question.";

const QA_SYSTEM_PROMPT: &str = r#"You are a helpful study assistant. Your role is to answer questions based on the provided study materials.

Guidelines:
- Use ONLY the information provided in the context documents
- Carefully search through ALL provided context documents for relevant information
- Look for specific details like dates, names, numbers, deadlines, and timelines
- If the answer cannot be found in the context, say "I don't have enough information in the provided materials to answer this question."
- For questions about graduation, education, degrees, or completion dates, pay special attention to:
  * Academic timelines and expected completion dates
  * Degree requirements and program duration
  * Educational background and university information
  * Any mentions of "graduation", "graduate", "degree", "completion", or specific dates
- Provide clear, detailed explanations with specific information from the documents
- Include relevant examples from the materials when helpful
- Structure your answers logically
- If multiple sources contain relevant information, synthesize them coherently
- Always cite the source document when providing specific facts or dates

Your responses should be educational, well-structured, and focused on helping students learn effectively."#;

const SUMMARY_SYSTEM_PROMPT: &str = r#"You are a helpful study assistant specializing in creating comprehensive summaries.

Your task is to create a well-structured summary of the provided study materials.

Guidelines:
- Create a clear, organized summary with main points and key details
- Use bullet points and headers for better readability
- Include important concepts, definitions, and examples
- Maintain logical flow and hierarchy of information
- Focus on the most important and relevant information
- If a specific topic is requested, focus on that topic while providing context"#;

/// Prompt builder for study assistant requests
pub struct PromptBuilder;

impl PromptBuilder {
    /// Context blocks, one per chunk, separated by a blank line
    pub fn build_context(chunks: &[Chunk]) -> String {
        if chunks.is_empty() {
            return "No relevant documents found.".to_string();
        }

        chunks
            .iter()
            .map(|chunk| {
                format!(
                    "--- Source: {} (Chunk {}) ---\n{}",
                    chunk.source.filename, chunk.chunk_index, chunk.content
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Last [`HISTORY_WINDOW`] entries as speaker-labelled lines
    pub fn format_history(history: &[ChatEntry]) -> String {
        if history.is_empty() {
            return "No previous conversation.".to_string();
        }

        let start = history.len().saturating_sub(HISTORY_WINDOW);
        history[start..]
            .iter()
            .map(|entry| format!("{}: {}", entry.kind.speaker(), entry.content))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Question-answering prompt
    pub fn build_answer_prompt(question: &str, chunks: &[Chunk], history: &[ChatEntry]) -> String {
        format!(
            "{system}\n\nContext Documents:\n{context}\n\nPrevious Conversation:\n{history}\n\nQuestion: {question}\n\nAnswer:",
            system = QA_SYSTEM_PROMPT,
            context = Self::build_context(chunks),
            history = Self::format_history(history),
            question = question
        )
    }

    /// Summary prompt, optionally focused on a topic
    pub fn build_summary_prompt(chunks: &[Chunk], topic: Option<&str>) -> String {
        let topic_instruction = match topic {
            Some(topic) => format!("Focus your summary on the topic: '{}'", topic),
            None => "Provide a comprehensive summary of all the materials.".to_string(),
        };

        format!(
            "{system}\n\nStudy Materials:\n{context}\n\n{topic_instruction}\n\nSummary:",
            system = SUMMARY_SYSTEM_PROMPT,
            context = Self::build_context(chunks),
            topic_instruction = topic_instruction
        )
    }

    /// Follow-up suggestion prompt
    pub fn build_followup_prompt(question: &str, answer: &str, chunks: &[Chunk]) -> String {
        format!(
            r#"Based on the question, answer, and available study materials, suggest 3 relevant follow-up questions that would help the student learn more about this topic.

Original Question: {question}
Answer: {answer}

Available Topics in Materials:
{topics}

Suggest 3 follow-up questions (one per line, without numbering):"#,
            question = question,
            answer = answer,
            topics = Self::source_topics(chunks)
        )
    }

    /// Concept explanation prompt
    pub fn build_explain_prompt(concept: &str, chunks: &[Chunk]) -> String {
        format!(
            r#"You are an educational assistant. Explain the following concept in detail based on the provided study materials.

Concept to explain: {concept}

Study Materials:
{context}

Provide a comprehensive explanation including:
1. Definition
2. Key characteristics
3. Examples from the materials
4. How it relates to other concepts
5. Practical applications if mentioned

Explanation:"#,
            concept = concept,
            context = Self::build_context(chunks)
        )
    }

    /// Multiple-choice quiz prompt
    pub fn build_quiz_prompt(chunks: &[Chunk], num_questions: usize) -> String {
        format!(
            r#"Based on the provided study materials, create {n} quiz questions that test understanding of the key concepts.

Study Materials:
{context}

For each question, provide:
1. The question
2. Multiple choice options (A, B, C, D)
3. The correct answer
4. A brief explanation

Format each question as:
Question: [question text]
A) [option A]
B) [option B]
C) [option C]
D) [option D]
Correct Answer: [letter]
Explanation: [brief explanation]

Generate {n} questions:"#,
            n = num_questions,
            context = Self::build_context(chunks)
        )
    }

    /// Distinct source filenames, in first-seen order
    pub fn source_topics(chunks: &[Chunk]) -> String {
        let mut sources: Vec<&str> = Vec::new();
        for chunk in chunks {
            let name = chunk.source.filename.as_str();
            if !sources.contains(&name) {
                sources.push(name);
            }
        }
        sources.join(", ")
    }
}
