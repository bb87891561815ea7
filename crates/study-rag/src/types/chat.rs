//! Chat history kept per study session

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of history entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatEntryKind {
    /// A question asked by the user
    Question,
    /// An answer from the assistant
    Answer,
    /// A generated summary
    Summary,
}

impl ChatEntryKind {
    /// Speaker label used in prompts
    pub fn speaker(&self) -> &'static str {
        match self {
            Self::Question => "User",
            Self::Answer => "Assistant",
            Self::Summary => "Summary",
        }
    }

    /// Upper-case tag used in exports
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Question => "QUESTION",
            Self::Answer => "ANSWER",
            Self::Summary => "SUMMARY",
        }
    }
}

/// One entry of a session's chat history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatEntry {
    #[serde(rename = "type")]
    pub kind: ChatEntryKind,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatEntry {
    pub fn new(kind: ChatEntryKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Ordered chat history
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatHistory {
    entries: Vec<ChatEntry>,
}

impl ChatHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: ChatEntryKind, content: impl Into<String>) {
        self.entries.push(ChatEntry::new(kind, content));
    }

    pub fn entries(&self) -> &[ChatEntry] {
        &self.entries
    }

    /// The last `n` entries, oldest first
    pub fn recent(&self, n: usize) -> &[ChatEntry] {
        let start = self.entries.len().saturating_sub(n);
        &self.entries[start..]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of questions asked so far
    pub fn question_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.kind == ChatEntryKind::Question)
            .count()
    }

    /// Plain text export, one line per entry
    pub fn export(&self) -> String {
        self.entries
            .iter()
            .map(|e| {
                format!(
                    "[{}] {}: {}",
                    e.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    e.kind.tag(),
                    e.content
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl From<Vec<ChatEntry>> for ChatHistory {
    fn from(entries: Vec<ChatEntry>) -> Self {
        Self { entries }
    }
}
