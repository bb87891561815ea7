//! Small helpers shared by the server and the demo CLI

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

use crate::types::document::Chunk;

const STOP_WORDS: [&str; 39] = [
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
    "is", "are", "was", "were", "be", "been", "being", "have", "has", "had", "do", "does", "did",
    "will", "would", "could", "should", "may", "might", "must", "can", "this", "that", "these",
    "those",
];

/// Standard study prompts offered to new users
pub const SAMPLE_QUESTIONS: [&str; 8] = [
    "What are the main concepts covered in this material?",
    "Can you summarize the key points from chapter 1?",
    "What are the important definitions I should remember?",
    "How do these concepts relate to each other?",
    "What examples are provided for this topic?",
    "What are the practical applications mentioned?",
    "Can you explain this concept in simpler terms?",
    "What are the common misconceptions about this topic?",
];

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("Invalid regex"));

static SPECIAL_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[^\w\s.,!?;:\-()\[\]{}"'/]"#).expect("Invalid regex"));

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[a-zA-Z]{3,}\b").expect("Invalid regex"));

/// Basic format check for a Google API key
pub fn validate_api_key(key: &str) -> bool {
    !key.is_empty() && key.starts_with("AIza") && key.chars().count() >= 35
}

/// Human readable size, e.g. `1.5MB`
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0B".to_string();
    }
    let units = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < units.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.1}{}", size, units[unit])
}

/// Collapse whitespace and drop unusual symbols
pub fn clean_text(text: &str) -> String {
    let collapsed = WHITESPACE.replace_all(text, " ");
    SPECIAL_CHARS
        .replace_all(&collapsed, "")
        .trim()
        .to_string()
}

/// Truncate to `max_len` characters, ending with `...` when cut
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    let keep = max_len.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}

/// Most frequent non-stop-words of three or more letters
pub fn extract_keywords(text: &str, max_keywords: usize) -> Vec<String> {
    let lowered = text.to_lowercase();
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();

    for m in WORD.find_iter(&lowered) {
        let word = m.as_str();
        if STOP_WORDS.contains(&word) {
            continue;
        }
        let count = counts.entry(word).or_insert(0);
        if *count == 0 {
            order.push(word);
        }
        *count += 1;
    }

    // stable sort keeps first-seen order among ties
    order.sort_by(|a, b| counts[b].cmp(&counts[a]));
    order
        .into_iter()
        .take(max_keywords)
        .map(str::to_string)
        .collect()
}

/// Reading time at `words_per_minute`
pub fn estimate_reading_time(text: &str, words_per_minute: usize) -> String {
    let words = text.split_whitespace().count();
    let minutes = words / words_per_minute.max(1);

    if minutes < 1 {
        "< 1 minute".to_string()
    } else if minutes < 60 {
        format!("{} minutes", minutes)
    } else {
        format!("{}h {}m", minutes / 60, minutes % 60)
    }
}

/// Markdown list of the distinct source files behind a set of chunks
pub fn format_citations(chunks: &[Chunk]) -> String {
    let mut sources: Vec<&str> = Vec::new();
    for chunk in chunks {
        let name = chunk.source.filename.as_str();
        if !sources.contains(&name) {
            sources.push(name);
        }
    }

    if sources.is_empty() {
        return String::new();
    }

    let mut out = String::from("**Sources:**");
    for source in sources {
        out.push_str("\n• ");
        out.push_str(source);
    }
    out
}

/// The standard study prompts as owned strings
pub fn load_sample_questions() -> Vec<String> {
    SAMPLE_QUESTIONS.iter().map(|q| q.to_string()).collect()
}
