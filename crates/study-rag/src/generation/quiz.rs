//! Parsing of generated multiple-choice quizzes

use std::collections::BTreeMap;

use crate::types::QuizQuestion;

/// Parse `Question: / A) .. D) / Correct Answer: / Explanation:` blocks
///
/// Lines before the first `Question:` and unrecognized lines are ignored.
pub fn parse_quiz_questions(text: &str) -> Vec<QuizQuestion> {
    let mut questions = Vec::new();
    let mut current: Option<QuizQuestion> = None;

    for line in text.lines().map(str::trim) {
        if let Some(rest) = line.strip_prefix("Question:") {
            questions.extend(current.take());
            current = Some(QuizQuestion {
                question: rest.trim().to_string(),
                options: BTreeMap::new(),
                answer: String::new(),
                explanation: String::new(),
            });
            continue;
        }

        let Some(question) = current.as_mut() else {
            continue;
        };

        if let Some((letter, rest)) = option_line(line) {
            question.options.insert(letter.to_string(), rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix("Correct Answer:") {
            question.answer = rest.trim().to_string();
        } else if let Some(rest) = line.strip_prefix("Explanation:") {
            question.explanation = rest.trim().to_string();
        }
    }

    questions.extend(current);
    questions
}

fn option_line(line: &str) -> Option<(&'static str, &str)> {
    ["A", "B", "C", "D"].into_iter().find_map(|letter| {
        line.strip_prefix(letter)
            .and_then(|rest| rest.strip_prefix(')'))
            .map(|rest| (letter, rest))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUIZ: &str = "Here is your quiz.\n\
        Question: What does supervised learning need?\n\
        A) Labeled data\n\
        B) No data\n\
        C) Rewards\n\
        D) Clusters\n\
        Correct Answer: A\n\
        Explanation: Supervised models learn from labeled examples.\n\
        \n\
        Question: Which algorithm clusters data?\n\
        A) Linear regression\n\
        B) K-means\n\
        Correct Answer: B\n";

    #[test]
    fn test_parses_blocks() {
        let questions = parse_quiz_questions(QUIZ);
        assert_eq!(questions.len(), 2);

        let first = &questions[0];
        assert_eq!(first.question, "What does supervised learning need?");
        assert_eq!(first.options.len(), 4);
        assert_eq!(first.options["A"], "Labeled data");
        assert_eq!(first.answer, "A");
        assert_eq!(first.explanation, "Supervised models learn from labeled examples.");

        let second = &questions[1];
        assert_eq!(second.options["B"], "K-means");
        assert_eq!(second.answer, "B");
        assert!(second.explanation.is_empty());
    }

    #[test]
    fn test_no_questions() {
        assert!(parse_quiz_questions("I cannot create a quiz.").is_empty());
        assert!(parse_quiz_questions("A) orphan option").is_empty());
    }
}
