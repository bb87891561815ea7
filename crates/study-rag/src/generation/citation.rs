//! Citations for the chunks an answer was generated from

use crate::retrieval::ScoredChunk;
use crate::types::Citation;
use crate::utils::extract_keywords;

/// Query terms highlighted in snippets
const MAX_HIGHLIGHT_TERMS: usize = 8;

/// One citation per context chunk, with query terms highlighted
pub fn build_citations(results: &[ScoredChunk], question: &str) -> Vec<Citation> {
    let keywords = extract_keywords(question, MAX_HIGHLIGHT_TERMS);
    let terms: Vec<&str> = keywords.iter().map(String::as_str).collect();

    results
        .iter()
        .map(|result| {
            let mut citation = Citation::from_chunk(&result.chunk, result.similarity);
            if !terms.is_empty() {
                citation.highlight_terms(&terms);
            }
            citation
        })
        .collect()
}

/// Distinct inline references, in citation order
pub fn inline_references(citations: &[Citation]) -> Vec<String> {
    let mut refs: Vec<String> = Vec::new();
    for citation in citations {
        let inline = citation.format_inline();
        if !refs.contains(&inline) {
            refs.push(inline);
        }
    }
    refs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Chunk, ChunkSource, FileType};
    use uuid::Uuid;

    fn scored(text: &str, page: Option<u32>, similarity: f32) -> ScoredChunk {
        ScoredChunk {
            chunk: Chunk::new(
                Uuid::new_v4(),
                text.to_string(),
                ChunkSource::new("bio.pdf".into(), FileType::Pdf, page),
                0,
                text.len(),
                0,
            ),
            similarity,
        }
    }

    #[test]
    fn test_highlights_question_keywords() {
        let citations = build_citations(
            &[scored("Mitochondria produce ATP for the cell.", Some(4), 0.8)],
            "What do mitochondria produce?",
        );
        assert_eq!(citations.len(), 1);
        let c = &citations[0];
        assert_eq!(c.page_number, Some(4));
        assert_eq!(c.similarity_score, 0.8);
        assert!(c.snippet_highlighted.contains("<mark>Mitochondria</mark>"));
        assert!(c.snippet_highlighted.contains("<mark>produce</mark>"));
        assert_eq!(c.snippet, "Mitochondria produce ATP for the cell.");
    }

    #[test]
    fn test_inline_references_deduplicated() {
        let citations = build_citations(
            &[scored("a", Some(1), 0.5), scored("b", Some(1), 0.4), scored("c", Some(2), 0.3)],
            "",
        );
        assert_eq!(
            inline_references(&citations),
            vec!["[Source: bio.pdf, Page 1]", "[Source: bio.pdf, Page 2]"]
        );
    }
}
