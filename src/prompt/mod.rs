//! Prompt assembly
//!
//! Fixed template: an instruction line, the retrieved chunks in rank
//! order separated by blank lines, then the question. A character budget
//! bounds the whole prompt; when it would be exceeded, the lowest-ranked
//! chunks are dropped whole until the prompt fits. Chunks are never
//! truncated mid-text.

use crate::index::ScoredChunk;

const INSTRUCTION: &str = "Answer the following question using the provided context.";

/// Assembles a bounded-size generation prompt
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    max_prompt_chars: usize,
}

impl PromptBuilder {
    pub fn new(max_prompt_chars: usize) -> Self {
        Self { max_prompt_chars }
    }

    /// Assemble the prompt from a query and retrieved chunks
    ///
    /// Returns the prompt plus how many chunks made it in after budget
    /// enforcement.
    pub fn assemble(&self, query: &str, hits: &[ScoredChunk]) -> AssembledPrompt {
        let mut included = hits.len();

        loop {
            let prompt = render(query, &hits[..included]);
            if prompt.chars().count() <= self.max_prompt_chars || included == 0 {
                return AssembledPrompt {
                    text: prompt,
                    chunks_included: included,
                    chunks_dropped: hits.len() - included,
                };
            }
            included -= 1;
        }
    }
}

/// Prompt text plus budget accounting
#[derive(Debug, Clone)]
pub struct AssembledPrompt {
    pub text: String,
    pub chunks_included: usize,
    pub chunks_dropped: usize,
}

fn render(query: &str, hits: &[ScoredChunk]) -> String {
    let context = hits
        .iter()
        .map(|h| h.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "{}\n\nContext:\n{}\n\nQuestion: {}",
        INSTRUCTION, context, query
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Chunk;

    fn hit(ordinal: usize, text: &str, score: f32) -> ScoredChunk {
        ScoredChunk {
            chunk: Chunk {
                ordinal,
                text: text.to_string(),
            },
            score,
        }
    }

    #[test]
    fn test_template_shape() {
        let builder = PromptBuilder::new(10_000);
        let hits = vec![hit(0, "First passage.", 0.9), hit(1, "Second passage.", 0.5)];

        let prompt = builder.assemble("What is this?", &hits);
        assert!(prompt.text.starts_with(INSTRUCTION));
        assert!(prompt.text.contains("Context:\nFirst passage.\n\nSecond passage."));
        assert!(prompt.text.ends_with("Question: What is this?"));
        assert_eq!(prompt.chunks_included, 2);
        assert_eq!(prompt.chunks_dropped, 0);
    }

    #[test]
    fn test_chunks_appear_in_rank_order() {
        let builder = PromptBuilder::new(10_000);
        let hits = vec![hit(2, "best", 0.9), hit(0, "good", 0.5), hit(1, "okay", 0.1)];

        let prompt = builder.assemble("q", &hits);
        let best = prompt.text.find("best").unwrap();
        let good = prompt.text.find("good").unwrap();
        let okay = prompt.text.find("okay").unwrap();
        assert!(best < good && good < okay);
    }

    #[test]
    fn test_budget_drops_lowest_ranked_first() {
        let filler = "x".repeat(200);
        let hits = vec![
            hit(0, "keep me", 0.9),
            hit(1, &filler, 0.5),
            hit(2, &filler, 0.1),
        ];
        let builder = PromptBuilder::new(120);

        let prompt = builder.assemble("q", &hits);
        assert!(prompt.text.contains("keep me"));
        assert!(!prompt.text.contains(&filler));
        assert_eq!(prompt.chunks_included, 1);
        assert_eq!(prompt.chunks_dropped, 2);
        assert!(prompt.text.chars().count() <= 120);
    }

    #[test]
    fn test_tiny_budget_keeps_question() {
        let builder = PromptBuilder::new(10);
        let hits = vec![hit(0, "some context", 0.9)];

        // Even when no chunk fits, the instruction and question survive
        let prompt = builder.assemble("why?", &hits);
        assert_eq!(prompt.chunks_included, 0);
        assert!(prompt.text.contains("why?"));
    }

    #[test]
    fn test_no_hits_still_renders() {
        let builder = PromptBuilder::new(1000);
        let prompt = builder.assemble("lonely question", &[]);
        assert!(prompt.text.contains("lonely question"));
        assert_eq!(prompt.chunks_included, 0);
    }
}
