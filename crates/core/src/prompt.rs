use legal_rag_common::SearchHit;
use serde::Serialize;

const SYSTEM_INSTRUCTION: &str = "You are a legal document assistant. Answer the question using only \
the context passages provided below, never outside knowledge.

Rules:
- Support every claim with a citation in the form [Source: <document>, page <n>] or \
[Source: <document>], naming the clause or section where one is given.
- If passages from different documents disagree on the same point, say explicitly that there is \
a conflict, quote both positions and cite each source.
- If the context does not contain enough information to answer, say that the provided documents \
do not contain sufficient information. Do not guess.
- Be concise and precise.";

/// System and user messages for one chat completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

#[derive(Debug, Clone, Default)]
pub struct PromptAssembler;

impl PromptAssembler {
    pub fn new() -> Self {
        Self
    }

    /// Render `hits` in rank order followed by the question.
    pub fn assemble(&self, question: &str, hits: &[SearchHit]) -> Prompt {
        let context = if hits.is_empty() {
            "(no passages were retrieved)".to_string()
        } else {
            hits.iter()
                .map(|hit| format!("[Source: {}]\n{}", hit.citation(), hit.text.trim()))
                .collect::<Vec<_>>()
                .join("\n\n---\n\n")
        };

        Prompt {
            system: SYSTEM_INSTRUCTION.to_string(),
            user: format!(
                "Context:\n\n{}\n\nQuestion: {}\n\nAnswer:",
                context,
                question.trim()
            ),
        }
    }
}
