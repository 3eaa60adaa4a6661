//! Prompt templates for grounded answers

use crate::types::RetrievalResult;

/// Prompt builder for document questions
pub struct PromptBuilder;

impl PromptBuilder {
    /// Join retrieved chunk texts, in ranked order
    pub fn build_context(results: &[RetrievalResult]) -> String {
        results
            .iter()
            .map(|r| r.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Build the prompt restricting the model to the document context
    pub fn build_prompt(question: &str, context: &str) -> String {
        format!(
            r#"You are a helpful assistant answering questions based solely on the provided document context.

Context from the document:
{context}

Question: {question}

Instructions:
- Answer based ONLY on the context provided above
- If the context doesn't contain enough information, say so
- Be concise and accurate
- Do not make up information

Answer:"#,
            context = context,
            question = question
        )
    }
}
