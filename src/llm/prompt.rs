//! Prompt templates.

/// Token budget for restructuring a document.
pub const RESTRUCTURE_MAX_TOKENS: u32 = 10000;

/// Token budget for answering a question.
pub const ANSWER_MAX_TOKENS: u32 = 250;

/// Sampling temperature for both calls.
pub const DEFAULT_TEMPERATURE: f32 = 0.5;

/// Message asking the model to restructure the flattened text according to
/// the instructions in `prompt`.
pub fn restructure_prompt(prompt: &str, parsed: &str) -> String {
    format!(
        "{}\n\nHere's the parsed document:\n\n{}\n\nPlease restructure this document according to the instructions.",
        prompt, parsed
    )
}

/// Message asking the model to answer `question` from `context`.
///
/// The whole context is sent with every question.
pub fn answer_prompt(context: &str, question: &str) -> String {
    format!(
        "Here's the context:\n\n{}\n\nQuestion: {}\n\nPlease answer the question based on the given context.",
        context, question
    )
}
