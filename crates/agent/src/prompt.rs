//! Prompt composition.
//!
//! The retrieved passages are joined, stripped of quote characters and
//! placed together with the raw query into the fixed deals template.
//! Substitution is a single pass: text inside the query or the passages
//! that looks like a placeholder is never expanded again.

use duneguide_core::store::Passage;

/// Join passage texts with a newline, in retrieval order.
pub fn join_passages(passages: &[Passage]) -> String {
    passages
        .iter()
        .map(|p| p.content.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Remove every single and double quote character. Nothing else is escaped.
pub fn strip_quotes(text: &str) -> String {
    text.chars().filter(|c| !matches!(c, '\'' | '"')).collect()
}

/// Build the deals prompt from a query and already-joined context text.
///
/// Quote characters are stripped from the context; the query is inserted
/// verbatim.
pub fn make_prompt(query: &str, context: &str) -> String {
    let escaped = strip_quotes(context);
    format!(
        "You are a chatbot specializing in helping users find deals for tourist attractions in Dubai.\n\
         \n\
         User's question: {query}\n\
         \n\
         Context information about available deals:\n\
         {escaped}\n\
         \n\
         Your response must be detailed, friendly, and helpful.\n\
         Provide recommendations for deals related to the user's query, including:\n\
         - Attraction name\n\
         - Deal description\n\
         - Price (in AED and USD, assuming a fixed exchange rate)\n\
         - Relevant tips (e.g., operating hours, best visit times, nearby attractions)\n\
         \n\
         Ensure the response is conversational and encourages the user to ask follow-up questions.\n\
         Also note that for Burj Khalifa only return Burj Khalifa deals and for burj al arab only return burj al arab deals.\n"
    )
}

/// Compose the full prompt for `query` over the retrieved `passages`.
pub fn compose(query: &str, passages: &[Passage]) -> String {
    make_prompt(query, &join_passages(passages))
}
