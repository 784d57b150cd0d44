use serde::{Deserialize, Serialize};

use crate::history::HistoryMessage;
use crate::vectordb::VectorMatch;

/// Configuration for context assembly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// How many matches to retrieve per query
    pub top_k: usize,
    /// Maximum total context length in characters
    pub max_context_length: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            max_context_length: 4000,
        }
    }
}

/// Turns retrieved matches and conversation history into the prompt the
/// completion model sees.
pub struct ContextBuilder {
    config: ContextConfig,
}

impl ContextBuilder {
    pub fn new(config: ContextConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Formats matches into a numbered citation block, capping the total
    /// length. Matches are expected best-first, as the index returns them.
    pub fn format_matches(&self, matches: &[VectorMatch]) -> String {
        let mut context = String::new();
        let mut current_length = 0;
        let max_length = self.config.max_context_length;

        for (i, m) in matches.iter().enumerate() {
            let text = m.text();
            // Head-room for the citation line itself.
            let addition_length = text.len() + 50;
            if current_length + addition_length > max_length {
                break;
            }

            context.push_str(&format!(
                "[{}] (Source: {}, relevance: {:.2})\n{}\n\n",
                i + 1,
                m.source(),
                m.score,
                text
            ));

            current_length += addition_length;
        }

        context.trim().to_string()
    }

    /// Fills the answer template. History, when present, is replayed as
    /// role-prefixed lines inside the prompt rather than as separate chat
    /// messages, so it works the same for every backend.
    pub fn build_prompt(
        &self,
        context: &str,
        history: &[HistoryMessage],
        query: &str,
    ) -> String {
        if history.is_empty() {
            format!(
                "Use the following pieces of context to answer the query at the end.\n\
                 If you don't know the answer, just say that you don't know, don't try to make up an answer.\n\
                 \n{}\n\nQuery: {}\n\nHelpful Answer:",
                context, query
            )
        } else {
            let replay = history
                .iter()
                .map(|m| format!("{}: {}", m.role, m.content))
                .collect::<Vec<_>>()
                .join("\n");
            format!(
                "Use the following pieces of context to answer the query at the end.\n\
                 If you don't know the answer, just say that you don't know, don't try to make up an answer.\n\
                 I will provide you with our conversation history.\n\
                 \n{}\n\nHistory:\n{}\n\nQuery: {}\n\nHelpful Answer:",
                context, replay, query
            )
        }
    }
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new(ContextConfig::default())
    }
}
