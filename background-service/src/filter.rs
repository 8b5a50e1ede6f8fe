use llm_interface::LlmProvider;
use subwatch_core::CandidateItem;
use tracing::{debug, warn};

/// Upper bound on the body excerpt submitted to the judgment service.
pub const AI_EXCERPT_MAX_CHARS: usize = 2000;

/// Filter mode, fixed at startup from the configuration. The AI gate only
/// exists when the full LLM configuration was provided.
pub enum FilterMode<P> {
    KeywordOnly,
    KeywordPlusAi { provider: P, prompt: String },
}

pub struct ContentFilter<P> {
    term: String,
    mode: FilterMode<P>,
}

impl<P: LlmProvider> ContentFilter<P> {
    pub fn new(search_term: &str, mode: FilterMode<P>) -> Self {
        Self {
            term: search_term.to_lowercase(),
            mode,
        }
    }

    /// Mandatory first gate: case-insensitive substring match.
    pub fn matches_keyword(&self, body: &str) -> bool {
        body.to_lowercase().contains(&self.term)
    }

    /// Optional second gate. The response is read permissively: only a
    /// "no" anywhere in the text rejects. A judgment-service failure
    /// accepts (fail-open); the seen set has already been updated by the
    /// caller, so a failed judgment is never retried.
    pub async fn passes_ai_gate(&self, item: &CandidateItem) -> bool {
        let FilterMode::KeywordPlusAi { provider, prompt } = &self.mode else {
            return true;
        };

        let excerpt = truncate_chars(&item.body, AI_EXCERPT_MAX_CHARS);
        let request = format!("{prompt}\n\n{excerpt}");

        match provider.judge(&request).await {
            Ok(response) => {
                let rejected = response.to_lowercase().contains("no");
                debug!(
                    "AI gate response for {} {}: {:?} (rejected: {})",
                    item.kind, item.id, response, rejected
                );
                !rejected
            }
            Err(e) => {
                warn!("AI judgment failed for {} {}, accepting: {}", item.kind, item.id, e);
                true
            }
        }
    }

    /// Both gates in order. A keyword miss never costs an AI call.
    pub async fn should_notify(&self, item: &CandidateItem) -> bool {
        self.matches_keyword(&item.body) && self.passes_ai_gate(item).await
    }
}

/// Char-boundary-safe prefix, at most `max_chars` characters.
pub(crate) fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
