//! Runtime configuration loaded from environment variables.

use std::str::FromStr;

use tracing::info;

use crate::error::ContextorError;
use crate::prompt::PromptBudget;

/// Default number of chunks retrieved per question.
pub const DEFAULT_TOP_K: usize = 5;

/// Default prompt budget in estimated tokens.
pub const DEFAULT_MAX_PROMPT_TOKENS: usize = 3000;

/// What to do when retrieval fails (unknown country, unreadable store, embedding failure).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RetrievalFailurePolicy {
    /// Skip generation and report the failure.
    #[default]
    Abort,
    /// Log a warning and answer without context.
    EmptyContext,
}

impl FromStr for RetrievalFailurePolicy {
    type Err = ContextorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort" => Ok(Self::Abort),
            "empty_context" => Ok(Self::EmptyContext),
            other => Err(ContextorError::InvalidVar {
                var: "RETRIEVAL_FAILURE_POLICY",
                reason: format!("expected `abort` or `empty_context`, got `{other}`"),
            }),
        }
    }
}

/// Pipeline knobs. All fields have defaults via `Default`/`from_env`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContextorConfig {
    pub top_k: usize,
    pub budget: PromptBudget,
    pub on_retrieval_failure: RetrievalFailurePolicy,
}

impl Default for ContextorConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            budget: PromptBudget::tokens(DEFAULT_MAX_PROMPT_TOKENS),
            on_retrieval_failure: RetrievalFailurePolicy::Abort,
        }
    }
}

impl ContextorConfig {
    /// Build from environment variables with defaults.
    ///
    /// - `RAG_TOP_K` (`5`)
    /// - `MAX_PROMPT_TOKENS` (`3000`, `0` disables the budget)
    /// - `RETRIEVAL_FAILURE_POLICY` (`abort` | `empty_context`)
    ///
    /// # Errors
    /// Returns [`ContextorError::InvalidVar`] for unparsable values.
    pub fn from_env() -> Result<Self, ContextorError> {
        let cfg = Self {
            top_k: parse("RAG_TOP_K", DEFAULT_TOP_K)?,
            budget: PromptBudget::tokens(parse("MAX_PROMPT_TOKENS", DEFAULT_MAX_PROMPT_TOKENS)?),
            on_retrieval_failure: parse("RETRIEVAL_FAILURE_POLICY", RetrievalFailurePolicy::Abort)?,
        };
        info!(
            top_k = cfg.top_k,
            max_prompt_tokens = ?cfg.budget.max_tokens,
            on_retrieval_failure = ?cfg.on_retrieval_failure,
            "contextor config loaded"
        );
        Ok(cfg)
    }
}

fn parse<T>(var: &'static str, dflt: T) -> Result<T, ContextorError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(var) {
        Ok(v) if !v.trim().is_empty() => {
            v.trim()
                .parse()
                .map_err(|e: T::Err| ContextorError::InvalidVar {
                    var,
                    reason: e.to_string(),
                })
        }
        _ => Ok(dflt),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_parsing() {
        assert_eq!("abort".parse::<RetrievalFailurePolicy>().unwrap(), RetrievalFailurePolicy::Abort);
        assert_eq!(
            " Empty_Context ".parse::<RetrievalFailurePolicy>().unwrap(),
            RetrievalFailurePolicy::EmptyContext
        );
        assert!("ignore".parse::<RetrievalFailurePolicy>().is_err());
    }

    #[test]
    fn defaults() {
        let cfg = ContextorConfig::default();
        assert_eq!(cfg.top_k, 5);
        assert_eq!(cfg.budget.max_tokens, Some(3000));
        assert_eq!(cfg.on_retrieval_failure, RetrievalFailurePolicy::Abort);
    }
}
