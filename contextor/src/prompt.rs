//! Prompt builder: context block + conversation history + the question.
//!
//! Layout (exact, models are sensitive to it):
//!
//! ```text
//! Context:
//! {chunks joined by a blank line}
//!
//! {history, one "Role: text" line per turn}
//!
//! User: {question}
//! Assistant:
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Speaker of a conversation turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Capitalized label used in the prompt.
    pub fn label(self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }
}

/// One prior turn of the conversation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub text: String,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }
}

/// The finished model input. Built once per request and never mutated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Prompt(String);

impl Prompt {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length in characters (Unicode scalar values).
    pub fn char_count(&self) -> usize {
        self.0.chars().count()
    }
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Prompt {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Upper bound on the estimated prompt size. `None` disables truncation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PromptBudget {
    pub max_tokens: Option<usize>,
}

impl PromptBudget {
    pub const UNLIMITED: PromptBudget = PromptBudget { max_tokens: None };

    /// Budget of `max_tokens`; `0` means unlimited.
    pub fn tokens(max_tokens: usize) -> Self {
        Self {
            max_tokens: (max_tokens > 0).then_some(max_tokens),
        }
    }

    fn admits(&self, text: &str) -> bool {
        self.max_tokens
            .is_none_or(|max| estimate_tokens(text) <= max)
    }
}

/// Rough token count: one token per four characters, rounded up.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

/// Builds the prompt from ranked chunk texts, the question and the history.
///
/// Empty context or history render as empty blocks; the framing stays the same.
pub fn assemble<C: AsRef<str>>(context: &[C], question: &str, history: &[ChatTurn]) -> Prompt {
    let context_block = context
        .iter()
        .map(|c| c.as_ref())
        .collect::<Vec<_>>()
        .join("\n\n");
    let history_block = history
        .iter()
        .map(|t| format!("{}: {}", t.role.label(), t.text))
        .collect::<Vec<_>>()
        .join("\n");

    Prompt(format!(
        "Context:\n{context_block}\n\n{history_block}\n\nUser: {question}\nAssistant:"
    ))
}

/// Like [`assemble`], but drops material until the prompt fits `budget`.
///
/// The oldest history turns go first, then the lowest-ranked chunks. The
/// question and the framing are always kept, so the result can still exceed
/// a very small budget.
pub fn assemble_within<C: AsRef<str>>(
    context: &[C],
    question: &str,
    history: &[ChatTurn],
    budget: PromptBudget,
) -> Prompt {
    fit(context, question, history, budget).0
}

/// Budgeted assembly that also reports how many leading chunks were kept.
pub(crate) fn fit<C: AsRef<str>>(
    context: &[C],
    question: &str,
    history: &[ChatTurn],
    budget: PromptBudget,
) -> (Prompt, usize) {
    let mut kept_chunks = context.len();
    let mut first_turn = 0usize;

    loop {
        let prompt = assemble(&context[..kept_chunks], question, &history[first_turn..]);
        let exhausted = kept_chunks == 0 && first_turn == history.len();
        if budget.admits(prompt.as_str()) || exhausted {
            if kept_chunks < context.len() || first_turn > 0 {
                debug!(
                    turns_dropped = first_turn,
                    chunks_dropped = context.len() - kept_chunks,
                    est_tokens = estimate_tokens(prompt.as_str()),
                    max_tokens = ?budget.max_tokens,
                    "prompt truncated to fit budget"
                );
            }
            return (prompt, kept_chunks);
        }

        if first_turn < history.len() {
            first_turn += 1;
        } else {
            kept_chunks -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAPITAL: &str = "Tirana is the capital of Albania.";
    const PORT: &str = "Durres hosts the largest port in the country.";

    #[test]
    fn framing_with_context_and_history() {
        let history = [ChatTurn::user("hi"), ChatTurn::assistant("hello")];
        let p = assemble(&["A", "B"], "What now?", &history);
        assert_eq!(
            p.as_str(),
            "Context:\nA\n\nB\n\nUser: hi\nAssistant: hello\n\nUser: What now?\nAssistant:"
        );
    }

    #[test]
    fn empty_inputs_keep_the_framing() {
        let none: [&str; 0] = [];
        let p = assemble(&none, "Q", &[]);
        assert_eq!(p.as_str(), "Context:\n\n\n\n\nUser: Q\nAssistant:");
        assert!(p.as_str().starts_with("Context:\n"));
        assert!(p.as_str().ends_with("User: Q\nAssistant:"));
    }

    #[test]
    fn chunks_stay_in_rank_order() {
        let p = assemble(&[PORT, CAPITAL], "q", &[]);
        let s = p.as_str();
        assert!(s.find(PORT).unwrap() < s.find(CAPITAL).unwrap());
    }

    #[test]
    fn unlimited_budget_matches_assemble() {
        let history = [ChatTurn::user("hi")];
        assert_eq!(
            assemble_within(&[CAPITAL], "q", &history, PromptBudget::UNLIMITED),
            assemble(&[CAPITAL], "q", &history)
        );
        assert_eq!(PromptBudget::tokens(0), PromptBudget::UNLIMITED);
    }

    #[test]
    fn oldest_turn_is_dropped_first() {
        let history = [
            ChatTurn::user("Tell me about the coast."),
            ChatTurn::assistant("It is long."),
        ];
        let target = assemble(&[CAPITAL, PORT], "q", &history[1..]);
        let budget = PromptBudget::tokens(estimate_tokens(target.as_str()));

        assert_eq!(assemble_within(&[CAPITAL, PORT], "q", &history, budget), target);
    }

    #[test]
    fn lowest_ranked_chunk_goes_after_history() {
        let history = [ChatTurn::user("Tell me about the coast.")];
        let target = assemble(&[CAPITAL], "q", &[]);
        let budget = PromptBudget::tokens(estimate_tokens(target.as_str()));

        let (p, kept) = fit(&[CAPITAL, PORT], "q", &history, budget);
        assert_eq!(p, target);
        assert_eq!(kept, 1);
    }

    #[test]
    fn question_survives_a_tiny_budget() {
        let none: [&str; 0] = [];
        let p = assemble_within(
            &[CAPITAL, PORT],
            "What is the capital?",
            &[ChatTurn::user("hi")],
            PromptBudget::tokens(1),
        );
        assert_eq!(p, assemble(&none, "What is the capital?", &[]));
    }

    #[test]
    fn history_deserializes_lowercase_roles() {
        let turns: Vec<ChatTurn> = serde_json::from_str(
            r#"[{"role":"user","text":"hi"},{"role":"assistant","text":"hello"}]"#,
        )
        .unwrap();
        assert_eq!(turns, [ChatTurn::user("hi"), ChatTurn::assistant("hello")]);
        assert!(serde_json::from_str::<ChatTurn>(r#"{"role":"system","text":"x"}"#).is_err());
    }
}
