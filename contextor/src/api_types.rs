//! Public API types re-used by external crates (e.g., the HTTP API layer).

use ai_llm_service::{GenerationResult, GenerationStatus};
use rag_store::{Chunk, RagError};
use serde::Serialize;

/// What happened to a question. Presentation-free: callers render the text.
#[derive(Clone, Debug, PartialEq)]
pub enum AnswerOutcome {
    /// Retrieval succeeded (or was degraded to empty context) and the
    /// generator was called.
    Generated(GenerationResult),
    /// Retrieval failed and generation was skipped.
    RetrievalFailed {
        country: String,
        kind: RetrievalFailureKind,
        reason: String,
    },
}

/// Why retrieval failed, as far as a caller needs to know.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalFailureKind {
    /// No index exists for the country, or the selector is invalid.
    UnknownCountry,
    /// The index exists but could not be read or queried.
    Unavailable,
}

impl From<&RagError> for RetrievalFailureKind {
    fn from(e: &RagError) -> Self {
        match e {
            RagError::UnknownCountry(_) => RetrievalFailureKind::UnknownCountry,
            _ => RetrievalFailureKind::Unavailable,
        }
    }
}

/// Machine-readable status of an answer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerStatus {
    Ok,
    Mocked,
    UpstreamError,
    Timeout,
    TransportError,
    RetrievalError,
}

impl From<GenerationStatus> for AnswerStatus {
    fn from(s: GenerationStatus) -> Self {
        match s {
            GenerationStatus::Ok => AnswerStatus::Ok,
            GenerationStatus::Mocked => AnswerStatus::Mocked,
            GenerationStatus::UpstreamError => AnswerStatus::UpstreamError,
            GenerationStatus::Timeout => AnswerStatus::Timeout,
            GenerationStatus::TransportError => AnswerStatus::TransportError,
        }
    }
}

impl AnswerOutcome {
    pub fn status(&self) -> AnswerStatus {
        match self {
            AnswerOutcome::Generated(r) => r.status().into(),
            AnswerOutcome::RetrievalFailed { .. } => AnswerStatus::RetrievalError,
        }
    }
}

/// Outcome together with the exact context passed to the model.
#[derive(Clone, Debug)]
pub struct QaAnswer {
    pub outcome: AnswerOutcome,
    /// Chunks that made it into the prompt, best first.
    pub context: Vec<Chunk>,
    /// Prompt size in characters (`0` when generation was skipped).
    pub prompt_chars: usize,
}
