use ai_llm_service::{GenerationResult, UpstreamError};
use contextor::{AnswerOutcome, AnswerStatus, ChatTurn, QaAnswer, RetrievalFailureKind};
use serde::{Deserialize, Serialize};

/// Request payload for /chat.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// Natural language question.
    pub question: String,
    /// Country whose documents are searched; the configured default when omitted.
    #[serde(default)]
    pub country: Option<String>,
    /// Prior turns, oldest first.
    #[serde(default)]
    pub history: Vec<ChatTurn>,
}

/// Response payload for /chat.
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    /// Answer text (trimmed). Failures are rendered as a readable sentence.
    pub answer: String,
    pub status: AnswerStatus,
    /// Machine-oriented cause for non-`ok` statuses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Chunks that were given to the model.
    pub sources: Vec<SourceRef>,
}

#[derive(Debug, Serialize)]
pub struct SourceRef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub score: f32,
}

pub const MOCK_ANSWER: &str = "(Mock) HF_TOKEN is missing. Set it in your environment.";

impl From<QaAnswer> for ChatResponse {
    fn from(qa: QaAnswer) -> Self {
        let status = qa.outcome.status();
        let (answer, detail) = render(qa.outcome);
        ChatResponse {
            answer: answer.trim().to_string(),
            status,
            detail,
            sources: qa
                .context
                .into_iter()
                .map(|c| SourceRef {
                    source: c.source,
                    score: c.score,
                })
                .collect(),
        }
    }
}

/// Turns an outcome into `(answer, detail)`.
fn render(outcome: AnswerOutcome) -> (String, Option<String>) {
    match outcome {
        AnswerOutcome::Generated(GenerationResult::Ok(text)) => (text, None),
        AnswerOutcome::Generated(GenerationResult::Mocked(reason)) => {
            (MOCK_ANSWER.to_string(), Some(reason))
        }
        AnswerOutcome::Generated(GenerationResult::Timeout(after)) => (
            "Sorry, the language model did not respond in time. Please try again.".to_string(),
            Some(format!("timed out after {}s", after.as_secs())),
        ),
        AnswerOutcome::Generated(GenerationResult::TransportError(cause)) => (
            format!("Sorry, the language model could not be reached: {cause}"),
            Some(cause),
        ),
        AnswerOutcome::Generated(GenerationResult::UpstreamError(e)) => {
            let answer = match &e {
                UpstreamError::Rejected(msg) => format!("The language model returned an error: {msg}"),
                UpstreamError::Malformed(_) => {
                    "The language model returned a response in an unexpected format.".to_string()
                }
                UpstreamError::HttpStatus { status, .. } => {
                    format!("The language model service failed with HTTP {status}.")
                }
            };
            (answer, Some(e.to_string()))
        }
        AnswerOutcome::RetrievalFailed {
            country,
            kind: RetrievalFailureKind::UnknownCountry,
            reason,
        } => (
            format!("Sorry, I could not find any information for country \"{country}\"."),
            Some(reason),
        ),
        AnswerOutcome::RetrievalFailed {
            country,
            kind: RetrievalFailureKind::Unavailable,
            reason,
        } => (
            format!(
                "Sorry, the documents for country \"{country}\" could not be searched right now. Please try again."
            ),
            Some(reason),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rag_store::Chunk;
    use std::time::Duration;

    fn answer(outcome: AnswerOutcome) -> ChatResponse {
        QaAnswer {
            outcome,
            context: vec![Chunk {
                text: "t".into(),
                source: Some("albania.pdf".into()),
                score: 0.5,
            }],
            prompt_chars: 10,
        }
        .into()
    }

    #[test]
    fn ok_answer_is_trimmed() {
        let r = answer(AnswerOutcome::Generated(GenerationResult::Ok("  Tirana.\n".into())));
        assert_eq!(r.answer, "Tirana.");
        assert_eq!(r.status, AnswerStatus::Ok);
        assert!(r.detail.is_none());
        assert_eq!(r.sources[0].source.as_deref(), Some("albania.pdf"));
    }

    #[test]
    fn failures_render_readable_answers() {
        let r = answer(AnswerOutcome::Generated(GenerationResult::Mocked("no token".into())));
        assert_eq!(r.answer, MOCK_ANSWER);
        assert_eq!(r.detail.as_deref(), Some("no token"));

        let r = answer(AnswerOutcome::Generated(GenerationResult::UpstreamError(
            UpstreamError::Rejected("model busy".into()),
        )));
        assert_eq!(r.status, AnswerStatus::UpstreamError);
        assert!(r.answer.ends_with("model busy"));

        let r = answer(AnswerOutcome::Generated(GenerationResult::Timeout(Duration::from_secs(30))));
        assert_eq!(r.detail.as_deref(), Some("timed out after 30s"));

    }

    #[test]
    fn retrieval_failures_say_what_went_wrong() {
        let r = answer(AnswerOutcome::RetrievalFailed {
            country: "atlantis".into(),
            kind: RetrievalFailureKind::UnknownCountry,
            reason: "unknown country: atlantis".into(),
        });
        assert_eq!(r.status, AnswerStatus::RetrievalError);
        assert!(r.answer.contains("could not find any information"));
        assert!(r.answer.contains("\"atlantis\""));

        let r = answer(AnswerOutcome::RetrievalFailed {
            country: "albania".into(),
            kind: RetrievalFailureKind::Unavailable,
            reason: "embedding error: connection refused".into(),
        });
        assert_eq!(r.status, AnswerStatus::RetrievalError);
        assert!(!r.answer.contains("could not find any information"));
        assert!(r.answer.contains("\"albania\" could not be searched"));
        assert_eq!(r.detail.as_deref(), Some("embedding error: connection refused"));
    }

    #[test]
    fn status_and_optional_fields_serialize() {
        let r = answer(AnswerOutcome::Generated(GenerationResult::TransportError("reset".into())));
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["status"], "transport_error");
        assert_eq!(v["detail"], "reset");

        let r = answer(AnswerOutcome::Generated(GenerationResult::Ok("x".into())));
        let v = serde_json::to_value(&r).unwrap();
        assert!(v.get("detail").is_none());
    }
}
