//! Outcome types for text generation and the generator seam.
//!
//! Generation never fails with an error value. Every outcome, good or bad, is a
//! [`GenerationResult`] variant so callers can always produce an answer and
//! decide for themselves how to present a failure.

use std::{fmt, future::Future, pin::Pin, time::Duration};

use serde::Serialize;

/// Result of one generation call.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationResult {
    /// The model produced text.
    Ok(String),
    /// No credential is configured; no request was made.
    Mocked(String),
    /// The service answered, but not with generated text.
    UpstreamError(UpstreamError),
    /// The deadline passed before an attempt produced an answer.
    Timeout(Duration),
    /// Network/protocol failure with the underlying cause.
    TransportError(String),
}

/// Ways the inference service can answer without producing text.
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamError {
    /// Structured rejection (`{"error": ...}`), e.g. "model busy".
    Rejected(String),
    /// The payload matched no known schema; holds the raw (truncated) body.
    Malformed(String),
    /// Non-success status with a body that is not a structured rejection.
    HttpStatus { status: u16, snippet: String },
}

/// Machine-readable tag for a [`GenerationResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
    Ok,
    Mocked,
    UpstreamError,
    Timeout,
    TransportError,
}

impl GenerationResult {
    /// Status tag of this result.
    pub fn status(&self) -> GenerationStatus {
        match self {
            GenerationResult::Ok(_) => GenerationStatus::Ok,
            GenerationResult::Mocked(_) => GenerationStatus::Mocked,
            GenerationResult::UpstreamError(_) => GenerationStatus::UpstreamError,
            GenerationResult::Timeout(_) => GenerationStatus::Timeout,
            GenerationResult::TransportError(_) => GenerationStatus::TransportError,
        }
    }

    /// Generated text, if any.
    pub fn text(&self) -> Option<&str> {
        match self {
            GenerationResult::Ok(t) => Some(t),
            _ => None,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, GenerationResult::Ok(_))
    }

    /// Whether another attempt could succeed: only timeouts and transport failures.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GenerationResult::Timeout(_) | GenerationResult::TransportError(_)
        )
    }
}

impl fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpstreamError::Rejected(msg) => f.write_str(msg),
            UpstreamError::Malformed(raw) => write!(f, "unexpected format: {raw}"),
            UpstreamError::HttpStatus { status, snippet } => write!(f, "HTTP {status}: {snippet}"),
        }
    }
}

impl fmt::Display for GenerationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GenerationStatus::Ok => "ok",
            GenerationStatus::Mocked => "mocked",
            GenerationStatus::UpstreamError => "upstream_error",
            GenerationStatus::Timeout => "timeout",
            GenerationStatus::TransportError => "transport_error",
        };
        f.write_str(s)
    }
}

/// Anything that turns a prompt into a [`GenerationResult`].
///
/// Implemented by [`HfInferenceService`](crate::services::hf_inference_service::HfInferenceService);
/// tests plug in their own generators.
pub trait TextGenerator: Send + Sync {
    fn generate<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = GenerationResult> + Send + 'a>>;

    /// True when every call would return [`GenerationResult::Mocked`].
    fn is_mocked(&self) -> bool {
        false
    }
}
