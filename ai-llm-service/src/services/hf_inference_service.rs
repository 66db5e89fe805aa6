//! Hosted inference client for text generation and query embeddings.
//!
//! Both operations hit the same route shape:
//! - `POST {endpoint}/models/{model}` with `{"inputs": ..., "parameters": {...}}`
//!
//! Generation never returns an error: the response (or the failure) is
//! normalized into a [`GenerationResult`]. Embeddings use the regular
//! [`AiLlmError`] path because the caller (retrieval) has its own failure type.
//!
//! # Examples
//!
//! ```no_run
//! use ai_llm_service::config::llm_model_config::LlmModelConfig;
//! use ai_llm_service::services::hf_inference_service::HfInferenceService;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cfg = LlmModelConfig::new(
//!     "https://api-inference.huggingface.co",
//!     "microsoft/Phi-4-mini-instruct",
//! )
//! .with_api_key(std::env::var("HF_TOKEN")?);
//!
//! let svc = HfInferenceService::new(cfg)?;
//! let out = svc.generate("Context:\n\n\n\n\nUser: Hi\nAssistant:").await;
//! println!("{:?} -> {:?}", out.status(), out.text());
//! # Ok(()) }
//! ```

use std::{future::Future, pin::Pin, time::Instant};

use reqwest::{StatusCode, header};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

use crate::{
    config::llm_model_config::LlmModelConfig,
    error_handler::{AiLlmError, ConfigError, make_snippet, validate_http_endpoint},
    generation::{GenerationResult, TextGenerator, UpstreamError},
};

/// Thin client for one hosted model.
///
/// Reuses a single `reqwest::Client` configured with the per-attempt timeout.
/// Cheap to share behind an `Arc`; holds no mutable state.
#[derive(Debug)]
pub struct HfInferenceService {
    client: reqwest::Client,
    cfg: LlmModelConfig,
    url_model: String,
}

impl HfInferenceService {
    /// Creates a new [`HfInferenceService`] from the given config.
    ///
    /// A missing credential is accepted here; it only switches generation to
    /// mock mode.
    ///
    /// # Errors
    /// - [`ConfigError::InvalidFormat`] if `cfg.endpoint` is not http(s)
    /// - [`ConfigError::EmptyModel`] if `cfg.model` is blank
    /// - [`AiLlmError::HttpTransport`] if the HTTP client cannot be built
    pub fn new(cfg: LlmModelConfig) -> Result<Self, AiLlmError> {
        validate_http_endpoint("HF_INFERENCE_URL", &cfg.endpoint)?;
        if cfg.model.trim().is_empty() {
            return Err(ConfigError::EmptyModel.into());
        }

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        if let Some(token) = cfg.credential() {
            let mut value = header::HeaderValue::from_str(&format!("Bearer {token}")).map_err(
                |_| ConfigError::InvalidFormat {
                    var: "HF_TOKEN",
                    reason: "not a valid header value",
                },
            )?;
            value.set_sensitive(true);
            headers.insert(header::AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .timeout(cfg.timeout)
            .default_headers(headers)
            .build()?;

        let url_model = cfg.model_url();

        info!(
            model = %cfg.model,
            endpoint = %cfg.endpoint,
            timeout_ms = cfg.timeout.as_millis() as u64,
            has_token = cfg.credential().is_some(),
            "HfInferenceService initialized"
        );

        Ok(Self {
            client,
            cfg,
            url_model,
        })
    }

    /// Generates a completion for `prompt`.
    ///
    /// - No credential → [`GenerationResult::Mocked`], without touching the network.
    /// - Timeouts and transport failures are retried per `cfg.retry`
    ///   (exponential backoff, full jitter); upstream errors are returned as-is.
    /// - `cfg.timeout` bounds the whole call, retries and backoff included.
    ///
    /// Dropping the returned future cancels the in-flight request.
    #[instrument(skip_all, fields(model = %self.cfg.model, prompt_len = prompt.len()))]
    pub async fn generate(&self, prompt: &str) -> GenerationResult {
        if self.is_mocked() {
            debug!("no credential configured, returning mocked result");
            return GenerationResult::Mocked(ConfigError::MissingApiKey.to_string());
        }

        match tokio::time::timeout(self.cfg.timeout, self.generate_with_retries(prompt)).await {
            Ok(out) => out,
            Err(_) => {
                error!(
                    url = %self.url_model,
                    deadline_ms = self.cfg.timeout.as_millis() as u64,
                    "generation deadline exceeded"
                );
                GenerationResult::Timeout(self.cfg.timeout)
            }
        }
    }

    /// Whether generation is answered locally because no credential is set.
    pub fn is_mocked(&self) -> bool {
        self.cfg.credential().is_none()
    }

    async fn generate_with_retries(&self, prompt: &str) -> GenerationResult {
        let max_attempts = self.cfg.retry.max_attempts();
        let mut attempt = 1;
        loop {
            let out = self.generate_once(prompt).await;
            if !out.is_retryable() || attempt >= max_attempts {
                return out;
            }

            let delay = self.cfg.retry.jittered_delay(attempt);
            warn!(
                attempt,
                max_attempts,
                status = %out.status(),
                delay_ms = delay.as_millis() as u64,
                "generation attempt failed, retrying"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    async fn generate_once(&self, prompt: &str) -> GenerationResult {
        let started = Instant::now();
        let body = GenerateRequest::from_cfg(&self.cfg, prompt);

        debug!("POST {}", self.url_model);
        let resp = match self.client.post(&self.url_model).json(&body).send().await {
            Ok(r) => r,
            Err(e) => return self.transport_failure(e, started),
        };

        let status = resp.status();
        let bytes = match resp.bytes().await {
            Ok(b) => b,
            Err(e) => return self.transport_failure(e, started),
        };

        let out = normalize_response(status, &bytes, prompt, self.cfg.strip_prompt_echo);
        let latency_ms = started.elapsed().as_millis() as u64;
        match &out {
            GenerationResult::Ok(text) => info!(
                %status,
                latency_ms,
                answer_len = text.len(),
                "generation completed"
            ),
            other => warn!(
                %status,
                latency_ms,
                outcome = %other.status(),
                snippet = %make_snippet(&String::from_utf8_lossy(&bytes)),
                "generation returned no text"
            ),
        }
        out
    }

    fn transport_failure(&self, e: reqwest::Error, started: Instant) -> GenerationResult {
        let latency_ms = started.elapsed().as_millis() as u64;
        if e.is_timeout() {
            error!(latency_ms, url = %self.url_model, "inference request timed out");
            GenerationResult::Timeout(self.cfg.timeout)
        } else {
            let cause = describe_error(&e);
            error!(latency_ms, url = %self.url_model, %cause, "inference transport failure");
            GenerationResult::TransportError(cause)
        }
    }

    /// Embeds `input` through the feature-extraction route of the same API.
    ///
    /// Accepts either a flat vector or a token matrix (mean-pooled).
    ///
    /// # Errors
    /// - [`ConfigError::MissingApiKey`] when no credential is configured
    /// - [`AiLlmError::Timeout`] / [`AiLlmError::HttpTransport`] on network failures
    /// - [`AiLlmError::HttpStatus`] for non-2xx responses
    /// - [`AiLlmError::Decode`] if the JSON has no usable vector
    #[instrument(skip_all, fields(model = %self.cfg.model, input_len = input.len()))]
    pub async fn embed(&self, input: &str) -> Result<Vec<f32>, AiLlmError> {
        if self.cfg.credential().is_none() {
            return Err(ConfigError::MissingApiKey.into());
        }

        let started = Instant::now();
        debug!("POST {}", self.url_model);
        let resp = self
            .client
            .post(&self.url_model)
            .json(&EmbeddingsRequest { inputs: input })
            .send()
            .await
            .map_err(|e| self.embed_transport_error(e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            let snippet = make_snippet(&text);
            error!(
                %status,
                url = %self.url_model,
                %snippet,
                latency_ms = started.elapsed().as_millis() as u64,
                "embedding request returned non-success status"
            );
            return Err(AiLlmError::HttpStatus {
                status,
                url: self.url_model.clone(),
                snippet,
            });
        }

        let out: EmbeddingsResponse = resp.json().await.map_err(|e| {
            AiLlmError::Decode(format!(
                "serde error: {e}; expected number[] or number[][]"
            ))
        })?;
        let vector = out.into_vector()?;

        debug!(
            dim = vector.len(),
            latency_ms = started.elapsed().as_millis() as u64,
            "embedding completed"
        );
        Ok(vector)
    }

    fn embed_transport_error(&self, e: reqwest::Error) -> AiLlmError {
        if e.is_timeout() {
            AiLlmError::Timeout(self.cfg.timeout)
        } else {
            AiLlmError::HttpTransport(e)
        }
    }
}

impl TextGenerator for HfInferenceService {
    fn generate<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = GenerationResult> + Send + 'a>> {
        Box::pin(HfInferenceService::generate(self, prompt))
    }

    fn is_mocked(&self) -> bool {
        HfInferenceService::is_mocked(self)
    }
}

/// Maps a response body onto the finite set of outcomes.
///
/// Priority: generated text, then a structured `error`, then the HTTP status,
/// then "malformed".
fn normalize_response(
    status: StatusCode,
    body: &[u8],
    prompt: &str,
    strip_prompt_echo: bool,
) -> GenerationResult {
    let first_text = |items: Vec<GeneratedText>| items.into_iter().next()?.generated_text;
    match serde_json::from_slice::<InferenceResponse>(body) {
        Ok(InferenceResponse::Generated(items)) => match first_text(items) {
            Some(text) if strip_prompt_echo => GenerationResult::Ok(strip_echo(text, prompt)),
            Some(text) => GenerationResult::Ok(text),
            None => GenerationResult::UpstreamError(UpstreamError::Malformed(make_snippet(
                &String::from_utf8_lossy(body),
            ))),
        },
        Ok(InferenceResponse::Rejected(body)) => {
            GenerationResult::UpstreamError(UpstreamError::Rejected(body.error.into_message()))
        }
        Err(_) if !status.is_success() => {
            GenerationResult::UpstreamError(UpstreamError::HttpStatus {
                status: status.as_u16(),
                snippet: make_snippet(&String::from_utf8_lossy(body)),
            })
        }
        Err(_) => GenerationResult::UpstreamError(UpstreamError::Malformed(make_snippet(
            &String::from_utf8_lossy(body),
        ))),
    }
}

fn strip_echo(text: String, prompt: &str) -> String {
    match text.strip_prefix(prompt) {
        Some(rest) if !prompt.is_empty() => rest.to_string(),
        _ => text,
    }
}

/// Renders an error with its `source()` chain, e.g. `error sending request: connection refused`.
fn describe_error(e: &dyn std::error::Error) -> String {
    let mut out = e.to_string();
    let mut cur = e.source();
    while let Some(src) = cur {
        let s = src.to_string();
        if !out.contains(&s) {
            out.push_str(": ");
            out.push_str(&s);
        }
        cur = src.source();
    }
    out
}

/* ==========================
HTTP payloads & options
========================== */

/// Request body for text generation.
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    inputs: &'a str,
    parameters: GenerateParameters,
}

impl<'a> GenerateRequest<'a> {
    fn from_cfg(cfg: &LlmModelConfig, prompt: &'a str) -> Self {
        Self {
            inputs: prompt,
            parameters: GenerateParameters {
                max_new_tokens: cfg.max_new_tokens,
                do_sample: cfg.do_sample,
                temperature: cfg.temperature,
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerateParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_new_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    do_sample: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// Known response shapes of the text-generation route.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InferenceResponse {
    /// `[{"generated_text": "..."}, ...]`; only the first element is read.
    Generated(Vec<GeneratedText>),
    /// `{"error": "..."}`, `{"error": ["...", "..."]}` or `{"error": {...}}`
    Rejected(ErrorBody),
}

#[derive(Debug, Deserialize)]
struct GeneratedText {
    #[serde(default)]
    generated_text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorField,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorField {
    One(String),
    Many(Vec<String>),
    Other(serde_json::Value),
}

impl ErrorField {
    fn into_message(self) -> String {
        match self {
            ErrorField::One(s) => s,
            ErrorField::Many(v) => v.join("; "),
            ErrorField::Other(v) => match v.get("message").and_then(serde_json::Value::as_str) {
                Some(msg) => msg.to_string(),
                None => v.to_string(),
            },
        }
    }
}

/// Request body for feature extraction.
#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    inputs: &'a str,
}

/// Feature extraction returns a sentence vector or per-token vectors.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EmbeddingsResponse {
    Flat(Vec<f32>),
    Tokens(Vec<Vec<f32>>),
}

impl EmbeddingsResponse {
    fn into_vector(self) -> Result<Vec<f32>, AiLlmError> {
        match self {
            EmbeddingsResponse::Flat(v) if !v.is_empty() => Ok(v),
            EmbeddingsResponse::Tokens(rows) => mean_pool(rows),
            EmbeddingsResponse::Flat(_) => Err(AiLlmError::Decode("empty embedding".into())),
        }
    }
}

fn mean_pool(rows: Vec<Vec<f32>>) -> Result<Vec<f32>, AiLlmError> {
    let dim = rows.first().map(Vec::len).unwrap_or(0);
    if dim == 0 {
        return Err(AiLlmError::Decode("empty embedding".into()));
    }
    if rows.iter().any(|r| r.len() != dim) {
        return Err(AiLlmError::Decode("ragged token embeddings".into()));
    }
    let n = rows.len() as f32;
    let mut out = vec![0.0f32; dim];
    for row in &rows {
        for (acc, x) in out.iter_mut().zip(row) {
            *acc += x;
        }
    }
    out.iter_mut().for_each(|x| *x /= n);
    Ok(out)
}
