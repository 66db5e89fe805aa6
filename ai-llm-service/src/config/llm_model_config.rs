use std::time::Duration;

use crate::retry::RetryPolicy;

/// Default base URL of the hosted inference API.
pub const DEFAULT_INFERENCE_URL: &str = "https://api-inference.huggingface.co";

/// Default request timeout for a single inference attempt.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for one hosted model (generation or embedding).
///
/// Built once at process start (see [`crate::config::default_config`]) and
/// handed to [`crate::services::hf_inference_service::HfInferenceService`].
/// Nothing in this crate reads the environment after construction, so tests
/// can build a config by hand and point it at a local stub.
///
/// # Fields
///
/// - `endpoint`: base URL of the inference API; requests go to `{endpoint}/models/{model}`.
/// - `model`: the model identifier (e.g., `"microsoft/Phi-4-mini-instruct"`).
/// - `api_key`: bearer credential. `None` puts generation into mock mode.
/// - `max_new_tokens`: cap on generated tokens.
/// - `do_sample`: sampling switch (`false` = greedy/deterministic decoding).
/// - `temperature`: sampling temperature.
/// - `timeout`: per-attempt request timeout.
/// - `retry`: bounded retry policy for transport failures and timeouts.
/// - `strip_prompt_echo`: remove the prompt prefix if the model echoes it back.
///
/// # Examples
///
/// ```
/// use ai_llm_service::config::llm_model_config::LlmModelConfig;
///
/// let cfg = LlmModelConfig::new("http://127.0.0.1:9999", "tiny-model")
///     .with_api_key("hf_test");
/// assert_eq!(cfg.model_url(), "http://127.0.0.1:9999/models/tiny-model");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LlmModelConfig {
    /// Inference API base URL.
    pub endpoint: String,

    /// Model identifier string.
    pub model: String,

    /// Optional bearer token.
    pub api_key: Option<String>,

    /// Maximum number of tokens to generate.
    pub max_new_tokens: Option<u32>,

    /// Whether the model may sample.
    pub do_sample: Option<bool>,

    /// Sampling temperature.
    pub temperature: Option<f32>,

    /// Per-attempt request timeout.
    pub timeout: Duration,

    /// Retry policy applied to timeouts and transport errors.
    pub retry: RetryPolicy,

    /// Strip an echoed prompt from `generated_text`.
    pub strip_prompt_echo: bool,
}

impl LlmModelConfig {
    /// Creates a config with deterministic decoding defaults
    /// (`max_new_tokens = 200`, `do_sample = false`, `temperature = 0.3`).
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            model: model.into(),
            api_key: None,
            max_new_tokens: Some(200),
            do_sample: Some(false),
            temperature: Some(0.3),
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
            strip_prompt_echo: true,
        }
    }

    /// Sets the bearer credential.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Full URL of the model route: `{endpoint}/models/{model}`.
    pub fn model_url(&self) -> String {
        format!(
            "{}/models/{}",
            self.endpoint.trim().trim_end_matches('/'),
            self.model.trim()
        )
    }

    /// Returns the credential if it is present and non-blank.
    pub fn credential(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}
