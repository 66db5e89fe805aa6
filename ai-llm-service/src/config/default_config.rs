//! Default model configs loaded from environment variables.
//!
//! Two roles are supported, both served by the hosted inference API:
//!
//! - **Generation** → the chat/completion model answering questions
//! - **Embedding**  → the feature-extraction model used to embed queries
//!
//! These constructors are meant to run once at process start. The resulting
//! [`LlmModelConfig`] values are then passed down explicitly.
//!
//! # Environment variables
//!
//! Common:
//! - `HF_TOKEN`          = bearer token (optional; missing → mocked answers)
//! - `HF_INFERENCE_URL`  = API base URL (default `https://api-inference.huggingface.co`)
//! - `LLM_TIMEOUT_SECS`  = per-attempt timeout (default `30`)
//! - `LLM_MAX_RETRIES`   = retries on timeout/transport errors (default `2`)
//!
//! Generation:
//! - `HF_MODEL`              = model id (default `microsoft/Phi-4-mini-instruct`)
//! - `LLM_MAX_NEW_TOKENS`    = token cap (default `200`)
//! - `LLM_TEMPERATURE`       = temperature (default `0.3`, range `0.0..=2.0`)
//! - `LLM_STRIP_PROMPT_ECHO` = strip echoed prompt (default `true`)
//!
//! Embedding:
//! - `EMBEDDING_MODEL` = model id (default `intfloat/multilingual-e5-large`)

use std::time::Duration;

use tracing::{info, warn};

use crate::{
    config::llm_model_config::{DEFAULT_INFERENCE_URL, LlmModelConfig},
    error_handler::{
        AiLlmError, ConfigError, env_opt_bool, env_opt_f32, env_opt_string, env_opt_u32,
        env_opt_u64, validate_http_endpoint, validate_range_f32,
    },
    retry::RetryPolicy,
};

/// Default generation model.
pub const DEFAULT_GENERATION_MODEL: &str = "microsoft/Phi-4-mini-instruct";

/// Default embedding model.
pub const DEFAULT_EMBEDDING_MODEL: &str = "intfloat/multilingual-e5-large";

/// Resolves the shared parts of both configs: endpoint, token, timeout, retry.
fn base_config(model: String) -> Result<LlmModelConfig, AiLlmError> {
    let endpoint =
        env_opt_string("HF_INFERENCE_URL").unwrap_or_else(|| DEFAULT_INFERENCE_URL.to_string());
    validate_http_endpoint("HF_INFERENCE_URL", &endpoint)?;

    if model.trim().is_empty() {
        return Err(ConfigError::EmptyModel.into());
    }

    let mut cfg = LlmModelConfig::new(endpoint, model);
    cfg.api_key = env_opt_string("HF_TOKEN");

    if let Some(secs) = env_opt_u64("LLM_TIMEOUT_SECS")? {
        if secs == 0 {
            return Err(ConfigError::OutOfRange {
                field: "LLM_TIMEOUT_SECS",
                detail: "must be > 0",
            }
            .into());
        }
        cfg.timeout = Duration::from_secs(secs);
    }

    if let Some(max_retries) = env_opt_u32("LLM_MAX_RETRIES")? {
        cfg.retry = RetryPolicy {
            max_retries,
            ..RetryPolicy::default()
        };
    }

    Ok(cfg)
}

/// Constructs the config for the **generation** model.
///
/// # Defaults
/// - `max_new_tokens = 200`
/// - `do_sample = false`
/// - `temperature = 0.3`
/// - `timeout = 30s`
///
/// # Errors
/// - [`ConfigError::InvalidNumber`] for unparsable numbers
/// - [`ConfigError::OutOfRange`] for a temperature outside `0.0..=2.0`
/// - [`ConfigError::InvalidFormat`] for a non-http(s) endpoint
pub fn config_hf_generation() -> Result<LlmModelConfig, AiLlmError> {
    let model =
        env_opt_string("HF_MODEL").unwrap_or_else(|| DEFAULT_GENERATION_MODEL.to_string());
    let mut cfg = base_config(model)?;

    if let Some(max_new_tokens) = env_opt_u32("LLM_MAX_NEW_TOKENS")? {
        cfg.max_new_tokens = Some(max_new_tokens);
    }
    if let Some(t) = env_opt_f32("LLM_TEMPERATURE")? {
        validate_range_f32("LLM_TEMPERATURE", t, 0.0, 2.0)?;
        cfg.temperature = Some(t);
    }
    if let Some(strip) = env_opt_bool("LLM_STRIP_PROMPT_ECHO")? {
        cfg.strip_prompt_echo = strip;
    }

    if cfg.credential().is_none() {
        warn!("HF_TOKEN is not set; generation will return mocked answers");
    }

    info!(
        model = %cfg.model,
        endpoint = %cfg.endpoint,
        timeout_secs = cfg.timeout.as_secs(),
        max_retries = cfg.retry.max_retries,
        "generation config loaded"
    );

    Ok(cfg)
}

/// Constructs the config for the **embedding** model.
///
/// Generation-only parameters are cleared since feature extraction ignores them.
///
/// # Errors
/// Same as [`config_hf_generation`] for the shared variables.
pub fn config_hf_embedding() -> Result<LlmModelConfig, AiLlmError> {
    let model =
        env_opt_string("EMBEDDING_MODEL").unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string());
    let mut cfg = base_config(model)?;
    cfg.max_new_tokens = None;
    cfg.do_sample = None;
    cfg.temperature = None;
    cfg.strip_prompt_echo = false;

    info!(model = %cfg.model, endpoint = %cfg.endpoint, "embedding config loaded");

    Ok(cfg)
}
