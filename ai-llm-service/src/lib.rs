//! Hosted-model client used by the chat backend.
//!
//! - [`services::hf_inference_service::HfInferenceService`] sends prompts to the
//!   hosted inference API and normalizes every outcome into a
//!   [`generation::GenerationResult`]; it also embeds retrieval queries.
//! - [`config`] builds [`LlmModelConfig`] values from the environment once, at startup.
//! - [`retry::RetryPolicy`] bounds retries on timeouts and transport failures.
//! - [`telemetry`] provides the fmt layer and filters used by the binary.

pub mod config;
pub mod error_handler;
pub mod generation;
pub mod retry;
pub mod services;
pub mod telemetry;

pub use config::llm_model_config::LlmModelConfig;
pub use error_handler::{AiLlmError, ConfigError};
pub use generation::{GenerationResult, GenerationStatus, TextGenerator, UpstreamError};
pub use retry::RetryPolicy;
pub use services::hf_inference_service::HfInferenceService;
