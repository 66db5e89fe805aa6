use std::sync::Arc;

use ai_llm_service::{
    HfInferenceService,
    config::default_config::{config_hf_embedding, config_hf_generation},
};
use contextor::{ChatPipeline, ContextorConfig};
use rag_store::{HfEmbedder, RagConfig, RetrieverBackend, build_retriever, discovery};
use tracing::{info, warn};

use crate::error_handler::AppError;

pub const DEFAULT_API_ADDRESS: &str = "0.0.0.0:8000";
pub const DEFAULT_COUNTRY: &str = "albania";

/// Allowed CORS origins.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CorsOrigins {
    Any,
    List(Vec<String>),
}

impl CorsOrigins {
    /// Parses `*` or a comma-separated list of origins.
    pub fn parse(raw: &str) -> Self {
        let list: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        if list.is_empty() || list.iter().any(|o| o == "*") {
            CorsOrigins::Any
        } else {
            CorsOrigins::List(list)
        }
    }
}

/// HTTP-layer settings, read once at startup.
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Listen address, e.g. "0.0.0.0:8000".
    pub address: String,
    pub cors_origins: CorsOrigins,
    /// Country used when a request omits `country`.
    pub default_country: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_API_ADDRESS.into(),
            cors_origins: CorsOrigins::Any,
            default_country: DEFAULT_COUNTRY.into(),
        }
    }
}

impl AppConfig {
    /// Load from `API_ADDRESS`, `CORS_ALLOW_ORIGINS` and `DEFAULT_COUNTRY`.
    pub fn from_env() -> Result<Self, AppError> {
        let address = env("API_ADDRESS", DEFAULT_API_ADDRESS);
        let default_country = rag_store::normalize_country(&env("DEFAULT_COUNTRY", DEFAULT_COUNTRY))
            .map_err(|e| AppError::InvalidEnv {
                var: "DEFAULT_COUNTRY",
                reason: e.to_string(),
            })?;

        Ok(Self {
            address,
            cors_origins: CorsOrigins::parse(&env("CORS_ALLOW_ORIGINS", "*")),
            default_country,
        })
    }
}

/// Shared state for all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub pipeline: ChatPipeline,
}

impl AppState {
    pub fn new(config: AppConfig, pipeline: ChatPipeline) -> Self {
        Self { config, pipeline }
    }

    /// Builds the full object graph from environment variables.
    ///
    /// Fails fast on any invalid setting; a missing `HF_TOKEN` is not an error
    /// (answers are mocked).
    pub fn from_env() -> Result<Self, AppError> {
        let config = AppConfig::from_env()?;

        let generator = Arc::new(HfInferenceService::new(config_hf_generation()?)?);
        let embedding_svc = Arc::new(HfInferenceService::new(config_hf_embedding()?)?);

        let rag_cfg = RagConfig::from_env()?;
        if rag_cfg.backend == RetrieverBackend::Local {
            match discovery::available_countries(&rag_cfg.store_path) {
                Ok(c) if c.is_empty() => warn!(store = ?rag_cfg.store_path, "no country indexes found"),
                Ok(c) => info!(store = ?rag_cfg.store_path, countries = ?c, "country indexes found"),
                Err(e) => warn!(store = ?rag_cfg.store_path, error = %e, "cannot list country indexes"),
            }
        }
        let embedder = Arc::new(HfEmbedder::new(embedding_svc, rag_cfg.query_prefix.clone()));
        let retriever = build_retriever(&rag_cfg, embedder)?;

        let pipeline = ChatPipeline::new(retriever, generator, ContextorConfig::from_env()?);

        info!(
            address = %config.address,
            default_country = %config.default_country,
            backend = ?rag_cfg.backend,
            "application state ready"
        );
        Ok(Self::new(config, pipeline))
    }
}

fn env(k: &str, dflt: &str) -> String {
    std::env::var(k)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| dflt.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cors_origins_parsing() {
        assert_eq!(CorsOrigins::parse("*"), CorsOrigins::Any);
        assert_eq!(CorsOrigins::parse(""), CorsOrigins::Any);
        assert_eq!(
            CorsOrigins::parse("https://a.example, https://b.example"),
            CorsOrigins::List(vec!["https://a.example".into(), "https://b.example".into()])
        );
    }
}
