//! Hosted feature-extraction embedding provider.
//!
//! Delegates to the shared [`HfInferenceService`] and prepends the configured
//! query prefix (`"query: "` for e5-family models).

use std::sync::Arc;

use ai_llm_service::HfInferenceService;

use crate::{EmbeddingsProvider, RagError};

/// Query embedder backed by the hosted inference API.
#[derive(Clone)]
pub struct HfEmbedder {
    svc: Arc<HfInferenceService>,
    query_prefix: String,
}

impl HfEmbedder {
    /// Construct a new embedder around a shared service.
    pub fn new(svc: Arc<HfInferenceService>, query_prefix: impl Into<String>) -> Self {
        Self {
            svc,
            query_prefix: query_prefix.into(),
        }
    }
}

impl EmbeddingsProvider for HfEmbedder {
    fn embed<'a>(
        &'a self,
        text: &'a str,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Vec<f32>, RagError>> + Send + 'a>>
    {
        Box::pin(async move {
            let input = format!("{}{}", self.query_prefix, text);
            self.svc
                .embed(&input)
                .await
                .map_err(|e| RagError::Embedding(e.to_string()))
        })
    }
}
