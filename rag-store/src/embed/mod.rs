use crate::errors::RagError;
use std::{future::Future, pin::Pin};

/// Provider interface for query embeddings.
///
/// Async is required because real providers perform HTTP requests.
/// Implement this trait to plug in another embedding backend (or a stub in tests).
pub trait EmbeddingsProvider: Send + Sync {
    /// Async embedding function.
    fn embed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, RagError>> + Send + 'a>>;
}

pub mod hf;
