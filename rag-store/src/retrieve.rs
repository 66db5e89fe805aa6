//! The retrieval seam and helpers shared by all backends.

use std::{future::Future, pin::Pin, sync::Arc};

use tracing::info;

use crate::config::{RagConfig, RetrieverBackend};
use crate::embed::EmbeddingsProvider;
use crate::errors::RagError;
use crate::local_index::LocalIndexRetriever;
use crate::qdrant_facade::QdrantRetriever;
use crate::record::Chunk;

/// Returns up to `top_k` chunks for `query` within one country's collection,
/// most relevant first. An empty result is a valid answer.
pub trait ChunkRetriever: Send + Sync {
    fn top_chunks<'a>(
        &'a self,
        query: &'a str,
        country: &'a str,
        top_k: usize,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Chunk>, RagError>> + Send + 'a>>;
}

/// Canonical country key: trimmed, lowercased, `[a-z0-9_-]+`.
///
/// Anything else cannot name a collection (and could escape the store
/// directory), so it is reported as an unknown country.
///
/// # Errors
/// Returns [`RagError::UnknownCountry`] for empty or invalid selectors.
pub fn normalize_country(raw: &str) -> Result<String, RagError> {
    let c = raw.trim().to_ascii_lowercase();
    let valid = !c.is_empty()
        && c
            .chars()
            .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-' || ch == '_');
    if valid {
        Ok(c)
    } else {
        Err(RagError::UnknownCountry(raw.trim().to_string()))
    }
}

/// Builds the retriever selected by `cfg.backend`.
///
/// # Errors
/// Returns `RagError::Config`/`RagError::Qdrant` if the backend cannot be initialized.
pub fn build_retriever(
    cfg: &RagConfig,
    embedder: Arc<dyn EmbeddingsProvider>,
) -> Result<Arc<dyn ChunkRetriever>, RagError> {
    cfg.validate()?;
    info!(backend = ?cfg.backend, "building chunk retriever");
    Ok(match cfg.backend {
        RetrieverBackend::Local => Arc::new(LocalIndexRetriever::new(&cfg.store_path, embedder)),
        RetrieverBackend::Qdrant => Arc::new(QdrantRetriever::new(cfg, embedder)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn country_normalization() {
        assert_eq!(normalize_country(" Albania ").unwrap(), "albania");
        assert_eq!(normalize_country("north-macedonia").unwrap(), "north-macedonia");
        for bad in ["", "   ", "../etc", "al bania", "kosovo/..", "ñ"] {
            assert!(
                matches!(normalize_country(bad), Err(RagError::UnknownCountry(_))),
                "{bad:?}"
            );
        }
    }
}
