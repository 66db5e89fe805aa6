//! Retrieval configuration.

use std::path::PathBuf;

use crate::errors::RagError;

/// Where chunks are retrieved from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetrieverBackend {
    /// Per-country JSONL files under `store_path`.
    Local,
    /// One Qdrant collection per country.
    Qdrant,
}

impl std::str::FromStr for RetrieverBackend {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(RetrieverBackend::Local),
            "qdrant" => Ok(RetrieverBackend::Qdrant),
            other => Err(RagError::Config(format!(
                "RAG_BACKEND must be `local` or `qdrant`, got `{other}`"
            ))),
        }
    }
}

/// Configuration for chunk retrieval.
#[derive(Clone, Debug)]
pub struct RagConfig {
    /// Selected backend.
    pub backend: RetrieverBackend,
    /// Directory holding `<country>.jsonl` index files (local backend).
    pub store_path: PathBuf,
    /// Qdrant endpoint, e.g. `http://localhost:6334`.
    pub qdrant_url: String,
    /// Optional API key for Qdrant Cloud.
    pub qdrant_api_key: Option<String>,
    /// Collection name = prefix + country.
    pub collection_prefix: String,
    /// Exact search flag (false = HNSW ANN).
    pub exact_search: bool,
    /// Prefix prepended to queries before embedding (`"query: "` for e5 models).
    pub query_prefix: String,
}

impl RagConfig {
    /// Local-backend config rooted at `store_path`.
    pub fn new_local(store_path: impl Into<PathBuf>) -> Self {
        Self {
            backend: RetrieverBackend::Local,
            store_path: store_path.into(),
            qdrant_url: "http://127.0.0.1:6334".into(),
            qdrant_api_key: None,
            collection_prefix: "chunks_".into(),
            exact_search: false,
            query_prefix: "query: ".into(),
        }
    }

    /// Reads the config from environment variables with defaults.
    ///
    /// - `RAG_BACKEND` (`local`)
    /// - `RAG_STORE_PATH` (`processed/vector_store`)
    /// - `QDRANT_URL` (`http://127.0.0.1:6334`), `QDRANT_API_KEY`, `QDRANT_COLLECTION_PREFIX` (`chunks_`)
    /// - `RAG_EXACT_SEARCH` (`false`)
    /// - `EMBEDDING_QUERY_PREFIX` (`query: `)
    ///
    /// # Errors
    /// Returns `RagError::Config` for an unknown backend or invalid values.
    pub fn from_env() -> Result<Self, RagError> {
        let mut cfg = Self::new_local(env("RAG_STORE_PATH", "processed/vector_store"));
        cfg.backend = env("RAG_BACKEND", "local").parse()?;
        cfg.qdrant_url = env("QDRANT_URL", &cfg.qdrant_url);
        cfg.qdrant_api_key = std::env::var("QDRANT_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());
        cfg.collection_prefix = env("QDRANT_COLLECTION_PREFIX", &cfg.collection_prefix);
        cfg.exact_search = env("RAG_EXACT_SEARCH", "false") == "true";
        // Unlike the other knobs, an explicitly empty prefix is meaningful.
        if let Ok(prefix) = std::env::var("EMBEDDING_QUERY_PREFIX") {
            cfg.query_prefix = prefix;
        }
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validates config values for the selected backend.
    pub fn validate(&self) -> Result<(), RagError> {
        match self.backend {
            RetrieverBackend::Local => {
                if self.store_path.as_os_str().is_empty() {
                    return Err(RagError::Config("store_path is empty".into()));
                }
            }
            RetrieverBackend::Qdrant => {
                if self.qdrant_url.trim().is_empty() {
                    return Err(RagError::Config("qdrant_url is empty".into()));
                }
            }
        }
        Ok(())
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
    fn backend_parsing() {
        assert_eq!("Local".parse::<RetrieverBackend>().unwrap(), RetrieverBackend::Local);
        assert_eq!(" qdrant ".parse::<RetrieverBackend>().unwrap(), RetrieverBackend::Qdrant);
        assert!(matches!("chroma".parse::<RetrieverBackend>(), Err(RagError::Config(_))));
    }

    #[test]
    fn empty_store_path_is_rejected() {
        assert!(RagConfig::new_local("").validate().is_err());
        assert!(RagConfig::new_local("processed/vector_store").validate().is_ok());
    }
}
