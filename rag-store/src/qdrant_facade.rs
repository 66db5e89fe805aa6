//! Thin adapter around `qdrant-client` plus the Qdrant-backed retriever.
//!
//! This facade concentrates all Qdrant interactions behind a minimal API,
//! hiding away the verbose builder pattern and keeping the rest of the
//! crate decoupled from `qdrant-client`.

use std::{collections::HashMap, future::Future, pin::Pin, sync::Arc};

use qdrant_client::Qdrant;
use qdrant_client::qdrant::{SearchParamsBuilder, SearchPointsBuilder, Value as QValue};
use tracing::{debug, info, trace};

use crate::config::RagConfig;
use crate::embed::EmbeddingsProvider;
use crate::errors::RagError;
use crate::record::Chunk;
use crate::retrieve::{ChunkRetriever, normalize_country};

/// A facade over the Qdrant client to keep the rest of the code clean and stable.
pub struct QdrantFacade {
    client: Qdrant,
}

impl QdrantFacade {
    /// Creates a new facade from the given configuration.
    ///
    /// Supports optional API key authentication.
    pub fn new(cfg: &RagConfig) -> Result<Self, RagError> {
        let mut builder = Qdrant::from_url(&cfg.qdrant_url);
        if let Some(key) = &cfg.qdrant_api_key {
            builder = builder.api_key(key.clone());
        }
        let client = builder
            .build()
            .map_err(|e| RagError::Qdrant(e.to_string()))?;

        Ok(Self { client })
    }

    /// Whether `collection` exists.
    pub async fn collection_exists(&self, collection: &str) -> Result<bool, RagError> {
        self.client
            .collection_exists(collection)
            .await
            .map_err(|e| RagError::Qdrant(e.to_string()))
    }

    /// Performs a similarity search in `collection`.
    ///
    /// Returns `(score, payload)` tuples sorted by score.
    pub async fn search(
        &self,
        collection: &str,
        vector: Vec<f32>,
        top_k: u64,
        exact: bool,
    ) -> Result<Vec<(f32, serde_json::Value)>, RagError> {
        info!(
            "Searching in '{}' with top_k={}, exact={}",
            collection, top_k, exact
        );

        let mut builder = SearchPointsBuilder::new(collection, vector, top_k).with_payload(true);
        if exact {
            builder = builder.params(SearchParamsBuilder::default().exact(true));
        }

        let res = self
            .client
            .search_points(builder)
            .await
            .map_err(|e| RagError::Qdrant(e.to_string()))?;

        let out: Vec<_> = res
            .result
            .into_iter()
            .map(|r| (r.score, qpayload_to_json(r.payload)))
            .collect();

        debug!("Search completed: {} hits returned", out.len());
        Ok(out)
    }
}

/// Converts a Qdrant payload (`HashMap<String, qdrant::Value>`) into JSON.
///
/// Unsupported nested objects/arrays are mapped to `Null`.
fn qpayload_to_json(mut p: HashMap<String, QValue>) -> serde_json::Value {
    use qdrant_client::qdrant::value::Kind as K;
    let mut m = serde_json::Map::new();
    for (k, v) in p.drain() {
        let j = match v.kind {
            Some(K::StringValue(s)) => serde_json::Value::String(s),
            Some(K::IntegerValue(i)) => serde_json::Value::Number(i.into()),
            Some(K::DoubleValue(f)) => serde_json::json!(f),
            Some(K::BoolValue(b)) => serde_json::Value::Bool(b),
            _ => serde_json::Value::Null,
        };
        m.insert(k, j);
    }
    serde_json::Value::Object(m)
}

/// Maps a search hit onto a [`Chunk`]; `text` and `source` come from the payload.
fn hit_to_chunk(score: f32, payload: &serde_json::Value) -> Chunk {
    Chunk {
        text: payload
            .get("text")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        source: payload
            .get("source")
            .and_then(|v| v.as_str())
            .map(str::to_string),
        score,
    }
}

/// [`ChunkRetriever`] with one Qdrant collection per country
/// (`{collection_prefix}{country}`).
pub struct QdrantRetriever {
    facade: QdrantFacade,
    embedder: Arc<dyn EmbeddingsProvider>,
    collection_prefix: String,
    exact: bool,
}

impl QdrantRetriever {
    pub fn new(cfg: &RagConfig, embedder: Arc<dyn EmbeddingsProvider>) -> Result<Self, RagError> {
        Ok(Self {
            facade: QdrantFacade::new(cfg)?,
            embedder,
            collection_prefix: cfg.collection_prefix.clone(),
            exact: cfg.exact_search,
        })
    }

    fn collection_for(&self, country: &str) -> String {
        format!("{}{}", self.collection_prefix, country)
    }
}

impl ChunkRetriever for QdrantRetriever {
    fn top_chunks<'a>(
        &'a self,
        query: &'a str,
        country: &'a str,
        top_k: usize,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Chunk>, RagError>> + Send + 'a>> {
        Box::pin(async move {
            let country = normalize_country(country)?;
            trace!("QdrantRetriever::top_chunks country={country} top_k={top_k}");
            if top_k == 0 {
                return Ok(Vec::new());
            }

            let collection = self.collection_for(&country);
            if !self.facade.collection_exists(&collection).await? {
                return Err(RagError::UnknownCountry(country));
            }

            let qv = self.embedder.embed(query).await?;
            let hits = self
                .facade
                .search(&collection, qv, top_k as u64, self.exact)
                .await?;

            Ok(hits
                .iter()
                .map(|(score, payload)| hit_to_chunk(*score, payload))
                .collect())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payload_fields_map_to_chunk() {
        let c = hit_to_chunk(0.8, &json!({"text": "Tirana is the capital.", "source": "a.pdf", "page": 3}));
        assert_eq!(c.text, "Tirana is the capital.");
        assert_eq!(c.source.as_deref(), Some("a.pdf"));
        assert_eq!(c.score, 0.8);

        let empty = hit_to_chunk(0.1, &json!({}));
        assert_eq!(empty.text, "");
        assert!(empty.source.is_none());
    }

    #[test]
    fn payload_conversion_keeps_scalars() {
        let mut p = HashMap::new();
        p.insert("text".to_string(), QValue::from("hello"));
        p.insert("page".to_string(), QValue::from(3i64));
        let j = qpayload_to_json(p);
        assert_eq!(j["text"], "hello");
        assert_eq!(j["page"], 3);
    }
}
