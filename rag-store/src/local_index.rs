//! File-backed vector index: one `<country>.jsonl` per country.
//!
//! Each file is loaded on first use, validated (every record embedded, one
//! dimension throughout) and kept in memory. Search is exhaustive cosine
//! similarity, which is fine for the few thousand chunks a country guide yields.

use std::{
    collections::HashMap,
    future::Future,
    path::{Path, PathBuf},
    pin::Pin,
    sync::Arc,
};

use tokio::sync::RwLock;
use tracing::{debug, info, trace};

use crate::discovery::country_index_path;
use crate::embed::EmbeddingsProvider;
use crate::errors::RagError;
use crate::io_jsonl::read_index_records;
use crate::record::{Chunk, IndexRecord};
use crate::retrieve::{ChunkRetriever, normalize_country};

#[derive(Debug)]
struct IndexedChunk {
    text: String,
    source: Option<String>,
    embedding: Vec<f32>,
    norm: f32,
}

/// An in-memory, read-only index for one country.
#[derive(Debug, Default)]
pub struct LocalIndex {
    dim: usize,
    chunks: Vec<IndexedChunk>,
}

impl LocalIndex {
    /// Builds an index from `(line, record)` pairs.
    ///
    /// # Errors
    /// - [`RagError::MissingEmbedding`] if a record has no embedding
    /// - [`RagError::VectorSizeMismatch`] if dimensions differ between records
    pub fn from_records(rows: Vec<(usize, IndexRecord)>) -> Result<Self, RagError> {
        let mut dim = 0usize;
        let mut chunks = Vec::with_capacity(rows.len());
        for (line, r) in rows {
            let embedding = match r.embedding {
                Some(e) if !e.is_empty() => e,
                _ => return Err(RagError::MissingEmbedding { line }),
            };
            if dim == 0 {
                dim = embedding.len();
            } else if embedding.len() != dim {
                return Err(RagError::VectorSizeMismatch {
                    got: embedding.len(),
                    want: dim,
                });
            }
            chunks.push(IndexedChunk {
                norm: l2_norm(&embedding),
                text: r.text,
                source: r.source,
                embedding,
            });
        }
        Ok(Self { dim, chunks })
    }

    /// Loads and validates `<path>`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RagError> {
        Self::from_records(read_index_records(path)?)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Vector dimension (`0` for an empty index).
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Top-`k` chunks by cosine similarity, best first; ties keep file order.
    ///
    /// # Errors
    /// Returns [`RagError::VectorSizeMismatch`] if `query` has the wrong dimension.
    pub fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<Chunk>, RagError> {
        if self.chunks.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dim {
            return Err(RagError::VectorSizeMismatch {
                got: query.len(),
                want: self.dim,
            });
        }

        let qn = l2_norm(query);
        let mut scored: Vec<(usize, f32)> = self
            .chunks
            .iter()
            .enumerate()
            .map(|(i, c)| (i, cosine(query, qn, &c.embedding, c.norm)))
            .collect();
        // Stable sort keeps file order among equal scores.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(i, score)| {
                let c = &self.chunks[i];
                Chunk {
                    text: c.text.clone(),
                    source: c.source.clone(),
                    score,
                }
            })
            .collect())
    }
}

fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

fn cosine(a: &[f32], an: f32, b: &[f32], bn: f32) -> f32 {
    if an == 0.0 || bn == 0.0 {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    dot / (an * bn)
}

/// [`ChunkRetriever`] over per-country index files.
///
/// Loaded indexes are cached by country; a missing file is not cached, so an
/// index added later is picked up on the next request.
pub struct LocalIndexRetriever {
    store_path: PathBuf,
    embedder: Arc<dyn EmbeddingsProvider>,
    cache: RwLock<HashMap<String, Arc<LocalIndex>>>,
}

impl LocalIndexRetriever {
    pub fn new(store_path: impl Into<PathBuf>, embedder: Arc<dyn EmbeddingsProvider>) -> Self {
        Self {
            store_path: store_path.into(),
            embedder,
            cache: RwLock::new(HashMap::new()),
        }
    }

    async fn index_for(&self, country: &str) -> Result<Arc<LocalIndex>, RagError> {
        if let Some(idx) = self.cache.read().await.get(country).cloned() {
            return Ok(idx);
        }

        let path = country_index_path(&self.store_path, country);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(RagError::UnknownCountry(country.to_string()));
        }

        let load_path = path.clone();
        let index = tokio::task::spawn_blocking(move || LocalIndex::load(load_path))
            .await
            .map_err(|e| RagError::Task(e.to_string()))??;
        info!(
            country = %country,
            path = ?path,
            chunks = index.len(),
            dim = index.dim(),
            "local index loaded"
        );

        let mut w = self.cache.write().await;
        Ok(w.entry(country.to_string())
            .or_insert_with(|| Arc::new(index))
            .clone())
    }
}

impl ChunkRetriever for LocalIndexRetriever {
    fn top_chunks<'a>(
        &'a self,
        query: &'a str,
        country: &'a str,
        top_k: usize,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Chunk>, RagError>> + Send + 'a>> {
        Box::pin(async move {
            let country = normalize_country(country)?;
            trace!("LocalIndexRetriever::top_chunks country={country} top_k={top_k}");
            if top_k == 0 {
                return Ok(Vec::new());
            }

            let index = self.index_for(&country).await?;
            if index.is_empty() {
                debug!(country = %country, "index is empty, skipping query embedding");
                return Ok(Vec::new());
            }

            let qv = self.embedder.embed(query).await?;
            let hits = index.search(&qv, top_k)?;
            debug!(country = %country, hits = hits.len(), "local search completed");
            Ok(hits)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Embeds by keyword so tests control the ranking.
    #[derive(Default)]
    struct KeywordEmbedder {
        calls: AtomicUsize,
    }

    impl EmbeddingsProvider for KeywordEmbedder {
        fn embed<'a>(
            &'a self,
            text: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, RagError>> + Send + 'a>> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                let t = text.to_lowercase();
                Ok(vec![
                    if t.contains("capital") { 1.0 } else { 0.0 },
                    if t.contains("food") { 1.0 } else { 0.0 },
                ])
            })
        }
    }

    fn write_index(dir: &Path, country: &str, lines: &[&str]) {
        let mut f = std::fs::File::create(dir.join(format!("{country}.jsonl"))).unwrap();
        for l in lines {
            writeln!(f, "{l}").unwrap();
        }
    }

    fn rec(line: usize, text: &str, embedding: Option<Vec<f32>>) -> (usize, IndexRecord) {
        (
            line,
            IndexRecord {
                id: format!("id-{line}"),
                text: text.into(),
                source: None,
                embedding,
            },
        )
    }

    #[test]
    fn search_ranks_by_cosine_and_keeps_file_order_on_ties() {
        let idx = LocalIndex::from_records(vec![
            rec(1, "food a", Some(vec![0.0, 1.0])),
            rec(2, "capital a", Some(vec![2.0, 0.0])),
            rec(3, "capital b", Some(vec![1.0, 0.0])),
            rec(4, "mixed", Some(vec![1.0, 1.0])),
        ])
        .unwrap();

        let hits = idx.search(&[1.0, 0.0], 3).unwrap();
        let texts: Vec<_> = hits.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, ["capital a", "capital b", "mixed"]);
        assert!(hits[0].score >= hits[2].score);
    }

    #[test]
    fn invalid_records_are_rejected() {
        assert!(matches!(
            LocalIndex::from_records(vec![rec(7, "x", None)]),
            Err(RagError::MissingEmbedding { line: 7 })
        ));
        assert!(matches!(
            LocalIndex::from_records(vec![
                rec(1, "a", Some(vec![1.0, 0.0])),
                rec(2, "b", Some(vec![1.0])),
            ]),
            Err(RagError::VectorSizeMismatch { got: 1, want: 2 })
        ));
        let idx = LocalIndex::from_records(vec![rec(1, "a", Some(vec![1.0, 0.0]))]).unwrap();
        assert!(matches!(
            idx.search(&[1.0, 0.0, 0.0], 1),
            Err(RagError::VectorSizeMismatch { got: 3, want: 2 })
        ));
    }

    #[tokio::test]
    async fn retriever_returns_top_k_for_country() {
        let dir = tempfile::tempdir().unwrap();
        write_index(
            dir.path(),
            "albania",
            &[
                r#"{"id":"1","text":"Albanian food is rich.","embedding":[0.0,1.0]}"#,
                r#"{"id":"2","text":"Tirana is the capital.","source":"albania.pdf","embedding":[1.0,0.1]}"#,
                r#"{"id":"3","text":"Durres is a port.","embedding":[0.3,0.3]}"#,
            ],
        );
        let embedder = Arc::new(KeywordEmbedder::default());
        let r = LocalIndexRetriever::new(dir.path(), embedder.clone());

        let hits = r.top_chunks("What is the capital?", "Albania", 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].text, "Tirana is the capital.");
        assert_eq!(hits[0].source.as_deref(), Some("albania.pdf"));

        // Second call hits the cache; the index file can disappear.
        std::fs::remove_file(dir.path().join("albania.jsonl")).unwrap();
        let again = r.top_chunks("capital", "albania", 1).await.unwrap();
        assert_eq!(again[0].text, "Tirana is the capital.");
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unknown_or_invalid_country_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let r = LocalIndexRetriever::new(dir.path(), Arc::new(KeywordEmbedder::default()));

        assert!(matches!(
            r.top_chunks("q", "atlantis", 5).await,
            Err(RagError::UnknownCountry(c)) if c == "atlantis"
        ));
        assert!(matches!(
            r.top_chunks("q", "../secrets", 5).await,
            Err(RagError::UnknownCountry(_))
        ));
    }

    #[tokio::test]
    async fn empty_index_and_zero_k_skip_embedding() {
        let dir = tempfile::tempdir().unwrap();
        write_index(dir.path(), "kosovo", &[]);
        let embedder = Arc::new(KeywordEmbedder::default());
        let r = LocalIndexRetriever::new(dir.path(), embedder.clone());

        assert!(r.top_chunks("q", "kosovo", 5).await.unwrap().is_empty());
        assert!(r.top_chunks("q", "kosovo", 0).await.unwrap().is_empty());
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }
}
