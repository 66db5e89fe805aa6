//! Country-scoped chunk retrieval for the chat pipeline.
//!
//! This crate provides:
//! - The [`ChunkRetriever`] seam and country key normalization
//! - A file-backed backend over `<store>/<country>.jsonl` indexes
//! - A Qdrant backend with one collection per country
//! - Query embeddings through the hosted feature-extraction API
//!
//! The design is flat (no deep nesting) and splits responsibilities into focused modules.

mod config;
pub mod discovery;
mod embed;
mod errors;
mod io_jsonl;
mod local_index;
mod qdrant_facade;
mod record;
mod retrieve;

pub use config::{RagConfig, RetrieverBackend};
pub use embed::EmbeddingsProvider;
pub use embed::hf::HfEmbedder;
pub use errors::RagError;
pub use local_index::{LocalIndex, LocalIndexRetriever};
pub use qdrant_facade::QdrantRetriever;
pub use record::{Chunk, IndexRecord};
pub use retrieve::{ChunkRetriever, build_retriever, normalize_country};
