//! Core data models used by the library.

use serde::{Deserialize, Serialize};

/// One line of a per-country index file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IndexRecord {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
}

/// A retrieved unit of text, ranked by `score` (higher is more relevant).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Chunk {
    pub text: String,
    pub source: Option<String>,
    pub score: f32,
}

impl Chunk {
    /// A chunk with only text, for callers that have no ranking metadata.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: None,
            score: 0.0,
        }
    }
}

impl AsRef<str> for Chunk {
    fn as_ref(&self) -> &str {
        &self.text
    }
}
