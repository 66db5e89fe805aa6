//! Discovery utilities for the local store layout (`<store>/<country>.jsonl`).

use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, trace};

/// Canonical path to a country's index file.
pub fn country_index_path(store: impl AsRef<Path>, country: &str) -> PathBuf {
    store.as_ref().join(format!("{country}.jsonl"))
}

/// Lists countries that have an index file, sorted by name.
///
/// A missing store directory yields an empty list.
pub fn available_countries(store: impl AsRef<Path>) -> Result<Vec<String>, std::io::Error> {
    let p = store.as_ref();
    trace!("discovery::available_countries store={:?}", p);
    let mut out = Vec::new();
    if p.exists() {
        for entry in fs::read_dir(p)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("jsonl") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                out.push(stem.to_string());
            }
        }
    }
    out.sort();
    debug!("discovery::available_countries -> {:?}", out);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_jsonl_stems_only() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("kosovo.jsonl"), "").unwrap();
        fs::write(dir.path().join("albania.jsonl"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        assert_eq!(available_countries(dir.path()).unwrap(), ["albania", "kosovo"]);
        assert!(available_countries(dir.path().join("missing")).unwrap().is_empty());
        assert_eq!(
            country_index_path("/data", "albania"),
            PathBuf::from("/data/albania.jsonl")
        );
    }
}
