//! Strict JSONL reader for per-country index files.

use std::io::{BufRead, BufReader};
use std::{fs::File, path::Path};

use tracing::{debug, info};

use crate::errors::RagError;
use crate::record::IndexRecord;

/// Reads index records strictly, keeping their 1-based line numbers.
///
/// - Expects at least `id` and `text` on every row.
/// - Ignores empty lines.
///
/// # Errors
/// - [`RagError::Io`] if the file cannot be read.
/// - [`RagError::Parse`] if any line fails strict deserialization.
pub fn read_index_records(jsonl_path: impl AsRef<Path>) -> Result<Vec<(usize, IndexRecord)>, RagError> {
    info!("Reading index JSONL: {:?}", jsonl_path.as_ref());

    let file = File::open(jsonl_path.as_ref())?;
    let reader = BufReader::new(file);

    let mut out = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let r: IndexRecord = serde_json::from_str(&line)
            .map_err(|e| RagError::Parse(format!("line {} parse error: {}", i + 1, e)))?;
        out.push((i + 1, r));
    }

    debug!("Loaded {} index records", out.len());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn skips_blank_lines_and_reports_bad_line() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, r#"{{"id":"a","text":"one","embedding":[1.0]}}"#).unwrap();
        writeln!(f).unwrap();
        writeln!(f, r#"{{"id":"b","text":"two","source":"p.pdf"}}"#).unwrap();
        let rows = read_index_records(f.path()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].0, 3);
        assert_eq!(rows[1].1.source.as_deref(), Some("p.pdf"));
        assert!(rows[1].1.embedding.is_none());

        writeln!(f, "not json").unwrap();
        match read_index_records(f.path()) {
            Err(RagError::Parse(msg)) => assert!(msg.starts_with("line 4")),
            other => panic!("expected parse error, got {other:?}"),
        }
    }
}
