//! Context tags from operator-managed files in the private data directory.
//!
//! # Sources
//! - `context.json`: `{"tags": ["..."]}`, string entries of at most 30 bytes
//! - `context.csv`: first column of each line, trimmed, non-empty, at most
//!   30 bytes; only the first 200 lines are read, blank ones included
//!
//! Missing files are normal. Unreadable or malformed files are logged and
//! skipped so a bad drop-in never breaks page rendering.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::Path;

use serde_json::Value;

pub const CONTEXT_JSON: &str = "context.json";
pub const CONTEXT_CSV: &str = "context.csv";

/// Longest accepted tag, in bytes.
pub const MAX_TAG_BYTES: usize = 30;

/// Lines of `context.csv` considered.
pub const MAX_CSV_LINES: usize = 200;

/// Load, de-duplicate and sort tags from `data_dir`.
pub fn load_context_tags(data_dir: &Path) -> Vec<String> {
    let mut tags = BTreeSet::new();
    tags.extend(json_tags(&data_dir.join(CONTEXT_JSON)));
    tags.extend(csv_tags(&data_dir.join(CONTEXT_CSV)));
    tags.into_iter().collect()
}

fn json_tags(path: &Path) -> Vec<String> {
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Cannot read context file");
            return Vec::new();
        }
    };

    let data: Value = match serde_json::from_slice(&raw) {
        Ok(data) => data,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Ignoring malformed context file");
            return Vec::new();
        }
    };

    data.get("tags")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(Value::as_str)
                .filter(|t| t.len() <= MAX_TAG_BYTES)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn csv_tags(path: &Path) -> Vec<String> {
    if !path.is_file() {
        return Vec::new();
    }
    let mut reader = match csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
    {
        Ok(reader) => reader,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Cannot read context file");
            return Vec::new();
        }
    };

    // Blank lines produce no record, so the cap is on physical line numbers.
    let mut tags = Vec::new();
    for record in reader.records() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Stopping at malformed context line");
                break;
            }
        };
        if record.position().is_some_and(|p| p.line() > MAX_CSV_LINES as u64) {
            break;
        }
        let tag = record.get(0).unwrap_or_default().trim();
        if !tag.is_empty() && tag.len() <= MAX_TAG_BYTES {
            tags.push(tag.to_string());
        }
    }
    tags
}
