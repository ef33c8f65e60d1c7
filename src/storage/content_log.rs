//! Append-only JSON Lines content log.
//!
//! One record per successfully processed page. Records are never rewritten;
//! downstream consumers read the file line by line.

use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::storage::StorageError;

const MAX_TEXT_CHARS: usize = 10_000;
const MAX_HTML_CHARS: usize = 100_000;

/// A single content-log record, matching §4.10's field set.
#[derive(Debug, Clone, Serialize)]
pub struct ContentRecord {
    pub url: String,
    pub crawled_at: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub text: String,
    pub link_count: usize,
    pub depth: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
}

impl ContentRecord {
    /// Truncates `text` and, if present, `html` to the field limits before
    /// the record is written.
    pub fn new(
        url: String,
        crawled_at: String,
        title: Option<String>,
        description: Option<String>,
        text: String,
        link_count: usize,
        depth: u32,
        html: Option<String>,
    ) -> Self {
        let text = truncate_chars(&text, MAX_TEXT_CHARS);
        let html = html.map(|h| truncate_chars(&h, MAX_HTML_CHARS));
        Self {
            url,
            crawled_at,
            title,
            description,
            text,
            link_count,
            depth,
            html,
        }
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

/// Append-only JSONL writer for one session's content log.
pub struct ContentLog {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl ContentLog {
    /// Opens `{output_dir}/content_{session_id}.jsonl` for appending,
    /// creating the output directory if needed.
    pub fn open(output_dir: &Path, session_id: i64) -> Result<Self, StorageError> {
        std::fs::create_dir_all(output_dir)?;
        let path = output_dir.join(format!("content_{}.jsonl", session_id));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    /// Appends one record as a single JSON line.
    pub fn append(&self, record: &ContentRecord) -> Result<(), StorageError> {
        let mut writer = self
            .writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        serde_json::to_writer(&mut *writer, record)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
