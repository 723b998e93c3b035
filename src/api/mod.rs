//! Remote document service interface
//!
//! The ingestion and query pipelines only see these traits; the HTTP client in
//! [`http`] is the production implementation.

mod http;

pub use http::*;

use crate::cite::Citation;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::path::Path;
use tracing::debug;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// A file selected for ingestion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl DocumentFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Read a file from disk, guessing its content type from the extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| Error::validation(format!("Not a file: {}", path.display())))?;
        let content_type = mime_guess::from_path(path)
            .first_raw()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = std::fs::read(path)?;
        Ok(Self::new(name, content_type, bytes))
    }

    pub fn is_pdf(&self) -> bool {
        self.content_type.eq_ignore_ascii_case(PDF_CONTENT_TYPE)
    }
}

/// Successful ingestion result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReceipt {
    pub document_id: String,
}

/// Successful query result, before citation rewriting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    #[serde(alias = "response")]
    pub answer: String,
    #[serde(default, deserialize_with = "citation_table")]
    pub citations: Vec<Citation>,
}

/// Citation table of an answer; `null` or a non-array is empty and malformed
/// entries are skipped
fn citation_table<'de, D>(deserializer: D) -> std::result::Result<Vec<Citation>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(entries)) => entries,
        _ => return Ok(Vec::new()),
    };
    let citations: Vec<Citation> = entries.iter().filter_map(Citation::from_value).collect();
    if citations.len() < entries.len() {
        debug!(
            skipped = entries.len() - citations.len(),
            "Ignoring malformed citation entries"
        );
    }
    Ok(citations)
}

/// Document upload side of the backend
#[async_trait]
pub trait IngestBackend: Send + Sync {
    async fn ingest(&self, file: &DocumentFile) -> Result<IngestReceipt>;
}

/// Question answering side of the backend
#[async_trait]
pub trait QueryBackend: Send + Sync {
    async fn query(&self, query: &str, document_id: &str) -> Result<Answer>;
}
