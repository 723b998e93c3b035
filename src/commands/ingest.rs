//! Ingest command implementation

use crate::api::DocumentFile;
use crate::error::Result;
use crate::pipeline::DocumentHandle;
use crate::progress::track_pipeline;
use crate::session::Session;
use std::path::Path;
use tracing::info;

/// Upload one PDF and wait for the backend to index it
pub async fn cmd_ingest(session: &Session, path: &Path, show_progress: bool) -> Result<DocumentHandle> {
    let file = DocumentFile::from_path(path)?;
    info!("Ingesting {}", path.display());

    let handle = session.upload(file)?;
    let tracker = show_progress.then(|| track_pipeline(session.ingestion().subscribe()));
    let outcome = handle.wait().await;
    if let Some(tracker) = tracker {
        let _ = tracker.await;
    }
    outcome
}

pub fn print_document(document: &DocumentHandle) {
    println!("\n✓ Document ingested");
    if let Some(name) = &document.file_name {
        println!("  File: {}", name);
    }
    println!("  Document ID: {}", document.document_id);
}
