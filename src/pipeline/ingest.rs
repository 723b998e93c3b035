use super::ticker::StepTicker;
use super::{begin_run, Settlement, PipelineKind, PipelineRun, RunHandle};
use crate::api::{DocumentFile, IngestBackend};
use crate::error::{Error, Result};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

/// Identifies an ingested document at the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentHandle {
    pub document_id: String,
    pub file_name: Option<String>,
}

impl DocumentHandle {
    /// Handle for a document ingested outside this process
    pub fn from_id(document_id: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            file_name: None,
        }
    }
}

/// Check that a file can be sent for ingestion
pub fn validate_document(file: &DocumentFile) -> Result<()> {
    if !file.is_pdf() {
        return Err(Error::validation(format!(
            "Unsupported file type '{}' for {}: only PDF documents can be ingested",
            file.content_type, file.name
        )));
    }
    if file.bytes.is_empty() {
        return Err(Error::validation(format!("{} is empty", file.name)));
    }
    Ok(())
}

/// Drives the upload pipeline and owns the current document handle
pub struct IngestionOrchestrator {
    backend: Arc<dyn IngestBackend>,
    run: Arc<watch::Sender<PipelineRun>>,
    document: Arc<watch::Sender<Option<DocumentHandle>>>,
    step_interval: Duration,
}

impl IngestionOrchestrator {
    pub fn new(backend: Arc<dyn IngestBackend>, step_interval: Duration) -> Self {
        let (run, _) = watch::channel(PipelineRun::idle(PipelineKind::Ingestion));
        let (document, _) = watch::channel(None);
        Self {
            backend,
            run: Arc::new(run),
            document: Arc::new(document),
            step_interval,
        }
    }

    pub fn snapshot(&self) -> PipelineRun {
        self.run.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PipelineRun> {
        self.run.subscribe()
    }

    /// Document from the most recent successful run, if any
    pub fn document(&self) -> Option<DocumentHandle> {
        self.document.borrow().clone()
    }

    pub fn subscribe_document(&self) -> watch::Receiver<Option<DocumentHandle>> {
        self.document.subscribe()
    }

    /// Start ingesting `file`
    ///
    /// Validation and the busy check happen before anything is spawned; a
    /// rejected call leaves the run untouched. Must be called from within a
    /// Tokio runtime.
    pub fn start(&self, file: DocumentFile) -> Result<RunHandle<DocumentHandle>> {
        validate_document(&file)?;
        let run_id = begin_run(&self.run)?;
        info!(run_id, file = %file.name, bytes = file.bytes.len(), "Ingestion started");

        let ticker = StepTicker::spawn(Arc::clone(&self.run), run_id, self.step_interval);
        let backend = Arc::clone(&self.backend);
        let settlement = Settlement::new(Arc::clone(&self.run), run_id);
        let document = Arc::clone(&self.document);

        let task = tokio::spawn(async move {
            let outcome = backend.ingest(&file).await;
            ticker.stop();
            settlement.settle(outcome.is_ok());

            match outcome {
                Ok(receipt) => {
                    let handle = DocumentHandle {
                        document_id: receipt.document_id,
                        file_name: Some(file.name),
                    };
                    document.send_replace(Some(handle.clone()));
                    info!(run_id, document_id = %handle.document_id, "Ingestion succeeded");
                    Ok(handle)
                }
                Err(e) => {
                    warn!(run_id, "Ingestion failed: {}", e);
                    Err(e)
                }
            }
        });

        Ok(RunHandle::new(run_id, task))
    }
}
