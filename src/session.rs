//! One document, one conversation
//!
//! The session owns both pipelines and the message log, and hands the
//! document id from a finished upload to every later question.

use crate::api::{BackendClient, DocumentFile, IngestBackend, QueryBackend};
use crate::chat::{Message, MessageLog};
use crate::config::{Config, PipelineConfig};
use crate::error::Result;
use crate::pipeline::{DocumentHandle, IngestionOrchestrator, QueryOrchestrator, RunHandle};
use std::sync::Arc;

pub struct Session {
    ingestion: IngestionOrchestrator,
    query: QueryOrchestrator,
    log: MessageLog,
}

impl Session {
    pub fn new<B>(backend: Arc<B>, pipeline: &PipelineConfig) -> Self
    where
        B: IngestBackend + QueryBackend + 'static,
    {
        let log = MessageLog::new();
        Self {
            ingestion: IngestionOrchestrator::new(backend.clone(), pipeline.ingest_step()),
            query: QueryOrchestrator::new(backend, log.clone(), pipeline.query_step()),
            log,
        }
    }

    /// Session backed by the configured HTTP service
    pub fn connect(config: &Config) -> Result<Self> {
        let client = BackendClient::new(&config.backend)?;
        Ok(Self::new(Arc::new(client), &config.pipeline))
    }

    pub fn upload(&self, file: DocumentFile) -> Result<RunHandle<DocumentHandle>> {
        self.ingestion.start(file)
    }

    /// Ask about the most recently ingested document
    pub fn ask(&self, query_text: &str) -> Result<RunHandle<Message>> {
        let document = self.ingestion.document();
        self.query.start(query_text, document.as_ref())
    }

    pub fn document(&self) -> Option<DocumentHandle> {
        self.ingestion.document()
    }

    pub fn ingestion(&self) -> &IngestionOrchestrator {
        &self.ingestion
    }

    pub fn query(&self) -> &QueryOrchestrator {
        &self.query
    }

    pub fn log(&self) -> &MessageLog {
        &self.log
    }
}
