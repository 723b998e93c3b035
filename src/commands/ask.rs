//! One-shot question against an already ingested document

use crate::api::BackendClient;
use crate::chat::{Message, MessageLog};
use crate::config::Config;
use crate::error::Result;
use crate::pipeline::{DocumentHandle, QueryOrchestrator, RunStatus};
use crate::progress::track_pipeline;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
pub struct AskOutcome {
    pub document_id: String,
    pub status: RunStatus,
    pub messages: Vec<Message>,
}

impl AskOutcome {
    pub fn succeeded(&self) -> bool {
        self.status == RunStatus::Succeeded
    }

    pub fn reply(&self) -> Option<&Message> {
        self.messages.last()
    }
}

pub async fn cmd_ask(
    config: &Config,
    document_id: &str,
    query: &str,
    show_progress: bool,
) -> Result<AskOutcome> {
    let client = BackendClient::new(&config.backend)?;
    let orchestrator =
        QueryOrchestrator::new(Arc::new(client), MessageLog::new(), config.pipeline.query_step());
    let document = DocumentHandle::from_id(document_id);

    let handle = orchestrator.start(query, Some(&document))?;
    let tracker = show_progress.then(|| track_pipeline(orchestrator.subscribe()));
    handle.wait().await?;
    if let Some(tracker) = tracker {
        let _ = tracker.await;
    }

    Ok(AskOutcome {
        document_id: document.document_id,
        status: orchestrator.snapshot().status,
        messages: orchestrator.log().all(),
    })
}
