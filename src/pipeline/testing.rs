//! Scripted backend for exercising the orchestrators without a network

use crate::api::{Answer, DocumentFile, IngestBackend, IngestReceipt, QueryBackend};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

type Reply<T> = oneshot::Receiver<Result<T>>;

/// Backend whose calls resolve only when the test says so
#[derive(Default)]
pub(crate) struct ScriptedBackend {
    ingests: Mutex<VecDeque<Reply<IngestReceipt>>>,
    queries: Mutex<VecDeque<Reply<Answer>>>,
    pub(crate) ingest_calls: AtomicUsize,
    pub(crate) query_calls: AtomicUsize,
    pub(crate) last_document_id: Mutex<Option<String>>,
    /// Make every call panic instead of waiting for a reply
    pub(crate) panics: AtomicBool,
}

impl ScriptedBackend {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue the reply for the next ingest call
    pub(crate) fn next_ingest(&self) -> oneshot::Sender<Result<IngestReceipt>> {
        let (tx, rx) = oneshot::channel();
        self.ingests.lock().unwrap().push_back(rx);
        tx
    }

    /// Queue the reply for the next query call
    pub(crate) fn next_query(&self) -> oneshot::Sender<Result<Answer>> {
        let (tx, rx) = oneshot::channel();
        self.queries.lock().unwrap().push_back(rx);
        tx
    }
}

async fn await_reply<T>(reply: Option<Reply<T>>) -> Result<T> {
    let reply = reply.ok_or_else(|| Error::Other("unscripted backend call".to_string()))?;
    reply
        .await
        .unwrap_or_else(|_| Err(Error::Other("scripted reply dropped".to_string())))
}

#[async_trait]
impl IngestBackend for ScriptedBackend {
    async fn ingest(&self, _file: &DocumentFile) -> Result<IngestReceipt> {
        self.ingest_calls.fetch_add(1, Ordering::SeqCst);
        if self.panics.load(Ordering::SeqCst) {
            panic!("scripted ingest panic");
        }
        let reply = self.ingests.lock().unwrap().pop_front();
        await_reply(reply).await
    }
}

#[async_trait]
impl QueryBackend for ScriptedBackend {
    async fn query(&self, _query: &str, document_id: &str) -> Result<Answer> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        if self.panics.load(Ordering::SeqCst) {
            panic!("scripted query panic");
        }
        *self.last_document_id.lock().unwrap() = Some(document_id.to_string());
        let reply = self.queries.lock().unwrap().pop_front();
        await_reply(reply).await
    }
}

pub(crate) fn pdf(name: &str) -> DocumentFile {
    DocumentFile::new(name, "application/pdf", b"%PDF-1.5\n".to_vec())
}

pub(crate) fn receipt(document_id: &str) -> Result<IngestReceipt> {
    Ok(IngestReceipt {
        document_id: document_id.to_string(),
    })
}
