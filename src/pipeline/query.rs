use super::ticker::StepTicker;
use super::{begin_run, Settlement, DocumentHandle, PipelineKind, PipelineRun, RunHandle};
use crate::api::QueryBackend;
use crate::chat::{Message, MessageBody, MessageLog, Role};
use crate::cite::rewrite;
use crate::error::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

/// Drives the question-answering pipeline and feeds the message log
pub struct QueryOrchestrator {
    backend: Arc<dyn QueryBackend>,
    run: Arc<watch::Sender<PipelineRun>>,
    log: MessageLog,
    step_interval: Duration,
}

impl QueryOrchestrator {
    pub fn new(backend: Arc<dyn QueryBackend>, log: MessageLog, step_interval: Duration) -> Self {
        let (run, _) = watch::channel(PipelineRun::idle(PipelineKind::Query));
        Self {
            backend,
            run: Arc::new(run),
            log,
            step_interval,
        }
    }

    pub fn snapshot(&self) -> PipelineRun {
        self.run.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PipelineRun> {
        self.run.subscribe()
    }

    pub fn log(&self) -> &MessageLog {
        &self.log
    }

    /// Submit a question about `document`
    ///
    /// The user message is in the log by the time this returns. Rejections
    /// (blank query, no document, a query already running) change nothing.
    /// Backend failures are not errors here: they arrive as an assistant
    /// message starting with `Error: `.
    pub fn start(
        &self,
        query_text: &str,
        document: Option<&DocumentHandle>,
    ) -> Result<RunHandle<Message>> {
        if query_text.trim().is_empty() {
            return Err(Error::validation("Query is empty"));
        }
        let document = document
            .ok_or_else(|| Error::validation("No document has been ingested yet"))?;
        let run_id = begin_run(&self.run)?;

        self.log.append(Role::User, MessageBody::text(query_text));
        info!(run_id, document_id = %document.document_id, "Query started");

        let ticker = StepTicker::spawn(Arc::clone(&self.run), run_id, self.step_interval);
        let backend = Arc::clone(&self.backend);
        let settlement = Settlement::new(Arc::clone(&self.run), run_id);
        let log = self.log.clone();
        let query = query_text.to_string();
        let document_id = document.document_id.clone();

        let task = tokio::spawn(async move {
            let outcome = backend.query(&query, &document_id).await;
            ticker.stop();
            settlement.settle(outcome.is_ok());

            let body = match outcome {
                Ok(answer) => {
                    info!(run_id, citations = answer.citations.len(), "Query answered");
                    MessageBody::Blocks(rewrite(&answer.answer, &answer.citations))
                }
                Err(e) => {
                    warn!(run_id, "Query failed: {}", e);
                    MessageBody::Text(format!("Error: {}", e))
                }
            };
            Ok(log.append(Role::Assistant, body))
        });

        Ok(RunHandle::new(run_id, task))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Answer;
    use crate::cite::Citation;
    use crate::error::ErrorClass;
    use crate::pipeline::testing::ScriptedBackend;
    use crate::pipeline::RunStatus;
    use std::sync::atomic::Ordering;
    use tokio::time::sleep;

    const STEP: Duration = Duration::from_millis(2000);

    async fn until_tick(n: u32) {
        sleep(STEP * n + STEP / 4).await;
    }

    fn setup() -> (Arc<ScriptedBackend>, QueryOrchestrator, DocumentHandle) {
        let backend = ScriptedBackend::new();
        let query = QueryOrchestrator::new(backend.clone(), MessageLog::new(), STEP);
        (backend, query, DocumentHandle::from_id("doc-9"))
    }

    fn answer(text: &str, citations: Vec<Citation>) -> Result<Answer> {
        Ok(Answer {
            answer: text.to_string(),
            citations,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_user_message_logged_before_reply() {
        let (backend, query, document) = setup();
        let reply = backend.next_query();

        let handle = query.start("What changed?", Some(&document)).unwrap();
        let log = query.log().all();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].role, Role::User);
        assert_eq!(log[0].body, MessageBody::text("What changed?"));

        until_tick(1).await;
        assert_eq!(query.snapshot().current_step, 1);
        assert_eq!(query.log().len(), 1);

        reply
            .send(answer(
                "See [10] and [1, 2] for details.",
                vec![
                    Citation { citation_id: 10, page: 8 },
                    Citation { citation_id: 1, page: 7 },
                    Citation { citation_id: 2, page: 7 },
                ],
            ))
            .unwrap();
        let message = handle.wait().await.unwrap();

        assert_eq!(message.role, Role::Assistant);
        assert_eq!(
            message.body.plain_text(),
            "See  [Page 8] and  [Page 7] for details."
        );
        let log = query.log().all();
        assert_eq!(log.len(), 2);
        assert!(log[0].id < log[1].id);
        assert_eq!(log[1], message);

        let run = query.snapshot();
        assert_eq!(run.status, RunStatus::Succeeded);
        assert_eq!(run.current_step, 5);
        assert_eq!(
            backend.last_document_id.lock().unwrap().as_deref(),
            Some("doc-9")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_steps_wrap_while_waiting() {
        let (backend, query, document) = setup();
        let reply = backend.next_query();

        let handle = query.start("slow one", Some(&document)).unwrap();
        until_tick(5).await;
        assert_eq!(query.snapshot().current_step, 5);
        // The sixth tick wraps back to the first stage
        sleep(STEP).await;
        assert_eq!(query.snapshot().current_step, 0);
        sleep(STEP).await;
        assert_eq!(query.snapshot().current_step, 1);

        reply.send(answer("done", Vec::new())).unwrap();
        handle.wait().await.unwrap();
        assert_eq!(query.snapshot().current_step, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_is_reported_in_band() {
        let (backend, query, document) = setup();
        backend
            .next_query()
            .send(Err(Error::Service {
                status: 500,
                code: None,
                message: "Server Error: 500".to_string(),
            }))
            .unwrap();

        let message = query.start("q", Some(&document)).unwrap().wait().await.unwrap();
        assert_eq!(message.role, Role::Assistant);
        assert_eq!(message.body, MessageBody::text("Error: Server Error: 500"));

        let run = query.snapshot();
        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(run.current_step, 5);
        assert_eq!(query.log().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_submission_is_noop_while_running() {
        let (backend, query, document) = setup();
        let reply = backend.next_query();

        let handle = query.start("first", Some(&document)).unwrap();
        until_tick(1).await;
        let before = query.snapshot();

        let err = query.start("second", Some(&document)).unwrap_err();
        assert_eq!(err.class(), ErrorClass::Validation);
        assert_eq!(query.log().len(), 1);
        assert_eq!(query.snapshot(), before);

        reply.send(answer("ok", Vec::new())).unwrap();
        handle.wait().await.unwrap();
        assert_eq!(backend.query_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_preconditions_reject_without_logging() {
        let (backend, query, document) = setup();

        assert!(query.start("   \n", Some(&document)).is_err());
        assert!(query.start("", Some(&document)).is_err());
        let err = query.start("real question", None).unwrap_err();
        assert_eq!(err.to_string(), "No document has been ingested yet");

        assert!(query.log().is_empty());
        assert_eq!(query.snapshot(), PipelineRun::idle(PipelineKind::Query));
        assert_eq!(backend.query_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_each_submission_is_a_new_run() {
        let (backend, query, document) = setup();
        backend.next_query().send(answer("one", Vec::new())).unwrap();
        backend
            .next_query()
            .send(answer("**two**\n\nthree", Vec::new()))
            .unwrap();

        let first = query.start("a", Some(&document)).unwrap();
        assert_eq!(first.run_id(), 1);
        first.wait().await.unwrap();

        let second = query.start("b", Some(&document)).unwrap();
        assert_eq!(second.run_id(), 2);
        let reply = second.wait().await.unwrap();

        match reply.body {
            MessageBody::Blocks(blocks) => assert_eq!(blocks.len(), 2),
            other => panic!("expected rewritten blocks, got {:?}", other),
        }
        let roles: Vec<Role> = query.log().all().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::User, Role::Assistant, Role::User, Role::Assistant]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_backend_does_not_leave_pipeline_busy() {
        let (backend, query, document) = setup();
        backend.panics.store(true, Ordering::SeqCst);

        let handle = query.start("Anything?", Some(&document)).unwrap();
        assert!(handle.wait().await.is_err());

        let run = query.snapshot();
        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(run.current_step, run.step_count());

        backend.panics.store(false, Ordering::SeqCst);
        let reply = backend.next_query();
        let handle = query.start("Again?", Some(&document)).unwrap();
        reply.send(answer("Fine.", vec![])).unwrap();
        let message = handle.wait().await.unwrap();
        assert_eq!(message.body.plain_text(), "Fine.");
    }
}
