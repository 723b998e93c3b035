//! Simulated pipeline progress
//!
//! Each workflow owns one [`PipelineRun`]. While the remote call is in flight a
//! step timer animates the run through its stages; when the call settles the
//! run is forced to its terminal step. Both tasks carry the run id they were
//! started for, so a tick that fires after settlement, or after a newer run
//! began, changes nothing.
//!
//! State is published on a `tokio::sync::watch` channel. Presentation code
//! only ever sees snapshots.

mod ingest;
mod query;
mod ticker;

pub use ingest::*;
pub use query::*;

use crate::error::{Error, Result};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::warn;

/// Display labels for one pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stage {
    pub title: &'static str,
    pub subtitle: &'static str,
    pub details: &'static [&'static str],
}

pub const INGESTION_STAGES: [Stage; 4] = [
    Stage {
        title: "Extract Text/Tables",
        subtitle: "Parsing PDF content",
        details: &[],
    },
    Stage {
        title: "Semantic Chunking",
        subtitle: "Splitting into chunks",
        details: &[],
    },
    Stage {
        title: "Generate Embeddings",
        subtitle: "Using MPNet model",
        details: &[],
    },
    Stage {
        title: "Store in Vector DB",
        subtitle: "FAISS/Qdrant",
        details: &[],
    },
];

pub const QUERY_STAGES: [Stage; 5] = [
    Stage {
        title: "Query Analysis",
        subtitle: "LLM complexity check",
        details: &["Analyze query type", "Determine complexity"],
    },
    Stage {
        title: "Query Embedding",
        subtitle: "Generate vector representation",
        details: &["Convert to embedding"],
    },
    Stage {
        title: "Hybrid Search",
        subtitle: "BM25 + Dense search",
        details: &["BM25: Top 50", "Dense: Top 50"],
    },
    Stage {
        title: "Hybrid Fusion",
        subtitle: "Combine search results",
        details: &["Merge results: Top 50"],
    },
    Stage {
        title: "Re-Ranking",
        subtitle: "Cross-encoder scoring",
        details: &["ms-marco-miniLM", "Final: Top 10"],
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineKind {
    Ingestion,
    Query,
}

impl PipelineKind {
    pub fn stages(self) -> &'static [Stage] {
        match self {
            PipelineKind::Ingestion => &INGESTION_STAGES,
            PipelineKind::Query => &QUERY_STAGES,
        }
    }

    pub fn step_count(self) -> usize {
        self.stages().len()
    }

    /// Highest step the timer may reach on its own, if capped
    pub fn cycling_ceiling(self) -> Option<usize> {
        match self {
            PipelineKind::Ingestion => Some(self.step_count() - 1),
            PipelineKind::Query => None,
        }
    }

    fn next_step(self, step: usize) -> usize {
        match self.cycling_ceiling() {
            Some(ceiling) => (step + 1).min(ceiling),
            None if step >= self.step_count() => 0,
            None => step + 1,
        }
    }

    fn failure_step(self) -> usize {
        match self {
            PipelineKind::Ingestion => 0,
            PipelineKind::Query => self.step_count(),
        }
    }
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineKind::Ingestion => f.write_str("ingestion"),
            PipelineKind::Query => f.write_str("query"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Idle,
    Running,
    Succeeded,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Succeeded | RunStatus::Failed)
    }
}

/// Outcome of one timer tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Tick {
    Advanced,
    Held,
    Superseded,
}

/// State of a workflow's current (or most recent) run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineRun {
    pub kind: PipelineKind,
    /// Generation token, bumped on every start; 0 before the first run
    pub run_id: u64,
    pub current_step: usize,
    pub status: RunStatus,
}

impl PipelineRun {
    pub fn idle(kind: PipelineKind) -> Self {
        Self {
            kind,
            run_id: 0,
            current_step: 0,
            status: RunStatus::Idle,
        }
    }

    pub fn step_count(&self) -> usize {
        self.kind.step_count()
    }

    pub fn is_running(&self) -> bool {
        self.status == RunStatus::Running
    }

    /// Stage currently shown as active, `None` once every stage is complete
    pub fn active_stage(&self) -> Option<&'static Stage> {
        self.kind.stages().get(self.current_step)
    }

    pub(crate) fn begin(&mut self) -> Option<u64> {
        if self.is_running() {
            return None;
        }
        self.run_id += 1;
        self.current_step = 0;
        self.status = RunStatus::Running;
        Some(self.run_id)
    }

    pub(crate) fn tick(&mut self, run_id: u64) -> Tick {
        if run_id != self.run_id || !self.is_running() {
            return Tick::Superseded;
        }
        let next = self.kind.next_step(self.current_step);
        if next == self.current_step {
            return Tick::Held;
        }
        self.current_step = next;
        Tick::Advanced
    }

    pub(crate) fn settle(&mut self, run_id: u64, succeeded: bool) -> bool {
        if run_id != self.run_id || !self.is_running() {
            return false;
        }
        if succeeded {
            self.current_step = self.step_count();
            self.status = RunStatus::Succeeded;
        } else {
            self.current_step = self.kind.failure_step();
            self.status = RunStatus::Failed;
        }
        true
    }
}

fn begin_run(run: &watch::Sender<PipelineRun>) -> Result<u64> {
    let mut started = None;
    run.send_if_modified(|state| {
        started = state.begin();
        started.is_some()
    });
    started.ok_or_else(|| {
        let kind = run.borrow().kind;
        Error::validation(format!("The {} pipeline is already running", kind))
    })
}

fn settle_run(run: &watch::Sender<PipelineRun>, run_id: u64, succeeded: bool) {
    run.send_if_modified(|state| state.settle(run_id, succeeded));
}

/// Settlement owed by a completion task
///
/// Dropping it unsettled, as happens when the remote call panics or the task
/// is aborted, settles the run as failed so the pipeline does not stay busy.
struct Settlement {
    run: Arc<watch::Sender<PipelineRun>>,
    run_id: u64,
    pending: bool,
}

impl Settlement {
    fn new(run: Arc<watch::Sender<PipelineRun>>, run_id: u64) -> Self {
        Self {
            run,
            run_id,
            pending: true,
        }
    }

    fn settle(mut self, succeeded: bool) {
        self.pending = false;
        settle_run(&self.run, self.run_id, succeeded);
    }
}

impl Drop for Settlement {
    fn drop(&mut self) {
        if self.pending {
            warn!(run_id = self.run_id, "Run ended without settling, marking it failed");
            settle_run(&self.run, self.run_id, false);
        }
    }
}

/// Handle to a started run's completion task
#[derive(Debug)]
pub struct RunHandle<T> {
    run_id: u64,
    task: JoinHandle<Result<T>>,
}

impl<T> RunHandle<T> {
    fn new(run_id: u64, task: JoinHandle<Result<T>>) -> Self {
        Self { run_id, task }
    }

    pub fn run_id(&self) -> u64 {
        self.run_id
    }

    /// Wait for the remote call to settle and its result to be delivered
    pub async fn wait(self) -> Result<T> {
        self.task
            .await
            .map_err(|e| Error::Other(format!("Pipeline task failed: {}", e)))?
    }
}

#[cfg(test)]
pub(crate) mod testing;
