use super::{PipelineRun, Tick};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::debug;

/// Recurring task that advances one run's step counter
///
/// Aborted on stop or drop. A tick that races with settlement is rejected by
/// [`PipelineRun::tick`] under the channel lock.
pub(super) struct StepTicker {
    task: JoinHandle<()>,
}

impl StepTicker {
    pub(super) fn spawn(
        run: Arc<watch::Sender<PipelineRun>>,
        run_id: u64,
        period: Duration,
    ) -> Self {
        let task = tokio::spawn(async move {
            // First tick one period after start, not immediately
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                let mut outcome = Tick::Held;
                run.send_if_modified(|state| {
                    outcome = state.tick(run_id);
                    outcome == Tick::Advanced
                });
                if outcome == Tick::Superseded {
                    debug!(run_id, "Step timer superseded, stopping");
                    break;
                }
            }
        });
        Self { task }
    }

    pub(super) fn stop(self) {
        self.task.abort();
    }
}

impl Drop for StepTicker {
    fn drop(&mut self) {
        self.task.abort();
    }
}
