//! Terminal progress for pipeline runs, plus a log writer that keeps bars pinned.

use crate::pipeline::{PipelineRun, RunStatus};
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::{self, Write};
use std::sync::OnceLock;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing_subscriber::fmt::MakeWriter;

static MULTI_PROGRESS: OnceLock<MultiProgress> = OnceLock::new();

fn multi_progress() -> &'static MultiProgress {
    MULTI_PROGRESS.get_or_init(|| {
        let mp = MultiProgress::new();
        mp.set_draw_target(ProgressDrawTarget::stderr_with_hz(10));
        mp
    })
}

fn print_line(line: &str) {
    let _ = multi_progress().println(line.trim_end_matches('\r'));
}

/// Progress line shown for a run snapshot
pub fn describe(run: &PipelineRun) -> String {
    match run.status {
        RunStatus::Succeeded => format!("{} complete", capitalize(&run.kind.to_string())),
        RunStatus::Failed => format!("{} failed", capitalize(&run.kind.to_string())),
        RunStatus::Idle | RunStatus::Running => match run.active_stage() {
            Some(stage) if stage.details.is_empty() => {
                format!("{} · {}", stage.title, stage.subtitle)
            }
            Some(stage) => format!(
                "{} · {} ({})",
                stage.title,
                stage.subtitle,
                stage.details.join(", ")
            ),
            None => format!("Step {} of {}", run.current_step, run.step_count()),
        },
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn render(pb: &ProgressBar, run: &PipelineRun) {
    pb.set_position(run.current_step as u64);
    pb.set_message(describe(run));
}

/// Follow a pipeline's snapshots with a progress bar until the run settles
///
/// Subscribe after starting the run so the first snapshot is the live one.
pub fn track_pipeline(mut updates: watch::Receiver<PipelineRun>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut run = updates.borrow_and_update().clone();
        let pb = multi_progress().add(ProgressBar::new(run.step_count() as u64));
        pb.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:24.cyan/blue}] {pos}/{len} {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );
        pb.enable_steady_tick(Duration::from_millis(100));

        loop {
            render(&pb, &run);
            if run.status.is_terminal() {
                break;
            }
            if updates.changed().await.is_err() {
                break;
            }
            run = updates.borrow_and_update().clone();
        }

        match run.status {
            RunStatus::Succeeded => pb.finish_with_message(format!("✓ {}", describe(&run))),
            RunStatus::Failed => pb.abandon_with_message(format!("✗ {}", describe(&run))),
            _ => pb.finish_and_clear(),
        }
    })
}

#[derive(Default, Clone)]
pub struct LogWriterFactory;

/// Buffers tracing output and emits whole lines above the progress bars
pub struct LogWriter {
    buffer: String,
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.push_str(&String::from_utf8_lossy(buf));

        while let Some(idx) = self.buffer.find('\n') {
            print_line(&self.buffer[..idx]);
            self.buffer.drain(..=idx);
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.buffer.is_empty() {
            print_line(&self.buffer);
            self.buffer.clear();
        }
        Ok(())
    }
}

impl Drop for LogWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

impl<'a> MakeWriter<'a> for LogWriterFactory {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogWriter {
            buffer: String::new(),
        }
    }
}
