//! `ConsoleSubscriber` (§2 item 9 consumer): renders `AgentEvent`s as they
//! arrive on the `EventBus`, one spinner per agent. Adapted from
//! `presentation/src/progress/reporter.rs`'s `ProgressReporter` — per-task
//! `MultiProgress` bars keyed by name, finished with a colored check/cross
//! — generalized from the donor's fixed three-phase model to one bar per
//! agent for the whole coordination run. The donor's full TUI
//! (`ratatui`/`crossterm`) is out of scope (§1); this is the "console
//! subscriber" named there.

use colored::Colorize;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use massgen_domain::{AgentErrorKind, AgentEvent, AgentId};
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::broadcast;

pub struct ConsoleSubscriber {
    multi: MultiProgress,
    bars: Mutex<HashMap<AgentId, ProgressBar>>,
}

impl ConsoleSubscriber {
    pub fn new() -> Self {
        Self { multi: MultiProgress::new(), bars: Mutex::new(HashMap::new()) }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner().template("{spinner:.green} {prefix:.bold.cyan} {msg}").unwrap()
    }

    fn bar_for(&self, agent_id: &AgentId) -> ProgressBar {
        let mut bars = self.bars.lock().unwrap();
        bars.entry(agent_id.clone())
            .or_insert_with(|| {
                let pb = self.multi.add(ProgressBar::new_spinner());
                pb.set_style(Self::spinner_style());
                pb.set_prefix(agent_id.to_string());
                pb.enable_steady_tick(std::time::Duration::from_millis(120));
                pb
            })
            .clone()
    }

    fn handle(&self, event: AgentEvent) {
        match event {
            AgentEvent::Content { agent_id, text } => {
                let bar = self.bar_for(&agent_id);
                let preview: String = text.chars().take(60).collect();
                bar.set_message(preview);
            }
            AgentEvent::ToolCall { agent_id, name, .. } => {
                let bar = self.bar_for(&agent_id);
                bar.set_message(format!("called {name}"));
            }
            AgentEvent::PlannedAction { agent_id, .. } => {
                let bar = self.bar_for(&agent_id);
                bar.set_message("recorded a planned action".to_string());
            }
            AgentEvent::End { agent_id, .. } => {
                let bar = self.bar_for(&agent_id);
                bar.finish_with_message(format!("{} done", "v".green()));
            }
            AgentEvent::Error { agent_id, kind } => {
                let bar = self.bar_for(&agent_id);
                let label = match kind {
                    AgentErrorKind::Timeout => "timed out",
                    AgentErrorKind::TokenCap => "hit its token cap",
                    AgentErrorKind::BackendTransient => "had a transient backend error",
                    AgentErrorKind::BackendFatal => "had a fatal backend error",
                };
                bar.finish_with_message(format!("{} {label}", "x".red()));
            }
        }
    }

    /// Drains `rx` until the bus is dropped. A `Lagged(n)` just means this
    /// subscriber fell behind — the producer is never blocked by it (§5) —
    /// so it's reported and consumption continues.
    pub async fn run(&self, mut rx: broadcast::Receiver<AgentEvent>) {
        loop {
            match rx.recv().await {
                Ok(event) => self.handle(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    eprintln!("{} console subscriber dropped {skipped} event(s)", "warning:".yellow().bold());
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }
}

impl Default for ConsoleSubscriber {
    fn default() -> Self {
        Self::new()
    }
}
