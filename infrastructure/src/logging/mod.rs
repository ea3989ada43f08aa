//! Logging infrastructure: `NdjsonTranscriptLogger` persists every
//! `AgentEvent` as one JSON line (the donor's `ConversationLogger` shape,
//! here logging coordination events instead of donor-specific session
//! turns — kept/adapted from `infrastructure/src/logging/jsonl_logger.rs`'s
//! `Mutex<BufWriter<File>>` + flush-on-write + flush-on-Drop idiom), plus
//! `init_tracing` for the CLI's `tracing-subscriber` setup.

use async_trait::async_trait;
use massgen_application::ports::conversation_logger::ConversationLogger;
use massgen_domain::AgentEvent;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;
use tracing_subscriber::EnvFilter;

pub struct NdjsonTranscriptLogger {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl NdjsonTranscriptLogger {
    /// Creates the file (and parent directories) if needed. Returns `None`
    /// rather than an error: a missing transcript log is never fatal to
    /// coordination (§7 — logging is ambient, not load-bearing).
    pub fn new(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if let Err(err) = std::fs::create_dir_all(parent) {
                warn!(path = %parent.display(), %err, "could not create transcript log directory");
                return None;
            }
        }
        let file = match File::create(path) {
            Ok(f) => f,
            Err(err) => {
                warn!(path = %path.display(), %err, "could not create transcript log file");
                return None;
            }
        };
        Some(Self { writer: Mutex::new(BufWriter::new(file)), path: path.to_path_buf() })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ConversationLogger for NdjsonTranscriptLogger {
    async fn log_event(&self, attempt: u32, event: &AgentEvent) {
        let record = serde_json::json!({
            "attempt": attempt,
            "timestamp": chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            "event": event,
        });
        let Ok(line) = serde_json::to_string(&record) else { return };
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{line}");
            let _ = writer.flush();
        }
    }
}

impl Drop for NdjsonTranscriptLogger {
    fn drop(&mut self) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.flush();
        }
    }
}

/// Sets up `tracing-subscriber` with an `EnvFilter` derived from
/// `-v`/`-vv`/`RUST_LOG`, matching the donor's `cli/src/main.rs` verbosity
/// mapping.
pub fn init_tracing(verbosity: u8) {
    let default_directive = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use massgen_domain::{AgentId, EndReason};

    #[tokio::test]
    async fn logs_one_json_line_per_event() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transcript.ndjson");
        let logger = NdjsonTranscriptLogger::new(&path).unwrap();

        logger.log_event(1, &AgentEvent::Content { agent_id: AgentId::new("a1"), text: "hi".into() }).await;
        logger.log_event(1, &AgentEvent::End { agent_id: AgentId::new("a1"), reason: EndReason::Stop }).await;
        drop(logger);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.trim().lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["attempt"], 1);
        assert!(first.get("timestamp").is_some());
    }
}
