//! `ScriptedBackend` (§1/§9: concrete provider adapters are out of scope —
//! this is the one `BackendPort` implementation the workspace ships).
//! Replays a configured sequence of turns, each a `Vec<Chunk>`, advancing
//! one turn per `stream()` call and holding on the last turn once
//! exhausted — the re-prompt-until-consensus loop keeps receiving a
//! sensible final response instead of an empty stream. `Chunk` stream
//! construction is grounded on `domain/src/session/stream.rs`'s
//! tagged-event-enum idiom; the scripted-response-queue shape itself has no
//! teacher counterpart, since the donor talks to a real Copilot backend.

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use massgen_application::error::RunAgentError;
use massgen_application::ports::backend::BackendPort;
use massgen_domain::{Chunk, FilesystemSupport, Message, ToolSpec};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio_util::sync::CancellationToken;

pub struct ScriptedBackend {
    turns: Vec<Vec<Chunk>>,
    cursor: AtomicUsize,
    filesystem_support: FilesystemSupport,
}

impl ScriptedBackend {
    pub fn new(turns: Vec<Vec<Chunk>>) -> Self {
        Self { turns, cursor: AtomicUsize::new(0), filesystem_support: FilesystemSupport::None }
    }

    pub fn with_filesystem_support(mut self, support: FilesystemSupport) -> Self {
        self.filesystem_support = support;
        self
    }
}

#[async_trait]
impl BackendPort for ScriptedBackend {
    async fn stream(
        &self,
        _messages: Vec<Message>,
        _tools: ToolSpec,
        _cancel: CancellationToken,
    ) -> Result<BoxStream<'static, Chunk>, RunAgentError> {
        let Some(last) = self.turns.len().checked_sub(1) else {
            return Err(RunAgentError::BackendFatal("no scripted turns configured".into()));
        };
        let index = self.cursor.fetch_add(1, Ordering::SeqCst).min(last);
        Ok(stream::iter(self.turns[index].clone()).boxed())
    }

    fn filesystem_support(&self) -> FilesystemSupport {
        self.filesystem_support
    }
}
