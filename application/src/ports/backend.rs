//! `BackendPort` (§2 item 1, §6): the abstract capability the core talks to
//! instead of a concrete provider SDK. Concrete adapters (HTTP/SDK clients)
//! are explicitly out of scope (§1) — `massgen-infrastructure` ships only a
//! scripted test double behind this same port.
//!
//! Adapted from the donor's `application/src/ports/llm_gateway.rs` port
//! shape, generalized from request/response to a `Chunk` stream.

use crate::error::RunAgentError;
use async_trait::async_trait;
use futures::stream::BoxStream;
use massgen_domain::{Chunk, FilesystemSupport, Message, ToolSpec};
use tokio_util::sync::CancellationToken;

/// One configured agent's connection to an LLM (or LLM-like) backend.
#[async_trait]
pub trait BackendPort: Send + Sync {
    /// Streams a response to `messages`, offering `tools`. Must honor
    /// `cancel` within a bounded latency — at the next chunk boundary (§5).
    async fn stream(
        &self,
        messages: Vec<Message>,
        tools: ToolSpec,
        cancel: CancellationToken,
    ) -> Result<BoxStream<'static, Chunk>, RunAgentError>;

    fn filesystem_support(&self) -> FilesystemSupport;

    /// A coarse token estimate for budget bookkeeping before a call is made.
    fn estimate_tokens(&self, messages: &[Message]) -> u64 {
        messages.iter().map(|m| (m.content.len() / 4) as u64).sum()
    }
}
