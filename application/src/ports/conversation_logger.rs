//! `ConversationLogger` (ambient — transcript persistence, §6): kept from
//! the donor's `ConversationLogger` port, generalized to log `AgentEvent`s
//! rather than donor-specific session turns.

use async_trait::async_trait;
use massgen_domain::AgentEvent;

#[async_trait]
pub trait ConversationLogger: Send + Sync {
    async fn log_event(&self, attempt: u32, event: &AgentEvent);
}

/// Used by tests that don't care about persistence.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopConversationLogger;

#[async_trait]
impl ConversationLogger for NoopConversationLogger {
    async fn log_event(&self, _attempt: u32, _event: &AgentEvent) {}
}
