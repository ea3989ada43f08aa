//! The streamed sum types (§6, §9): `Chunk` is what a `Backend` emits;
//! `AgentEvent` is what an `AgentRunner` emits after interpreting a
//! `Chunk` stream (tool-call parsing, timeout/cancellation, attribution to
//! one agent). Adapted from the donor's `domain/src/session/stream.rs`
//! `StreamEvent{Delta,Completed,Error}` tagged enum, expanded to the full
//! variant set the spec requires — no inheritance hierarchy, a single
//! `enum`.

use crate::ids::AgentId;
use serde::{Deserialize, Serialize};

/// Whether a backend can touch the filesystem itself, or only through a
/// tool the orchestrator provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilesystemSupport {
    None,
    Native,
    ViaTool,
}

/// Why a stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndReason {
    Stop,
    Length,
    Tool,
    Error,
}

/// What a `Backend::stream(...)` call yields (§6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Chunk {
    Content { text: String },
    ToolCall { id: String, name: String, arguments_json: String },
    ToolResult { id: String, ok: bool, payload: String },
    Usage { input_tokens: u64, output_tokens: u64 },
    End { reason: EndReason },
}

/// What an `AgentRunner::run(...)` stream yields, attributed to one agent
/// and already free of backend-specific tool-parsing quirks (§4.2).
/// Guarantees exactly one terminal event (`End` or `Error`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum AgentEvent {
    Content { agent_id: AgentId, text: String },
    ToolCall { agent_id: AgentId, call_id: String, name: String, arguments_json: String },
    /// A planning-mode interception (§4.1.c): a Write-permitted/side-effectful
    /// tool call was not executed, and `notice` is the textual "planned
    /// action" that must be appended to the agent's answer buffer.
    PlannedAction { agent_id: AgentId, notice: String },
    End { agent_id: AgentId, reason: EndReason },
    Error { agent_id: AgentId, kind: AgentErrorKind },
}

/// Error kinds an `AgentRunner` can terminate with (§7 taxonomy, the subset
/// relevant to one agent rather than the whole orchestration).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentErrorKind {
    BackendTransient,
    BackendFatal,
    Timeout,
    TokenCap,
}

impl AgentEvent {
    pub fn agent_id(&self) -> &AgentId {
        match self {
            AgentEvent::Content { agent_id, .. }
            | AgentEvent::ToolCall { agent_id, .. }
            | AgentEvent::PlannedAction { agent_id, .. }
            | AgentEvent::End { agent_id, .. }
            | AgentEvent::Error { agent_id, .. } => agent_id,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentEvent::End { .. } | AgentEvent::Error { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_event_is_not_terminal() {
        let event = AgentEvent::Content { agent_id: AgentId::new("a1"), text: "hi".into() };
        assert!(!event.is_terminal());
    }

    #[test]
    fn end_and_error_events_are_terminal() {
        assert!(AgentEvent::End { agent_id: AgentId::new("a1"), reason: EndReason::Stop }.is_terminal());
        assert!(AgentEvent::Error { agent_id: AgentId::new("a1"), kind: AgentErrorKind::Timeout }.is_terminal());
    }
}
