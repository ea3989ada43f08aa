//! `ToolInvoker` (§2 item 2 collaborator, §4.2): routes tool calls that are
//! *not* `new_answer`/`vote` to the backend's local tool executor, filtered
//! by planning mode and permissions by the caller (the `AgentRunner`), not
//! by this port itself. Adapted from the donor's
//! `application/src/ports/tool_executor.rs`.

use async_trait::async_trait;
use massgen_domain::{AgentId, CallerRole, ToolCall, ToolResult};

#[async_trait]
pub trait ToolInvoker: Send + Sync {
    /// `role` lets a filesystem-backed invoker apply §4.4's permission rules
    /// (`PathPermissionManager`) without the engine inlining path checks per
    /// call — `Other` during Running, `PresentingWinner` only for the
    /// winner's Presenting-phase turn.
    async fn invoke(&self, agent_id: &AgentId, call: &ToolCall, role: CallerRole) -> ToolResult;
}

/// Used when a backend declares no filesystem/tool support beyond the two
/// control tools — every non-control call is rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopToolInvoker;

#[async_trait]
impl ToolInvoker for NoopToolInvoker {
    async fn invoke(&self, _agent_id: &AgentId, call: &ToolCall, _role: CallerRole) -> ToolResult {
        ToolResult::err(call.id.clone(), format!("no tool executor configured for '{}'", call.tool_name))
    }
}
