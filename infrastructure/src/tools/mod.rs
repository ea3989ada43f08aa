//! `FsToolInvoker` (§4.2, §4.4): the concrete `ToolInvoker` — routes
//! non-control tool calls (`read_file`/`write_file`) to the filesystem,
//! checking every path against a `PathPermissionManager` first. Read/write
//! primitives adapted from `infrastructure/src/tools/file.rs`'s
//! existence/size/kind checks and `io::ErrorKind` mapping.

use async_trait::async_trait;
use massgen_application::ports::permission_manager::PathPermissionManager;
use massgen_application::ports::tool_invoker::ToolInvoker;
use massgen_domain::{AgentId, CallerRole, PathOp, ToolCall, ToolResult};
use std::path::Path;
use std::sync::Arc;

pub const READ_FILE: &str = "read_file";
pub const WRITE_FILE: &str = "write_file";

/// Files larger than this are rejected rather than read into memory.
const MAX_READ_BYTES: u64 = 10 * 1024 * 1024;

pub struct FsToolInvoker {
    permissions: Arc<dyn PathPermissionManager>,
}

impl FsToolInvoker {
    pub fn new(permissions: Arc<dyn PathPermissionManager>) -> Self {
        Self { permissions }
    }

    async fn read_file(&self, agent_id: &AgentId, call: &ToolCall, role: CallerRole) -> ToolResult {
        let Some(path_str) = call.get_string("path") else {
            return ToolResult::err(call.id.clone(), "missing required argument: path");
        };
        let path = Path::new(path_str);

        let decision = self.permissions.check(agent_id, PathOp::Read, path, role).await;
        if !decision.is_allowed() {
            return ToolResult::err(call.id.clone(), format!("permission denied: {path_str}"));
        }

        if !path.is_file() {
            return ToolResult::err(call.id.clone(), format!("'{path_str}' is not a file"));
        }
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > MAX_READ_BYTES => {
                return ToolResult::err(call.id.clone(), format!("'{path_str}' exceeds the {MAX_READ_BYTES} byte read limit"));
            }
            Err(err) => return ToolResult::err(call.id.clone(), format!("failed to stat '{path_str}': {err}")),
            Ok(_) => {}
        }

        match std::fs::read_to_string(path) {
            Ok(content) => ToolResult::ok(call.id.clone(), content),
            Err(err) => ToolResult::err(call.id.clone(), format!("failed to read '{path_str}': {err}")),
        }
    }

    async fn write_file(&self, agent_id: &AgentId, call: &ToolCall, role: CallerRole) -> ToolResult {
        let Some(path_str) = call.get_string("path") else {
            return ToolResult::err(call.id.clone(), "missing required argument: path");
        };
        let Some(content) = call.get_string("content") else {
            return ToolResult::err(call.id.clone(), "missing required argument: content");
        };
        let path = Path::new(path_str);

        let decision = self.permissions.check(agent_id, PathOp::Write, path, role).await;
        if !decision.is_allowed() {
            return ToolResult::err(call.id.clone(), format!("permission denied: {path_str}"));
        }

        if let Some(parent) = path.parent() {
            if let Err(err) = std::fs::create_dir_all(parent) {
                return ToolResult::err(call.id.clone(), format!("failed to create parent directories for '{path_str}': {err}"));
            }
        }

        let bytes = content.len();
        match std::fs::write(path, content) {
            Ok(()) => ToolResult::ok(call.id.clone(), format!("wrote {bytes} bytes to {path_str}")),
            Err(err) => ToolResult::err(call.id.clone(), format!("failed to write '{path_str}': {err}")),
        }
    }
}

#[async_trait]
impl ToolInvoker for FsToolInvoker {
    async fn invoke(&self, agent_id: &AgentId, call: &ToolCall, role: CallerRole) -> ToolResult {
        match call.tool_name.as_str() {
            READ_FILE => self.read_file(agent_id, call, role).await,
            WRITE_FILE => self.write_file(agent_id, call, role).await,
            other => ToolResult::err(call.id.clone(), format!("unknown tool '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use massgen_domain::PermissionDecision;

    struct AlwaysAllow;
    #[async_trait]
    impl PathPermissionManager for AlwaysAllow {
        async fn check(&self, _agent_id: &AgentId, _op: PathOp, _path: &Path, _role: CallerRole) -> PermissionDecision {
            PermissionDecision::Allow
        }
    }

    struct AlwaysDeny;
    #[async_trait]
    impl PathPermissionManager for AlwaysDeny {
        async fn check(&self, _agent_id: &AgentId, _op: PathOp, _path: &Path, _role: CallerRole) -> PermissionDecision {
            PermissionDecision::Deny { reason: "denied".into() }
        }
    }

    #[tokio::test]
    async fn write_then_read_round_trips_through_allowed_invoker() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let invoker = FsToolInvoker::new(Arc::new(AlwaysAllow));
        let agent_id = AgentId::new("a1");

        let write_call = ToolCall::new("1", WRITE_FILE)
            .with_arg("path", path.to_string_lossy().to_string())
            .with_arg("content", "hello");
        let write_result = invoker.invoke(&agent_id, &write_call, CallerRole::Other).await;
        assert!(write_result.ok);

        let read_call = ToolCall::new("2", READ_FILE).with_arg("path", path.to_string_lossy().to_string());
        let read_result = invoker.invoke(&agent_id, &read_call, CallerRole::Other).await;
        assert!(read_result.ok);
        assert_eq!(read_result.payload, "hello");
    }

    #[tokio::test]
    async fn denied_permission_blocks_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let invoker = FsToolInvoker::new(Arc::new(AlwaysDeny));

        let call = ToolCall::new("1", WRITE_FILE)
            .with_arg("path", path.to_string_lossy().to_string())
            .with_arg("content", "hello");
        let result = invoker.invoke(&AgentId::new("a1"), &call, CallerRole::Other).await;
        assert!(!result.ok);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn unknown_tool_name_is_rejected() {
        let invoker = FsToolInvoker::new(Arc::new(AlwaysAllow));
        let call = ToolCall::new("1", "delete_everything");
        let result = invoker.invoke(&AgentId::new("a1"), &call, CallerRole::Other).await;
        assert!(!result.ok);
    }
}
