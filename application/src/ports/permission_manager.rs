//! `PathPermissionManager` (§2 item 3, §4.4): resolves every file operation
//! against the managed-path set. This port adds the stateful parts the
//! pure `massgen_domain::permission::check` function can't express on its
//! own: real-path resolution (symlinks followed once) and the per-agent
//! read-before-delete tracker.

use async_trait::async_trait;
use massgen_domain::{AgentId, CallerRole, PathOp, PermissionDecision};
use std::path::Path;

#[async_trait]
pub trait PathPermissionManager: Send + Sync {
    async fn check(&self, agent_id: &AgentId, op: PathOp, path: &Path, role: CallerRole) -> PermissionDecision;
}
