//! `WorkspaceManager` (§2 item 4, §4.3): allocates per-agent workspaces,
//! snapshots them after each `new_answer`, exposes read-only peer views,
//! and finalizes the winner's writes into context paths.

use async_trait::async_trait;
use massgen_domain::{AgentId, Snapshot};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("io error for agent '{agent_id}': {source}")]
    Io { agent_id: AgentId, #[source] source: std::io::Error },
    #[error("no snapshot found for agent '{0}'")]
    NoSnapshot(AgentId),
}

/// One Write-permitted context path the winner's workspace is copied into
/// during finalize, carrying the subpaths (relative to `path`) that must be
/// excluded from the copy (§4.3/§4.4: protected subpaths stay untouched even
/// for the presenting winner).
#[derive(Debug, Clone)]
pub struct WriteTarget {
    pub path: PathBuf,
    pub protected_subpaths: Vec<PathBuf>,
}

impl WriteTarget {
    pub fn new(path: impl Into<PathBuf>, protected_subpaths: Vec<PathBuf>) -> Self {
        Self { path: path.into(), protected_subpaths }
    }
}

#[async_trait]
pub trait WorkspaceManager: Send + Sync {
    /// Allocates (if needed) and returns agent `agent_id`'s live workspace
    /// directory.
    async fn ensure(&self, agent_id: &AgentId) -> Result<PathBuf, WorkspaceError>;

    /// Captures an immutable, content-addressed snapshot of `agent_id`'s
    /// current workspace contents for `answer_version`.
    async fn snapshot(&self, agent_id: &AgentId, answer_version: u32) -> Result<Snapshot, WorkspaceError>;

    /// A read-only mount of `peer_id`'s latest snapshot, as seen by
    /// `agent_id`. Never exposes a peer's *live* workspace (§4.3 invariant).
    async fn read_view(&self, agent_id: &AgentId, peer_id: &AgentId) -> Result<PathBuf, WorkspaceError>;

    /// Copies the winner's workspace contents into Write-permitted context
    /// paths (respecting protected subpaths), run only during Presenting.
    async fn finalize(&self, winner_id: &AgentId, write_targets: &[WriteTarget]) -> Result<(), WorkspaceError>;
}
