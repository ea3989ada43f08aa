//! Snapshot metadata (§3, §4.3): an immutable, content-addressed record of
//! the files an agent produced at the moment of one `new_answer`. The
//! domain layer only models the metadata; `massgen-infrastructure::workspace`
//! does the actual file copying and hashing.

use crate::ids::AgentId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Content-addressed snapshot identifier: `sha2::Sha256` digest over the
/// sorted `(relative_path, file_bytes)` pairs, hex-encoded. See
/// SPEC_FULL.md §3 for why SHA-256 was picked (an Open Question decision,
/// not something `original_source/` could resolve).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SnapshotId(String);

impl SnapshotId {
    pub fn from_digest(hex_digest: impl Into<String>) -> Self {
        Self(hex_digest.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One file captured in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub relative_path: PathBuf,
    pub digest: String,
    pub size_bytes: u64,
}

/// Per-agent, per-answer-version, append-only. Lifetime = Task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: SnapshotId,
    pub agent_id: AgentId,
    pub answer_version: u32,
    pub files: Vec<FileEntry>,
}

impl Snapshot {
    pub fn new(id: SnapshotId, agent_id: AgentId, answer_version: u32, files: Vec<FileEntry>) -> Self {
        Self {
            id,
            agent_id,
            answer_version,
            files,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
