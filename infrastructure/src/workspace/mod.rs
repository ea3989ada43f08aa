//! `FsWorkspaceManager` (§4.3): one live directory per agent under a task
//! root, snapshotted (content-addressed, §3) after each accepted
//! `new_answer`, exposed read-only to peers, and copied into context
//! Write-paths during Presenting. No teacher counterpart ships a workspace
//! abstraction at all — the donor's file tools operate directly on the
//! caller's filesystem — so the copy/hash idiom here is adapted from
//! `infrastructure/src/tools/file.rs`'s read/write error-mapping style
//! rather than any existing workspace code.

use async_trait::async_trait;
use massgen_application::ports::workspace::{WorkspaceError, WorkspaceManager, WriteTarget};
use massgen_domain::{AgentId, FileEntry, Snapshot, SnapshotId};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

pub struct FsWorkspaceManager {
    root: PathBuf,
    latest_snapshot: Mutex<HashMap<AgentId, PathBuf>>,
}

impl FsWorkspaceManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), latest_snapshot: Mutex::new(HashMap::new()) }
    }

    fn live_dir(&self, agent_id: &AgentId) -> PathBuf {
        self.root.join("agents").join(agent_id.as_str()).join("live")
    }

    fn snapshot_dir(&self, agent_id: &AgentId, answer_version: u32) -> PathBuf {
        self.root.join("agents").join(agent_id.as_str()).join("snapshots").join(answer_version.to_string())
    }

    fn to_io_err(agent_id: &AgentId, source: std::io::Error) -> WorkspaceError {
        WorkspaceError::Io { agent_id: agent_id.clone(), source }
    }
}

#[async_trait]
impl WorkspaceManager for FsWorkspaceManager {
    async fn ensure(&self, agent_id: &AgentId) -> Result<PathBuf, WorkspaceError> {
        let dir = self.live_dir(agent_id);
        tokio::fs::create_dir_all(&dir).await.map_err(|e| Self::to_io_err(agent_id, e))?;
        Ok(dir)
    }

    async fn snapshot(&self, agent_id: &AgentId, answer_version: u32) -> Result<Snapshot, WorkspaceError> {
        let live = self.live_dir(agent_id);
        let dest = self.snapshot_dir(agent_id, answer_version);
        tokio::fs::create_dir_all(&dest).await.map_err(|e| Self::to_io_err(agent_id, e))?;

        let agent_id = agent_id.clone();
        let (files, dest_clone) = {
            let live = live.clone();
            let dest = dest.clone();
            tokio::task::spawn_blocking(move || -> std::io::Result<Vec<FileEntry>> {
                if live.exists() {
                    copy_dir_recursive(&live, &dest)?;
                }
                hash_dir(&dest)
            })
            .await
            .expect("snapshot blocking task panicked")
            .map_err(|e| Self::to_io_err(&agent_id, e))
            .map(|files| (files, dest))?
        };

        let digest_input: String =
            files.iter().map(|f| format!("{}:{}", f.relative_path.display(), f.digest)).collect();
        let id = SnapshotId::from_digest(format!("{:x}", Sha256::digest(digest_input.as_bytes())));

        self.latest_snapshot.lock().await.insert(agent_id.clone(), dest_clone);
        Ok(Snapshot::new(id, agent_id, answer_version, files))
    }

    async fn read_view(&self, _agent_id: &AgentId, peer_id: &AgentId) -> Result<PathBuf, WorkspaceError> {
        self.latest_snapshot
            .lock()
            .await
            .get(peer_id)
            .cloned()
            .ok_or_else(|| WorkspaceError::NoSnapshot(peer_id.clone()))
    }

    async fn finalize(&self, winner_id: &AgentId, write_targets: &[WriteTarget]) -> Result<(), WorkspaceError> {
        let live = self.live_dir(winner_id);
        if !live.exists() {
            return Ok(());
        }
        for target in write_targets {
            let live = live.clone();
            let dest = target.path.clone();
            let protected = target.protected_subpaths.clone();
            tokio::task::spawn_blocking(move || copy_dir_recursive(&live, &dest, Path::new(""), &protected))
                .await
                .expect("finalize blocking task panicked")
                .map_err(|e| Self::to_io_err(winner_id, e))?;
        }
        Ok(())
    }
}

/// Copies `src` into `dest`, skipping any entry whose path relative to the
/// write target's root (tracked via `relative`) starts with one of
/// `protected` — configured protected subpaths stay untouched even though
/// the presenting winner otherwise has Write access to the target (§4.4).
fn copy_dir_recursive(src: &Path, dest: &Path, relative: &Path, protected: &[PathBuf]) -> std::io::Result<()> {
    std::fs::create_dir_all(dest)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let entry_relative = relative.join(entry.file_name());
        if protected.iter().any(|p| entry_relative.starts_with(p)) {
            continue;
        }
        let target = dest.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_recursive(&entry.path(), &target, &entry_relative, protected)?;
        } else {
            std::fs::copy(entry.path(), target)?;
        }
    }
    Ok(())
}

/// Walks `dir`, hashing each file's bytes. Relative paths are sorted so the
/// resulting `FileEntry` list (and the digest derived from it) is
/// deterministic regardless of directory-iteration order.
fn hash_dir(dir: &Path) -> std::io::Result<Vec<FileEntry>> {
    let mut entries = Vec::new();
    walk(dir, dir, &mut entries)?;
    entries.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    Ok(entries)
}

fn walk(root: &Path, current: &Path, out: &mut Vec<FileEntry>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(current)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            walk(root, &path, out)?;
        } else {
            let bytes = std::fs::read(&path)?;
            let digest = format!("{:x}", Sha256::digest(&bytes));
            out.push(FileEntry {
                relative_path: path.strip_prefix(root).unwrap_or(&path).to_path_buf(),
                digest,
                size_bytes: bytes.len() as u64,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ensure_creates_live_directory() {
        let dir = tempfile::tempdir().unwrap();
        let manager = FsWorkspaceManager::new(dir.path());
        let live = manager.ensure(&AgentId::new("a1")).await.unwrap();
        assert!(live.exists());
    }

    #[tokio::test]
    async fn snapshot_is_deterministic_for_identical_content() {
        let dir = tempfile::tempdir().unwrap();
        let manager = FsWorkspaceManager::new(dir.path());
        let live = manager.ensure(&AgentId::new("a1")).await.unwrap();
        std::fs::write(live.join("out.txt"), b"hello").unwrap();

        let snap1 = manager.snapshot(&AgentId::new("a1"), 1).await.unwrap();
        let snap2 = manager.snapshot(&AgentId::new("a1"), 2).await.unwrap();
        assert_eq!(snap1.id, snap2.id);
    }

    #[tokio::test]
    async fn read_view_fails_before_any_snapshot_taken() {
        let dir = tempfile::tempdir().unwrap();
        let manager = FsWorkspaceManager::new(dir.path());
        let result = manager.read_view(&AgentId::new("a1"), &AgentId::new("a2")).await;
        assert!(matches!(result, Err(WorkspaceError::NoSnapshot(_))));
    }

    #[tokio::test]
    async fn finalize_copies_winner_workspace_into_write_path() {
        let dir = tempfile::tempdir().unwrap();
        let manager = FsWorkspaceManager::new(dir.path());
        let live = manager.ensure(&AgentId::new("a1")).await.unwrap();
        std::fs::write(live.join("result.txt"), b"final answer").unwrap();

        let out_dir = tempfile::tempdir().unwrap();
        manager.finalize(&AgentId::new("a1"), &[WriteTarget::new(out_dir.path(), vec![])]).await.unwrap();
        assert!(out_dir.path().join("result.txt").exists());
    }

    #[tokio::test]
    async fn finalize_skips_protected_subpaths() {
        let dir = tempfile::tempdir().unwrap();
        let manager = FsWorkspaceManager::new(dir.path());
        let live = manager.ensure(&AgentId::new("a1")).await.unwrap();
        std::fs::write(live.join("result.txt"), b"final answer").unwrap();
        std::fs::create_dir_all(live.join("secrets")).unwrap();
        std::fs::write(live.join("secrets").join("key.pem"), b"do not copy").unwrap();

        let out_dir = tempfile::tempdir().unwrap();
        manager
            .finalize(&AgentId::new("a1"), &[WriteTarget::new(out_dir.path(), vec![PathBuf::from("secrets")])])
            .await
            .unwrap();

        assert!(out_dir.path().join("result.txt").exists());
        assert!(!out_dir.path().join("secrets").exists());
    }
}
