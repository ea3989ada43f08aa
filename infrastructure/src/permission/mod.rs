//! `FsPathPermissionManager` (§4.4): resolves a relative/absolute path
//! against the filesystem (symlinks followed once) and delegates the
//! Allow/Deny decision to `massgen_domain::permission::check`. No teacher
//! counterpart — the donor's file tools (`infrastructure/src/tools/file.rs`)
//! check only existence/size/kind, never a managed-path permission model —
//! so the resolution idiom here (open, map `io::Error` kinds to a denial
//! reason) is adapted from that file's error mapping.
//!
//! Also owns the per-agent read-before-delete ledger (§4.4/§8): the set of
//! resolved paths each agent has successfully read this task, one instance
//! per CLI invocation (one invocation runs exactly one `Task`, per `main.rs`).

use async_trait::async_trait;
use massgen_application::ports::permission_manager::PathPermissionManager;
use massgen_domain::{check_permission, AgentId, CallerRole, ManagedPath, PathOp, PermissionDecision};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub struct FsPathPermissionManager {
    managed_paths: Vec<ManagedPath>,
    read_ledger: Mutex<HashMap<AgentId, HashSet<PathBuf>>>,
}

impl FsPathPermissionManager {
    pub fn new(managed_paths: Vec<ManagedPath>) -> Self {
        Self { managed_paths, read_ledger: Mutex::new(HashMap::new()) }
    }

    /// Joins a relative path onto the first matching managed path's root so
    /// callers can pass tool-supplied relative paths directly; absolute
    /// paths are returned unchanged. Then follows a symlink at the final
    /// component exactly once (§4.4: "symlinks followed once"), not the
    /// full transitive resolution `Path::canonicalize` performs.
    fn resolve(&self, path: &Path) -> PathBuf {
        let candidate = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.managed_paths
                .first()
                .map(|m| m.absolute_path.join(path))
                .unwrap_or_else(|| path.to_path_buf())
        };

        match std::fs::symlink_metadata(&candidate) {
            Ok(meta) if meta.file_type().is_symlink() => match std::fs::read_link(&candidate) {
                Ok(target) if target.is_absolute() => target,
                Ok(target) => candidate.parent().map(|p| p.join(target)).unwrap_or(candidate),
                Err(_) => candidate,
            },
            _ => candidate,
        }
    }
}

#[async_trait]
impl PathPermissionManager for FsPathPermissionManager {
    async fn check(&self, agent_id: &AgentId, op: PathOp, path: &Path, role: CallerRole) -> PermissionDecision {
        let resolved = self.resolve(path);

        let previously_read = self
            .read_ledger
            .lock()
            .unwrap()
            .get(agent_id)
            .is_some_and(|reads| reads.contains(&resolved));

        let decision = check_permission(op, &resolved, &self.managed_paths, role, previously_read);

        if op == PathOp::Read && decision.is_allowed() {
            self.read_ledger.lock().unwrap().entry(agent_id.clone()).or_default().insert(resolved);
        }

        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use massgen_domain::Permission;

    #[tokio::test]
    async fn unmanaged_absolute_path_is_denied() {
        let manager = FsPathPermissionManager::new(vec![ManagedPath::new("/ctx", Permission::Read)]);
        let decision = manager.check(&AgentId::new("a1"), PathOp::Read, Path::new("/etc/passwd"), CallerRole::Other).await;
        assert!(!decision.is_allowed());
    }

    #[tokio::test]
    async fn relative_path_resolves_onto_first_managed_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let manager = FsPathPermissionManager::new(vec![ManagedPath::new(&root, Permission::Write)]);
        let decision = manager.check(&AgentId::new("a1"), PathOp::Write, Path::new("out.txt"), CallerRole::PresentingWinner).await;
        assert!(decision.is_allowed());
    }

    #[tokio::test]
    async fn delete_is_denied_until_the_same_agent_has_read_the_exact_path() {
        let manager = FsPathPermissionManager::new(vec![ManagedPath::new("/ctx", Permission::Write)]);
        let agent = AgentId::new("a1");
        let path = Path::new("/ctx/out.txt");

        let denied = manager.check(&agent, PathOp::Delete, path, CallerRole::PresentingWinner).await;
        assert!(!denied.is_allowed());

        let read = manager.check(&agent, PathOp::Read, path, CallerRole::PresentingWinner).await;
        assert!(read.is_allowed());

        let allowed = manager.check(&agent, PathOp::Delete, path, CallerRole::PresentingWinner).await;
        assert!(allowed.is_allowed());
    }

    #[tokio::test]
    async fn read_ledger_is_per_agent() {
        let manager = FsPathPermissionManager::new(vec![ManagedPath::new("/ctx", Permission::Write)]);
        let path = Path::new("/ctx/out.txt");

        manager.check(&AgentId::new("a1"), PathOp::Read, path, CallerRole::PresentingWinner).await;

        let denied = manager.check(&AgentId::new("a2"), PathOp::Delete, path, CallerRole::PresentingWinner).await;
        assert!(!denied.is_allowed());
    }
}
