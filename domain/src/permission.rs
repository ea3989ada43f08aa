//! Path permission model (§4.4). Pure resolution logic: given a set of
//! managed paths and a requested operation, decide Allow/Deny. No
//! filesystem I/O happens here — `massgen-infrastructure::permission`
//! resolves real paths (symlinks, canonicalization) and calls into this.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Read or write access granted to a managed path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Permission {
    Read,
    Write,
}

/// An operation requested against a resolved absolute path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathOp {
    Read,
    Write,
    Delete,
}

/// A path the permission manager knows about: an agent workspace, a
/// snapshot, or a configured context path (GLOSSARY: "managed path").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedPath {
    pub absolute_path: PathBuf,
    pub permission: Permission,
    pub protected_subpaths: Vec<PathBuf>,
    /// `true` for an agent's own workspace root, which always stays Write
    /// regardless of exclusion patterns (§4.4).
    pub is_own_workspace: bool,
}

impl ManagedPath {
    pub fn new(absolute_path: impl Into<PathBuf>, permission: Permission) -> Self {
        Self {
            absolute_path: absolute_path.into(),
            permission,
            protected_subpaths: Vec::new(),
            is_own_workspace: false,
        }
    }

    pub fn workspace(absolute_path: impl Into<PathBuf>) -> Self {
        Self {
            absolute_path: absolute_path.into(),
            permission: Permission::Write,
            protected_subpaths: Vec::new(),
            is_own_workspace: true,
        }
    }

    pub fn with_protected_subpaths(mut self, subpaths: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        self.protected_subpaths = subpaths.into_iter().map(Into::into).collect();
        self
    }

    fn depth(&self) -> usize {
        self.absolute_path.components().count()
    }

    fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.absolute_path)
    }

    fn is_protected(&self, path: &Path) -> bool {
        let Ok(relative) = path.strip_prefix(&self.absolute_path) else {
            return false;
        };
        self.protected_subpaths.iter().any(|p| relative.starts_with(p))
    }
}

/// Names recognized by the hard exclusion list (spec §4.4): VCS metadata,
/// env files, dependency caches, engine-state directories. These always
/// downgrade a Write grant to Read, except inside an agent's own workspace.
const EXCLUDED_NAMES: &[&str] = &[".git", ".env", "node_modules", "target", ".massgen"];

fn matches_excluded(path: &Path) -> bool {
    path.components().any(|c| {
        let s = c.as_os_str().to_string_lossy();
        EXCLUDED_NAMES.iter().any(|excluded| s == *excluded)
    })
}

/// Outcome of a permission check, carrying enough context for a caller to
/// surface a remediation hint (mirrors the donor's `ToolError` code/message
/// shape).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionDecision {
    Allow,
    Deny { reason: String },
}

impl PermissionDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, PermissionDecision::Allow)
    }
}

/// Whether the caller is the attempt's winner currently in the Presenting
/// phase — the one context in which Write access to context paths is
/// restored (§4.1.c, §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallerRole {
    PresentingWinner,
    Other,
}

/// Resolve `op` against `resolved_path` given the full set of managed paths.
/// `resolved_path` must already be canonicalized and symlinks-followed by
/// the caller (infrastructure layer) — this function does only the
/// deepest-ancestor matching and exclusion/role logic described in §4.4.
///
/// `previously_read` reflects whether the calling agent has already issued a
/// successful `Read` against this exact resolved path earlier in the task
/// (§4.4/§8: "a Delete is denied unless the caller has previously issued a
/// successful Read on the exact resolved path"). The caller — the stateful
/// `PathPermissionManager` port, not this pure function — owns that ledger.
pub fn check(
    op: PathOp,
    resolved_path: &Path,
    managed_paths: &[ManagedPath],
    role: CallerRole,
    previously_read: bool,
) -> PermissionDecision {
    let mut matching: Vec<&ManagedPath> = managed_paths.iter().filter(|m| m.contains(resolved_path)).collect();
    matching.sort_by_key(|m| std::cmp::Reverse(m.depth()));

    let Some(owner) = matching.first() else {
        return PermissionDecision::Deny {
            reason: format!("{} is not under any managed path", resolved_path.display()),
        };
    };

    let mut effective_permission = owner.permission;

    // Coordination-phase callers (non-winner agents) have Write downgraded
    // to Read on context paths; the winner regains Write in Presenting.
    if !owner.is_own_workspace && role == CallerRole::Other {
        effective_permission = Permission::Read;
    }

    // Excluded patterns always downgrade to Read, except inside an agent's
    // own workspace root.
    if !owner.is_own_workspace && matches_excluded(resolved_path) {
        effective_permission = Permission::Read;
    }

    match op {
        PathOp::Read => PermissionDecision::Allow,
        PathOp::Write | PathOp::Delete => {
            if effective_permission != Permission::Write {
                return PermissionDecision::Deny {
                    reason: format!("{} is read-only for this caller", resolved_path.display()),
                };
            }
            if owner.is_protected(resolved_path) {
                return PermissionDecision::Deny {
                    reason: format!("{} is a protected subpath", resolved_path.display()),
                };
            }
            if op == PathOp::Delete && !previously_read {
                return PermissionDecision::Deny {
                    reason: format!("{} cannot be deleted before it has been read", resolved_path.display()),
                };
            }
            PermissionDecision::Allow
        }
    }
}
