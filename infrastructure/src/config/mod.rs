//! Configuration file loading (§6 ambient): file I/O and multi-source
//! merging around the domain's recognized `CoordinationConfig`, plus the
//! infra-only settings (workspace root, transcript path, scripted backend
//! scripts) the domain layer has no business knowing about.

mod loader;

pub use loader::ConfigLoader;

use massgen_domain::{Chunk, CoordinationConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// The full file-loadable configuration: the recognized coordination
/// config plus everything needed to actually run one (§1 — concrete backend
/// adapters are out of scope, so `scripted_backends` is how a config file
/// supplies deterministic agent behavior to the shipped test-double
/// `Backend`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub coordination: CoordinationConfig,
    pub workspace_root: PathBuf,
    pub transcript_path: Option<PathBuf>,
    /// `backend_ref -> turns`, each turn a `Vec<Chunk>` replayed in order as
    /// the `ScriptedBackend` is re-prompted across coordination rounds.
    pub scripted_backends: HashMap<String, Vec<Vec<Chunk>>>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            coordination: CoordinationConfig::default(),
            workspace_root: PathBuf::from(".massgen/workspaces"),
            transcript_path: None,
            scripted_backends: HashMap::new(),
        }
    }
}
