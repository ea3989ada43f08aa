//! Infrastructure layer for massgen
//!
//! Adapters implementing the application layer's ports: a filesystem
//! `WorkspaceManager` and `PathPermissionManager`, an ndjson transcript
//! logger, a figment-based config loader, and the scripted `Backend` test
//! double standing in for the explicitly out-of-scope concrete provider
//! adapters (§1).

pub mod backend;
pub mod config;
pub mod logging;
pub mod permission;
pub mod tools;
pub mod workspace;

pub use backend::ScriptedBackend;
pub use config::{ConfigLoader, RuntimeConfig};
pub use logging::{init_tracing, NdjsonTranscriptLogger};
pub use permission::FsPathPermissionManager;
pub use tools::FsToolInvoker;
pub use workspace::FsWorkspaceManager;
