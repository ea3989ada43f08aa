//! Domain layer for massgen
//!
//! Pure coordination state and algorithms: the `AgentState` table, the vote
//! ledger and winner selection, the novelty gate, path permissions and
//! workspace snapshot metadata, and the configuration value objects. No I/O
//! and no async runtime dependency — everything here is deterministic given
//! its inputs, which is what lets the engine's properties (§8 of the spec)
//! be tested without a live backend.

pub mod agent_state;
pub mod attempt;
pub mod chunk;
pub mod config;
pub mod error;
pub mod fallback;
pub mod ids;
pub mod message;
pub mod novelty;
pub mod permission;
pub mod snapshot;
pub mod task;
pub mod tool;
pub mod vote;

pub use agent_state::{AgentState, AgentStatus, KillReason};
pub use attempt::{AttemptOutcome, OrchestrationAttempt};
pub use chunk::{AgentEvent, Chunk, EndReason, FilesystemSupport};
pub use config::{
    AgentSpec, ContextPathSpec, ContextPermission, CoordinationConfig, CoordinationSettings,
    NoveltyLevel, TimeoutSettings, VotingSensitivity,
};
pub use error::{ConfigError, DomainError};
pub use fallback::{no_answers_message, synthesize_fallback};
pub use ids::{AgentId, SessionId, TaskId};
pub use message::{Message, Role};
pub use novelty::{jaccard_overlap, novelty_rejects};
pub use permission::{check as check_permission, CallerRole, ManagedPath, PathOp, Permission, PermissionDecision};
pub use snapshot::{FileEntry, Snapshot, SnapshotId};
pub use task::Task;
pub use tool::{
    is_control_tool_name, ToolCall, ToolDefinition, ToolParameter, ToolResult, ToolSpec,
    NEW_ANSWER_TOOL, RESTART_TOOL, SUBMIT_TOOL, VOTE_TOOL,
};
pub use vote::{select_winner, validate_vote_target, Vote, VoteLedger};
