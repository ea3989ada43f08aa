//! Error taxonomy (kinds, not exception hierarchies — see spec §7/§9).

use crate::ids::AgentId;
use thiserror::Error;

/// Raised before Setup; no coordination attempt is started.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no agents configured")]
    NoAgents,
    #[error("duplicate agent id: {0}")]
    DuplicateAgentId(AgentId),
    #[error("unknown backend reference '{0}' for agent '{1}'")]
    UnknownBackendRef(String, AgentId),
    #[error("context path '{0}' does not exist")]
    ContextPathMissing(String),
    #[error("invalid configuration value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Errors surfaced by pure domain logic (vote validation, novelty, path
/// permission resolution). These are soft by default: the engine converts
/// most of them into feedback chunks rather than propagating them, per the
/// propagation policy in spec §7.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid vote target '{target}': {reason}")]
    InvalidVoteTarget { target: AgentId, reason: String },
    #[error("answer rejected by novelty gate: overlap {jaccard:.2} exceeds threshold {threshold:.2}")]
    NoveltyRejected { jaccard: f64, threshold: f64 },
    #[error("agent '{0}' has reached its answer cap")]
    AnswerCapReached(AgentId),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}
