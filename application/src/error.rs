//! Error taxonomy for the application layer (§7). Per-agent errors
//! (`RunAgentError`) stay local to the `AgentRunner`; `CoordinationError`
//! is the only variant that can surface to a caller of `coordinate(...)`,
//! and only when no agent produced any content across all attempts.

use massgen_domain::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunAgentError {
    #[error("backend error (transient): {0}")]
    BackendTransient(String),
    #[error("backend error (fatal): {0}")]
    BackendFatal(String),
    #[error("agent timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("agent exceeded its token budget ({used} > {cap})")]
    TokenCap { used: u64, cap: u64 },
    #[error("tool invocation failed: {0}")]
    ToolFailed(String),
}

#[derive(Debug, Error)]
pub enum CoordinationError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("no agent produced any content across {attempts} attempt(s)")]
    NoContentProduced { attempts: u32 },
}
