//! Application layer for massgen: use cases and the ports they depend on.
//! No concrete backend/workspace/logger adapters live here — those are
//! `massgen-infrastructure`'s job. Everything here is runtime-agnostic
//! except for its dependency on `tokio` as the async executor, matching
//! the donor's layering.

pub mod agent_runner;
pub mod error;
pub mod event_bus;
pub mod ports;
pub mod timeout_governor;
pub mod use_cases;

pub use agent_runner::{AgentRunner, ToolPolicy};
pub use error::{CoordinationError, RunAgentError};
pub use event_bus::EventBus;
pub use timeout_governor::{Budget, BudgetExceeded, TimeoutGovernor};
pub use use_cases::coordination_engine::CoordinationEngine;
