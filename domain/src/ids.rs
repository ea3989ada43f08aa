//! Opaque identifiers threaded through the coordination engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one agent, unique within a [`Task`](crate::task::Task).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(String);

impl AgentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AgentId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for AgentId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Identifies a [`Task`](crate::task::Task). Opaque, assigned by the caller
/// or generated by the infrastructure layer at Setup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Names a `.massgen/sessions/<session_id>/` persistence root. Purely a
/// label for transcript/snapshot paths — the domain layer never interprets
/// it and never generates one itself, which keeps coordination logic free of
/// a clock or RNG dependency.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_id_round_trips_through_display() {
        let id = AgentId::new("agent-a");
        assert_eq!(id.as_str(), "agent-a");
        assert_eq!(id.to_string(), "agent-a");
    }

    #[test]
    fn agent_ids_are_orderable_for_declaration_order_tie_breaks() {
        let mut ids = vec![AgentId::new("b"), AgentId::new("a"), AgentId::new("c")];
        ids.sort();
        assert_eq!(ids, vec![AgentId::new("a"), AgentId::new("b"), AgentId::new("c")]);
    }
}
