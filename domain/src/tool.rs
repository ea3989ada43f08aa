//! Tool/control-tool data model (§6), kept near-verbatim from the donor's
//! `domain/src/tool/{entities.rs,value_objects.rs}` — its generic
//! name/arguments/result shape already matches what the spec needs for the
//! two reserved control tools (`new_answer`, `vote`) plus any
//! backend-provided tools.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Names reserved by the engine; backends must not shadow them (§6).
pub const NEW_ANSWER_TOOL: &str = "new_answer";
pub const VOTE_TOOL: &str = "vote";
/// Reserved for the restart self-eval turn only (§4.1 step 9), never
/// offered alongside `new_answer`/`vote`.
pub const SUBMIT_TOOL: &str = "submit";
pub const RESTART_TOOL: &str = "restart";

/// Whether `name` is one the `AgentRunner` must forward to the engine rather
/// than route through the `ToolInvoker`.
pub fn is_control_tool_name(name: &str) -> bool {
    matches!(name, NEW_ANSWER_TOOL | VOTE_TOOL | SUBMIT_TOOL | RESTART_TOOL)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolParameter {
    pub name: String,
    pub description: String,
    pub required: bool,
    pub param_type: String,
}

impl ToolParameter {
    pub fn new(name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required,
            param_type: "string".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ToolParameter>,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, param: ToolParameter) -> Self {
        self.parameters.push(param);
        self
    }
}

/// The tools offered to one agent for one turn: the two control tools plus
/// whatever the backend/MCP layer contributes, converted to backend-specific
/// schema by the infrastructure layer (§2 item 2).
#[derive(Debug, Clone, Default)]
pub struct ToolSpec {
    tools: HashMap<String, ToolDefinition>,
}

impl ToolSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, tool: ToolDefinition) -> Self {
        self.tools.insert(tool.name.clone(), tool);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.get(name)
    }

    pub fn all(&self) -> impl Iterator<Item = &ToolDefinition> {
        self.tools.values()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Every `ToolSpec` an agent receives must include the two control
    /// tools (§6) — the engine builds one of these per turn.
    pub fn with_control_tools() -> Self {
        Self::new()
            .register(
                ToolDefinition::new(NEW_ANSWER_TOOL, "Commit a candidate answer for this turn")
                    .with_parameter(ToolParameter::new("content", "The answer content", true)),
            )
            .register(
                ToolDefinition::new(VOTE_TOOL, "Finalize this agent's participation by voting for a peer")
                    .with_parameter(ToolParameter::new("target_agent_id", "The agent id being voted for", true))
                    .with_parameter(ToolParameter::new("reason", "Why this peer's answer was chosen", true)),
            )
    }

    /// The restart self-eval turn's tools (§4.1 step 9): mutually exclusive
    /// with `with_control_tools()` — that turn neither answers nor votes.
    pub fn with_restart_tools() -> Self {
        Self::new()
            .register(ToolDefinition::new(SUBMIT_TOOL, "Accept the final answer as-is"))
            .register(
                ToolDefinition::new(RESTART_TOOL, "Request another coordination attempt with an improvement instruction")
                    .with_parameter(ToolParameter::new("reason", "The concrete improvement to make next attempt", true)),
            )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub tool_name: String,
    pub arguments: HashMap<String, serde_json::Value>,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, tool_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tool_name: tool_name.into(),
            arguments: HashMap::new(),
        }
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(|v| v.as_str())
    }

    pub fn require_string(&self, key: &str) -> Result<&str, String> {
        self.get_string(key)
            .ok_or_else(|| format!("missing required argument: {key}"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub call_id: String,
    pub ok: bool,
    pub payload: String,
}

impl ToolResult {
    pub fn ok(call_id: impl Into<String>, payload: impl Into<String>) -> Self {
        Self { call_id: call_id.into(), ok: true, payload: payload.into() }
    }

    pub fn err(call_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self { call_id: call_id.into(), ok: false, payload: message.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_tools_include_new_answer_and_vote() {
        let spec = ToolSpec::with_control_tools();
        assert!(spec.contains(NEW_ANSWER_TOOL));
        assert!(spec.contains(VOTE_TOOL));
    }

    #[test]
    fn tool_call_requires_string_argument() {
        let call = ToolCall::new("1", NEW_ANSWER_TOOL).with_arg("content", "42");
        assert_eq!(call.require_string("content").unwrap(), "42");
        assert!(call.require_string("missing").is_err());
    }
}
