//! The recognized configuration object (spec §6), as a static, read-only
//! value loaded once by infrastructure and never mutated by the core — no
//! `Mutability`/setter machinery here, unlike the donor's runtime-editable
//! `ConfigAccessorPort`: MassGen's coordination config is declarative.

use crate::error::ConfigError;
use crate::ids::AgentId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;

/// One configured participant: `{ id, backend_ref, system_message? }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSpec {
    pub id: AgentId,
    pub backend_ref: String,
    #[serde(default)]
    pub system_message: Option<String>,
}

impl AgentSpec {
    pub fn new(id: impl Into<AgentId>, backend_ref: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            backend_ref: backend_ref.into(),
            system_message: None,
        }
    }

    pub fn with_system_message(mut self, message: impl Into<String>) -> Self {
        self.system_message = Some(message.into());
        self
    }
}

/// Read or write access a context path grants to agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextPermission {
    Read,
    Write,
}

/// `orchestrator.context_paths[]`: `{ path, permission, protected_paths? }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextPathSpec {
    pub path: String,
    pub permission: ContextPermission,
    #[serde(default)]
    pub protected_paths: Vec<String>,
}

impl ContextPathSpec {
    pub fn new(path: impl Into<String>, permission: ContextPermission) -> Self {
        Self {
            path: path.into(),
            permission,
            protected_paths: Vec::new(),
        }
    }

    pub fn with_protected_paths(mut self, paths: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.protected_paths = paths.into_iter().map(Into::into).collect();
        self
    }
}

/// `orchestrator.voting_sensitivity` and `orchestrator.answer_novelty_requirement`
/// share this three-level scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VotingSensitivity {
    #[default]
    Lenient,
    Balanced,
    Strict,
}

impl FromStr for VotingSensitivity {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lenient" => Ok(Self::Lenient),
            "balanced" => Ok(Self::Balanced),
            "strict" => Ok(Self::Strict),
            other => Err(ConfigError::InvalidValue {
                field: "voting_sensitivity".into(),
                reason: format!("unknown level '{other}'"),
            }),
        }
    }
}

impl std::fmt::Display for VotingSensitivity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Lenient => "lenient",
            Self::Balanced => "balanced",
            Self::Strict => "strict",
        };
        write!(f, "{s}")
    }
}

/// Same three levels, reused for `answer_novelty_requirement` under its own
/// name so call sites read naturally (`NoveltyLevel::Balanced` vs
/// `VotingSensitivity::Balanced`).
pub type NoveltyLevel = VotingSensitivity;

impl NoveltyLevel {
    /// Jaccard-overlap rejection threshold for this level (§4.1.a).
    /// `Lenient` has no threshold — callers must check `is_lenient()` first.
    pub fn threshold(self) -> Option<f64> {
        match self {
            Self::Lenient => None,
            Self::Balanced => Some(0.70),
            Self::Strict => Some(0.50),
        }
    }

    pub fn is_lenient(self) -> bool {
        matches!(self, Self::Lenient)
    }
}

/// `orchestrator.coordination.*`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinationSettings {
    pub enable_planning_mode: bool,
    pub planning_mode_instruction: Option<String>,
    pub max_orchestration_restarts: u32,
}

impl Default for CoordinationSettings {
    fn default() -> Self {
        Self {
            enable_planning_mode: false,
            planning_mode_instruction: None,
            max_orchestration_restarts: 0,
        }
    }
}

/// `orchestrator.timeout.*`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutSettings {
    pub orchestrator_timeout_seconds: u64,
    pub orchestrator_max_tokens: u64,
    pub agent_timeout_seconds: u64,
    pub agent_max_tokens: u64,
    pub enable_timeout_fallback: bool,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            orchestrator_timeout_seconds: 1800,
            orchestrator_max_tokens: 200_000,
            agent_timeout_seconds: 300,
            agent_max_tokens: 50_000,
            enable_timeout_fallback: true,
        }
    }
}

/// The full recognized configuration object (spec §6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinationConfig {
    pub agents: Vec<AgentSpec>,
    pub context_paths: Vec<ContextPathSpec>,
    pub coordination: CoordinationSettings,
    pub voting_sensitivity: VotingSensitivity,
    pub max_new_answers_per_agent: Option<u32>,
    pub answer_novelty_requirement: NoveltyLevel,
    pub timeout: TimeoutSettings,
    pub skip_coordination_rounds: bool,
    pub debug_final_answer: Option<String>,
}

impl Default for CoordinationConfig {
    fn default() -> Self {
        Self {
            agents: Vec::new(),
            context_paths: Vec::new(),
            coordination: CoordinationSettings::default(),
            voting_sensitivity: VotingSensitivity::default(),
            max_new_answers_per_agent: None,
            answer_novelty_requirement: NoveltyLevel::default(),
            timeout: TimeoutSettings::default(),
            skip_coordination_rounds: false,
            debug_final_answer: None,
        }
    }
}

impl CoordinationConfig {
    /// Validate the recognized options before Setup. Returning `Err` here is
    /// the *only* way a `ConfigError` reaches a caller — every other
    /// component treats failures as soft and keeps coordinating.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.agents.is_empty() {
            return Err(ConfigError::NoAgents);
        }

        let mut seen = HashSet::new();
        for agent in &self.agents {
            if !seen.insert(agent.id.clone()) {
                return Err(ConfigError::DuplicateAgentId(agent.id.clone()));
            }
        }

        Ok(())
    }

    /// Stable declaration order, used as the tie-break of last resort (§4.1,
    /// §5 ordering guarantees).
    pub fn declaration_order(&self) -> Vec<AgentId> {
        self.agents.iter().map(|a| a.id.clone()).collect()
    }
}
