//! The immutable `Task` entity (§3): created once at Setup, destroyed when
//! coordination terminates.

use crate::config::CoordinationConfig;
use crate::ids::TaskId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub prompt: String,
    pub conversation_context: Option<String>,
    pub context_paths: Vec<String>,
    pub config: CoordinationConfig,
}

impl Task {
    pub fn new(id: TaskId, prompt: impl Into<String>, config: CoordinationConfig) -> Self {
        Self {
            id,
            prompt: prompt.into(),
            conversation_context: None,
            context_paths: config.context_paths.iter().map(|p| p.path.clone()).collect(),
            config,
        }
    }

    pub fn with_conversation_context(mut self, context: impl Into<String>) -> Self {
        self.conversation_context = Some(context.into());
        self
    }

    /// Produces the Task for a restart attempt (§4.1 step 9): same config,
    /// prompt appended with the winner-supplied improvement instruction.
    pub fn with_restart_reason(&self, reason: &str) -> Self {
        let mut restarted = self.clone();
        restarted.prompt = format!("{}\n\n[Restart reason: {}]", self.prompt, reason);
        restarted
    }
}
